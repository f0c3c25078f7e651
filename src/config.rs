/// Selects the reported device. Unset means every enumeration passes through.
pub const DEVICE_INDEX_VAR: &str = "VULKAN_DEVICE_INDEX";

/// Where the layer reads its settings from.
pub trait ConfigSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    }
}

impl<F> ConfigSource for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn var(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Requested device index, read fresh on every call.
pub fn device_index(source: &impl ConfigSource) -> Option<i64> {
    source.var(DEVICE_INDEX_VAR).map(|v| parse_index(&v))
}

/// Reads the leading base-10 integer of `text`.
///
/// Leading whitespace and one sign are accepted and parsing stops at the first
/// non-digit. Text without digits reads as 0, values past the `i64` range
/// saturate.
pub fn parse_index(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });

    if negative {
        -magnitude
    } else {
        magnitude
    }
}
