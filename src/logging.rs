use std::sync::Once;

use tracing::{Level, Subscriber};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{writer::MakeWriterExt, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    Layer,
};

static INIT: Once = Once::new();

/// Most verbose level written to the host's console.
const MAX_LEVEL: LevelFilter = LevelFilter::INFO;

/// Console formatting shared by [`init`] and tests that inspect the output.
pub(crate) fn console_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::Layer::new()
        .with_ansi(false)
        .with_target(false)
        .with_writer(writer)
        .with_filter(MAX_LEVEL)
}

/// Installs the console subscriber: warnings and errors go to stderr,
/// info to stdout.
///
/// A host that already set a global subscriber keeps it.
pub fn init() {
    INIT.call_once(|| {
        let console_log = console_layer(
            std::io::stderr
                .with_max_level(Level::WARN)
                .or_else(std::io::stdout),
        );
        let subscriber = tracing_subscriber::registry().with(console_log);
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}
