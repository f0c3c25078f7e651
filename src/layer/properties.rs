use std::ffi::{c_char, CStr};

use ash::vk;

pub const LAYER_NAME: &CStr = c"VK_LAYER_AEJS_DeviceChooserLayer";
pub const LAYER_DESCRIPTION: &CStr = c"Device chooser layer";
pub const SPEC_VERSION: u32 = vk::API_VERSION_1_0;
pub const IMPLEMENTATION_VERSION: u32 = 1;

fn copy_cstr(dst: &mut [c_char], src: &CStr) {
    let bytes = src.to_bytes();
    let len = bytes.len().min(dst.len() - 1);

    for (d, s) in dst.iter_mut().zip(&bytes[..len]) {
        *d = *s as c_char;
    }
    dst[len] = 0;
}

pub fn layer_properties() -> vk::LayerProperties {
    let mut properties = vk::LayerProperties {
        spec_version: SPEC_VERSION,
        implementation_version: IMPLEMENTATION_VERSION,
        ..Default::default()
    };
    copy_cstr(&mut properties.layer_name, LAYER_NAME);
    copy_cstr(&mut properties.description, LAYER_DESCRIPTION);

    properties
}

/// # Safety
/// `name` must be null or a valid C string.
pub unsafe fn is_this_layer(name: *const c_char) -> bool {
    !name.is_null() && CStr::from_ptr(name) == LAYER_NAME
}

/// Reports this layer as the single entry of a layer property query.
///
/// # Safety
/// `p_count` must be null or valid; `p_properties` must be null or point to
/// `*p_count` elements.
pub unsafe fn enumerate_layer_properties(
    p_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    let Some(count) = p_count.as_mut() else {
        return vk::Result::SUCCESS;
    };

    if p_properties.is_null() {
        *count = 1;
        return vk::Result::SUCCESS;
    }

    if *count == 0 {
        return vk::Result::INCOMPLETE;
    }

    p_properties.write(layer_properties());
    *count = 1;

    vk::Result::SUCCESS
}

/// This layer brings no extensions of its own, whichever layer is asked for.
///
/// # Safety
/// `p_count` must be null or valid.
pub unsafe fn enumerate_no_extensions(p_count: *mut u32) -> vk::Result {
    if let Some(count) = p_count.as_mut() {
        *count = 0;
    }

    vk::Result::SUCCESS
}
