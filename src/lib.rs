//! Vulkan layer that exposes a single physical device, picked by the
//! `VULKAN_DEVICE_INDEX` environment variable, to the application.
//!
//! Without the variable the layer only keeps its dispatch tables and passes
//! every call through.

#![allow(non_snake_case)]

pub mod config;
pub mod dispatch;
pub mod layer;
pub mod loader;
pub mod logging;
pub mod selector;

#[cfg(test)]
mod mock;

use std::ffi::c_char;

use ash::vk;

use layer::{entry, properties};
use loader::{
    NegotiateLayerInterface, NegotiateLayerStructType, CURRENT_LOADER_LAYER_INTERFACE_VERSION,
};

/// Loader interface negotiation, the first call the loader makes.
///
/// # Safety
/// `p_version_struct` must be null or point to a valid negotiation struct.
#[no_mangle]
pub unsafe extern "system" fn vkNegotiateLoaderLayerInterfaceVersion(
    p_version_struct: *mut NegotiateLayerInterface,
) -> vk::Result {
    logging::init();

    let Some(negotiate) = p_version_struct.as_mut() else {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    };

    if negotiate.s_type != NegotiateLayerStructType::INTERFACE_STRUCT
        || negotiate.loader_layer_interface_version < CURRENT_LOADER_LAYER_INTERFACE_VERSION
    {
        return vk::Result::ERROR_INITIALIZATION_FAILED;
    }

    negotiate.loader_layer_interface_version = CURRENT_LOADER_LAYER_INTERFACE_VERSION;
    negotiate.pfn_get_instance_proc_addr = Some(entry::get_instance_proc_addr);
    negotiate.pfn_get_device_proc_addr = Some(entry::get_device_proc_addr);
    negotiate.pfn_get_physical_device_proc_addr = None;

    vk::Result::SUCCESS
}

/// # Safety
/// See `vkGetInstanceProcAddr`.
#[no_mangle]
pub unsafe extern "system" fn vkGetInstanceProcAddr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    entry::get_instance_proc_addr(instance, p_name)
}

/// # Safety
/// See `vkGetDeviceProcAddr`.
#[no_mangle]
pub unsafe extern "system" fn vkGetDeviceProcAddr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    entry::get_device_proc_addr(device, p_name)
}

/// # Safety
/// See `vkEnumerateInstanceLayerProperties`.
#[no_mangle]
pub unsafe extern "system" fn vkEnumerateInstanceLayerProperties(
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    properties::enumerate_layer_properties(p_property_count, p_properties)
}

/// # Safety
/// See `vkEnumerateInstanceExtensionProperties`.
#[no_mangle]
pub unsafe extern "system" fn vkEnumerateInstanceExtensionProperties(
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    entry::enumerate_instance_extension_properties(p_layer_name, p_property_count, p_properties)
}

/// # Safety
/// See `vkEnumerateDeviceLayerProperties`.
#[no_mangle]
pub unsafe extern "system" fn vkEnumerateDeviceLayerProperties(
    physical_device: vk::PhysicalDevice,
    p_property_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    entry::enumerate_device_layer_properties(physical_device, p_property_count, p_properties)
}

/// # Safety
/// See `vkEnumerateDeviceExtensionProperties`.
#[no_mangle]
pub unsafe extern "system" fn vkEnumerateDeviceExtensionProperties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_property_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    entry::enumerate_device_extension_properties(
        physical_device,
        p_layer_name,
        p_property_count,
        p_properties,
    )
}
