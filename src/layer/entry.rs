//! `extern "system"` functions handed to the loader and the application.
//!
//! Each one forwards to the process-wide [`DeviceChooser`].

use std::{ffi::c_char, sync::LazyLock};

use ash::vk;

use super::{properties, status, DeviceChooser};
use crate::{config::EnvConfig, logging};

static LAYER: LazyLock<DeviceChooser<EnvConfig>> =
    LazyLock::new(|| DeviceChooser::new(EnvConfig));

pub unsafe extern "system" fn get_instance_proc_addr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    LAYER.get_instance_proc_addr(instance, p_name)
}

pub unsafe extern "system" fn get_device_proc_addr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    LAYER.get_device_proc_addr(device, p_name)
}

pub unsafe extern "system" fn create_instance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    logging::init();

    status(LAYER.create_instance(p_create_info, p_allocator, p_instance))
}

pub unsafe extern "system" fn destroy_instance(
    instance: vk::Instance,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    LAYER.destroy_instance(instance, p_allocator)
}

pub unsafe extern "system" fn create_device(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo<'_>,
    p_allocator: *const vk::AllocationCallbacks<'_>,
    p_device: *mut vk::Device,
) -> vk::Result {
    status(LAYER.create_device(physical_device, p_create_info, p_allocator, p_device))
}

pub unsafe extern "system" fn destroy_device(
    device: vk::Device,
    p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    LAYER.destroy_device(device, p_allocator)
}

pub unsafe extern "system" fn enumerate_physical_devices(
    instance: vk::Instance,
    p_count: *mut u32,
    p_devices: *mut vk::PhysicalDevice,
) -> vk::Result {
    LAYER.enumerate_physical_devices(instance, p_count, p_devices)
}

pub unsafe extern "system" fn enumerate_physical_device_groups(
    instance: vk::Instance,
    p_count: *mut u32,
    p_groups: *mut vk::PhysicalDeviceGroupProperties<'_>,
) -> vk::Result {
    LAYER.enumerate_physical_device_groups(instance, p_count, p_groups)
}

pub unsafe extern "system" fn enumerate_instance_layer_properties(
    p_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    properties::enumerate_layer_properties(p_count, p_properties)
}

pub unsafe extern "system" fn enumerate_device_layer_properties(
    _physical_device: vk::PhysicalDevice,
    p_count: *mut u32,
    p_properties: *mut vk::LayerProperties,
) -> vk::Result {
    properties::enumerate_layer_properties(p_count, p_properties)
}

pub unsafe extern "system" fn enumerate_instance_extension_properties(
    _p_layer_name: *const c_char,
    p_count: *mut u32,
    _p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    properties::enumerate_no_extensions(p_count)
}

pub unsafe extern "system" fn enumerate_device_extension_properties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const c_char,
    p_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    LAYER.enumerate_device_extension_properties(physical_device, p_layer_name, p_count, p_properties)
}
