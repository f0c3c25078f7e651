use std::{ffi::CStr, mem};

use ash::vk;

use super::entry;

#[derive(Clone, Copy, Debug)]
pub struct Command {
    pub name: &'static CStr,
    pub function: unsafe extern "system" fn(),
}

macro_rules! command {
    ($name:literal, $pfn:ty, $function:path) => {
        Command {
            name: $name,
            function: unsafe { mem::transmute::<$pfn, unsafe extern "system" fn()>($function) },
        }
    };
}

/// Instance-level functions this layer intercepts.
pub static INSTANCE_COMMANDS: &[Command] = &[
    command!(
        c"vkGetInstanceProcAddr",
        vk::PFN_vkGetInstanceProcAddr,
        entry::get_instance_proc_addr
    ),
    command!(
        c"vkCreateInstance",
        vk::PFN_vkCreateInstance,
        entry::create_instance
    ),
    command!(
        c"vkDestroyInstance",
        vk::PFN_vkDestroyInstance,
        entry::destroy_instance
    ),
    command!(
        c"vkEnumeratePhysicalDevices",
        vk::PFN_vkEnumeratePhysicalDevices,
        entry::enumerate_physical_devices
    ),
    command!(
        c"vkEnumeratePhysicalDeviceGroups",
        vk::PFN_vkEnumeratePhysicalDeviceGroups,
        entry::enumerate_physical_device_groups
    ),
    command!(
        c"vkEnumeratePhysicalDeviceGroupsKHR",
        vk::PFN_vkEnumeratePhysicalDeviceGroups,
        entry::enumerate_physical_device_groups
    ),
    command!(
        c"vkEnumerateInstanceLayerProperties",
        vk::PFN_vkEnumerateInstanceLayerProperties,
        entry::enumerate_instance_layer_properties
    ),
    command!(
        c"vkEnumerateInstanceExtensionProperties",
        vk::PFN_vkEnumerateInstanceExtensionProperties,
        entry::enumerate_instance_extension_properties
    ),
];

/// Device-level functions this layer intercepts.
pub static DEVICE_COMMANDS: &[Command] = &[
    command!(
        c"vkGetDeviceProcAddr",
        vk::PFN_vkGetDeviceProcAddr,
        entry::get_device_proc_addr
    ),
    command!(
        c"vkCreateDevice",
        vk::PFN_vkCreateDevice,
        entry::create_device
    ),
    command!(
        c"vkDestroyDevice",
        vk::PFN_vkDestroyDevice,
        entry::destroy_device
    ),
    command!(
        c"vkEnumerateDeviceLayerProperties",
        vk::PFN_vkEnumerateDeviceLayerProperties,
        entry::enumerate_device_layer_properties
    ),
    command!(
        c"vkEnumerateDeviceExtensionProperties",
        vk::PFN_vkEnumerateDeviceExtensionProperties,
        entry::enumerate_device_extension_properties
    ),
];

fn find(table: &[Command], name: &CStr) -> Option<unsafe extern "system" fn()> {
    table
        .iter()
        .find(|command| command.name == name)
        .map(|command| command.function)
}

/// Device-level names resolve here too, so callers see the same function
/// whichever resolver they ask.
pub fn instance_command(name: &CStr) -> Option<unsafe extern "system" fn()> {
    find(INSTANCE_COMMANDS, name).or_else(|| find(DEVICE_COMMANDS, name))
}

pub fn device_command(name: &CStr) -> Option<unsafe extern "system" fn()> {
    find(DEVICE_COMMANDS, name)
}
