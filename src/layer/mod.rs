pub mod commands;
pub mod entry;
pub mod properties;

use std::ffi::c_char;

use ash::{prelude::VkResult, vk};
use tracing::debug;

use crate::{
    config::{self, ConfigSource, EnvConfig},
    dispatch::{resolve, DeviceDispatch, DispatchKey, DispatchRegistry, InstanceDispatch},
    loader::{self, LayerDeviceCreateInfo, LayerInstanceCreateInfo},
    selector,
};

/// Collapses a `VkResult` back into the status code returned across the ABI.
#[inline]
pub(crate) fn status(result: VkResult<()>) -> vk::Result {
    match result {
        Ok(()) => vk::Result::SUCCESS,
        Err(err) => err,
    }
}

/// The layer itself: live dispatch tables plus the configuration it obeys.
///
/// The exported entry points forward to one process-wide instance of this.
#[derive(Debug)]
pub struct DeviceChooser<C = EnvConfig> {
    registry: DispatchRegistry,
    config: C,
}

impl<C: ConfigSource> DeviceChooser<C> {
    pub fn new(config: C) -> Self {
        Self {
            registry: DispatchRegistry::new(),
            config,
        }
    }

    pub fn registry(&self) -> &DispatchRegistry {
        &self.registry
    }

    /// # Safety
    /// Arguments must satisfy the `vkCreateInstance` contract for a layer.
    pub unsafe fn create_instance(
        &self,
        p_create_info: *const vk::InstanceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_instance: *mut vk::Instance,
    ) -> VkResult<()> {
        let create_info = p_create_info
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;

        let link = loader::find_link_info::<LayerInstanceCreateInfo>(create_info.p_next)
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let gipa = (*link)
            .take_link()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;

        let create: vk::PFN_vkCreateInstance =
            resolve(gipa, vk::Instance::null(), c"vkCreateInstance")
                .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        create(p_create_info, p_allocator, p_instance).result()?;

        let instance = *p_instance;
        let key = DispatchKey::of(instance);
        self.registry
            .register_instance(key, InstanceDispatch::load(instance, gipa));

        debug!("Registered instance {:?}", key);

        Ok(())
    }

    /// # Safety
    /// `instance` must be live and not used again afterwards.
    pub unsafe fn destroy_instance(
        &self,
        instance: vk::Instance,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        if instance == vk::Instance::null() {
            return;
        }

        let key = DispatchKey::of(instance);

        if let Some(destroy) = self
            .registry
            .instance(key)
            .and_then(|dispatch| dispatch.destroy_instance)
        {
            destroy(instance, p_allocator);
        }

        self.registry.unregister_instance(key);
        debug!("Unregistered instance {:?}", key);
    }

    /// # Safety
    /// Arguments must satisfy the `vkCreateDevice` contract for a layer.
    pub unsafe fn create_device(
        &self,
        physical_device: vk::PhysicalDevice,
        p_create_info: *const vk::DeviceCreateInfo<'_>,
        p_allocator: *const vk::AllocationCallbacks<'_>,
        p_device: *mut vk::Device,
    ) -> VkResult<()> {
        let create_info = p_create_info
            .as_ref()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;

        let link = loader::find_link_info::<LayerDeviceCreateInfo>(create_info.p_next)
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        let next = (*link)
            .take_link()
            .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;

        let create: vk::PFN_vkCreateDevice = resolve(
            next.get_instance_proc_addr,
            vk::Instance::null(),
            c"vkCreateDevice",
        )
        .ok_or(vk::Result::ERROR_INITIALIZATION_FAILED)?;
        create(physical_device, p_create_info, p_allocator, p_device).result()?;

        let device = *p_device;
        let key = DispatchKey::of(device);
        self.registry
            .register_device(key, DeviceDispatch::load(device, next.get_device_proc_addr));

        debug!("Registered device {:?}", key);

        Ok(())
    }

    /// # Safety
    /// `device` must be live and not used again afterwards.
    pub unsafe fn destroy_device(
        &self,
        device: vk::Device,
        p_allocator: *const vk::AllocationCallbacks<'_>,
    ) {
        if device == vk::Device::null() {
            return;
        }

        let key = DispatchKey::of(device);

        if let Some(destroy) = self
            .registry
            .device(key)
            .and_then(|dispatch| dispatch.destroy_device)
        {
            destroy(device, p_allocator);
        }

        self.registry.unregister_device(key);
        debug!("Unregistered device {:?}", key);
    }

    /// # Safety
    /// Arguments must satisfy the `vkEnumeratePhysicalDevices` contract.
    pub unsafe fn enumerate_physical_devices(
        &self,
        instance: vk::Instance,
        p_count: *mut u32,
        p_devices: *mut vk::PhysicalDevice,
    ) -> vk::Result {
        let Some(enumerate) = self
            .registry
            .instance(DispatchKey::of(instance))
            .and_then(|dispatch| dispatch.enumerate_physical_devices)
        else {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        };

        let Some(requested) = config::device_index(&self.config) else {
            return enumerate(instance, p_count, p_devices);
        };

        match selector::choose_device(instance, enumerate, requested) {
            Ok(selection) => {
                selector::report_device(selection.device(), p_count, p_devices);
                vk::Result::SUCCESS
            }
            Err(err) => err,
        }
    }

    /// Serves both `vkEnumeratePhysicalDeviceGroups` and its `KHR` alias.
    ///
    /// # Safety
    /// Arguments must satisfy the `vkEnumeratePhysicalDeviceGroups` contract.
    pub unsafe fn enumerate_physical_device_groups(
        &self,
        instance: vk::Instance,
        p_count: *mut u32,
        p_groups: *mut vk::PhysicalDeviceGroupProperties<'_>,
    ) -> vk::Result {
        let Some(dispatch) = self.registry.instance(DispatchKey::of(instance)) else {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        };

        let Some(requested) = config::device_index(&self.config) else {
            return match dispatch.physical_device_groups() {
                Some(enumerate) => enumerate(instance, p_count, p_groups),
                None => vk::Result::ERROR_INITIALIZATION_FAILED,
            };
        };

        let Some(enumerate) = dispatch.enumerate_physical_devices else {
            return vk::Result::ERROR_INITIALIZATION_FAILED;
        };

        match selector::choose_device(instance, enumerate, requested) {
            Ok(selection) => {
                selector::report_device_group(selection.device(), p_count, p_groups);
                vk::Result::SUCCESS
            }
            Err(err) => err,
        }
    }

    /// # Safety
    /// Arguments must satisfy the `vkEnumerateDeviceExtensionProperties` contract.
    pub unsafe fn enumerate_device_extension_properties(
        &self,
        physical_device: vk::PhysicalDevice,
        p_layer_name: *const c_char,
        p_count: *mut u32,
        p_properties: *mut vk::ExtensionProperties,
    ) -> vk::Result {
        if properties::is_this_layer(p_layer_name) || physical_device == vk::PhysicalDevice::null()
        {
            return properties::enumerate_no_extensions(p_count);
        }

        match self
            .registry
            .instance(DispatchKey::of(physical_device))
            .and_then(|dispatch| dispatch.enumerate_device_extension_properties)
        {
            Some(enumerate) => enumerate(physical_device, p_layer_name, p_count, p_properties),
            None => vk::Result::ERROR_INITIALIZATION_FAILED,
        }
    }

    /// # Safety
    /// `p_name` must be null or a valid C string; `instance` null or live.
    pub unsafe fn get_instance_proc_addr(
        &self,
        instance: vk::Instance,
        p_name: *const c_char,
    ) -> vk::PFN_vkVoidFunction {
        if p_name.is_null() {
            return None;
        }

        if let Some(function) = commands::instance_command(std::ffi::CStr::from_ptr(p_name)) {
            return Some(function);
        }

        if instance == vk::Instance::null() {
            return None;
        }

        let dispatch = self.registry.instance(DispatchKey::of(instance))?;
        (dispatch.get_instance_proc_addr)(instance, p_name)
    }

    /// # Safety
    /// `p_name` must be null or a valid C string; `device` null or live.
    pub unsafe fn get_device_proc_addr(
        &self,
        device: vk::Device,
        p_name: *const c_char,
    ) -> vk::PFN_vkVoidFunction {
        if p_name.is_null() {
            return None;
        }

        if let Some(function) = commands::device_command(std::ffi::CStr::from_ptr(p_name)) {
            return Some(function);
        }

        if device == vk::Device::null() {
            return None;
        }

        let dispatch = self.registry.device(DispatchKey::of(device))?;
        (dispatch.get_device_proc_addr)(device, p_name)
    }
}
