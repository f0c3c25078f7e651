use std::{
    collections::HashMap,
    ffi::CStr,
    mem::{self, size_of},
};

use ash::vk::{self, Handle};
use parking_lot::Mutex;
use static_assertions::const_assert_eq;

const_assert_eq!(size_of::<DispatchKey>(), size_of::<*const ()>());

/// Identity of a dispatchable object as seen by the loader: the first
/// machine word behind the handle, which is the loader's dispatch pointer.
///
/// Physical devices share the key of the instance they belong to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DispatchKey(usize);

impl DispatchKey {
    /// # Safety
    /// `handle` must be a live dispatchable handle.
    #[inline]
    pub unsafe fn of<H: Handle>(handle: H) -> Self {
        let object = handle.as_raw() as usize as *const usize;
        Self(object.read())
    }
}

/// Resolves `name` through `resolver` and reinterprets it as `F`.
///
/// # Safety
/// `F` must be the function pointer type matching `name`.
pub(crate) unsafe fn resolve<H: Copy, F: Copy>(
    resolver: unsafe extern "system" fn(H, *const std::ffi::c_char) -> vk::PFN_vkVoidFunction,
    handle: H,
    name: &CStr,
) -> Option<F> {
    debug_assert_eq!(size_of::<F>(), size_of::<unsafe extern "system" fn()>());

    resolver(handle, name.as_ptr()).map(|f| mem::transmute_copy(&f))
}

#[derive(Clone, Copy, Debug)]
pub struct InstanceDispatch {
    pub get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub destroy_instance: Option<vk::PFN_vkDestroyInstance>,
    pub enumerate_physical_devices: Option<vk::PFN_vkEnumeratePhysicalDevices>,
    pub enumerate_physical_device_groups: Option<vk::PFN_vkEnumeratePhysicalDeviceGroups>,
    pub enumerate_physical_device_groups_khr: Option<vk::PFN_vkEnumeratePhysicalDeviceGroups>,
    pub enumerate_device_extension_properties:
        Option<vk::PFN_vkEnumerateDeviceExtensionProperties>,
}

impl InstanceDispatch {
    /// # Safety
    /// `instance` must have just been created through `get_instance_proc_addr`.
    pub unsafe fn load(
        instance: vk::Instance,
        get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    ) -> Self {
        let gipa = get_instance_proc_addr;

        Self {
            get_instance_proc_addr,
            destroy_instance: resolve(gipa, instance, c"vkDestroyInstance"),
            enumerate_physical_devices: resolve(gipa, instance, c"vkEnumeratePhysicalDevices"),
            enumerate_physical_device_groups: resolve(
                gipa,
                instance,
                c"vkEnumeratePhysicalDeviceGroups",
            ),
            enumerate_physical_device_groups_khr: resolve(
                gipa,
                instance,
                c"vkEnumeratePhysicalDeviceGroupsKHR",
            ),
            enumerate_device_extension_properties: resolve(
                gipa,
                instance,
                c"vkEnumerateDeviceExtensionProperties",
            ),
        }
    }

    /// Core entry point first, extension alias otherwise.
    #[inline]
    pub fn physical_device_groups(&self) -> Option<vk::PFN_vkEnumeratePhysicalDeviceGroups> {
        self.enumerate_physical_device_groups
            .or(self.enumerate_physical_device_groups_khr)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DeviceDispatch {
    pub get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
    pub destroy_device: Option<vk::PFN_vkDestroyDevice>,
}

impl DeviceDispatch {
    /// # Safety
    /// `device` must have just been created by the layer below.
    pub unsafe fn load(device: vk::Device, get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr) -> Self {
        Self {
            get_device_proc_addr,
            destroy_device: resolve(get_device_proc_addr, device, c"vkDestroyDevice"),
        }
    }
}

#[derive(Debug)]
struct DispatchMap<T> {
    tables: Mutex<HashMap<DispatchKey, T>>,
}

impl<T: Copy> DispatchMap<T> {
    fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
        }
    }

    fn insert(&self, key: DispatchKey, table: T) {
        self.tables.lock().insert(key, table);
    }

    fn get(&self, key: DispatchKey) -> Option<T> {
        self.tables.lock().get(&key).copied()
    }

    fn remove(&self, key: DispatchKey) -> Option<T> {
        self.tables.lock().remove(&key)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tables.lock().len()
    }
}

/// Next-layer function tables of every live instance and device.
///
/// Lookups hand out copies, so no lock is held while the layer calls down.
#[derive(Debug)]
pub struct DispatchRegistry {
    instances: DispatchMap<InstanceDispatch>,
    devices: DispatchMap<DeviceDispatch>,
}

impl Default for DispatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchRegistry {
    pub fn new() -> Self {
        Self {
            instances: DispatchMap::new(),
            devices: DispatchMap::new(),
        }
    }

    pub fn register_instance(&self, key: DispatchKey, table: InstanceDispatch) {
        self.instances.insert(key, table);
    }

    pub fn instance(&self, key: DispatchKey) -> Option<InstanceDispatch> {
        self.instances.get(key)
    }

    pub fn unregister_instance(&self, key: DispatchKey) -> Option<InstanceDispatch> {
        self.instances.remove(key)
    }

    pub fn register_device(&self, key: DispatchKey, table: DeviceDispatch) {
        self.devices.insert(key, table);
    }

    pub fn device(&self, key: DispatchKey) -> Option<DeviceDispatch> {
        self.devices.get(key)
    }

    pub fn unregister_device(&self, key: DispatchKey) -> Option<DeviceDispatch> {
        self.devices.remove(key)
    }

    #[cfg(test)]
    pub(crate) fn instance_count(&self) -> usize {
        self.instances.len()
    }

    #[cfg(test)]
    pub(crate) fn device_count(&self) -> usize {
        self.devices.len()
    }
}
