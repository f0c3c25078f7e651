//! In-process stand-in for the layer below (loader trampoline plus driver).
//!
//! Handles point at leaked boxes whose first word plays the loader's
//! dispatch pointer, so they key the registry like real ones do.

use std::{
    ffi::{c_char, c_void, CStr},
    io, mem, ptr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use ash::vk::{self, Handle};
use parking_lot::Mutex;
use tracing::Level;
use tracing_subscriber::{
    fmt::{writer::MakeWriterExt, MakeWriter},
    layer::SubscriberExt,
};

use crate::{
    loader::{
        LayerDeviceCreateInfo, LayerDeviceLink, LayerDevicePayload, LayerFunction,
        LayerInstanceCreateInfo, LayerInstanceLink, LayerInstancePayload,
    },
    logging,
};

pub const EXTENSION_COUNT: u32 = 3;

static NEXT_LOADER_DATA: AtomicUsize = AtomicUsize::new(0x1000);

fn loader_data() -> usize {
    NEXT_LOADER_DATA.fetch_add(0x10, Ordering::Relaxed)
}

#[repr(C)]
#[derive(Debug)]
pub struct MockInstance {
    loader_data: usize,
    pub devices: Mutex<Vec<vk::PhysicalDevice>>,
    pub failure: Mutex<Option<vk::Result>>,
    pub enumerate_calls: AtomicUsize,
    pub destroyed: AtomicBool,
}

#[repr(C)]
#[derive(Debug)]
pub struct MockPhysicalDevice {
    #[allow(dead_code)]
    loader_data: usize,
}

#[repr(C)]
#[derive(Debug)]
pub struct MockDevice {
    #[allow(dead_code)]
    loader_data: usize,
    pub destroyed: AtomicBool,
}

/// # Safety
/// `instance` must come from [`create_instance`].
pub unsafe fn instance<'a>(instance: vk::Instance) -> &'a MockInstance {
    &*(instance.as_raw() as usize as *const MockInstance)
}

/// # Safety
/// `device` must come from [`create_device`].
pub unsafe fn device<'a>(device: vk::Device) -> &'a MockDevice {
    &*(device.as_raw() as usize as *const MockDevice)
}

/// Replaces the devices `handle` reports with `count` fresh ones.
///
/// # Safety
/// `handle` must come from [`create_instance`].
pub unsafe fn set_devices(handle: vk::Instance, count: usize) -> Vec<vk::PhysicalDevice> {
    let mock = instance(handle);
    let devices = (0..count)
        .map(|_| {
            let device = Box::new(MockPhysicalDevice {
                loader_data: mock.loader_data,
            });
            vk::PhysicalDevice::from_raw(Box::into_raw(device) as u64)
        })
        .collect::<Vec<_>>();

    *mock.devices.lock() = devices.clone();

    devices
}

macro_rules! void_fn {
    ($pfn:ty, $function:expr) => {
        Some(mem::transmute::<$pfn, unsafe extern "system" fn()>($function))
    };
}

unsafe extern "system" fn noop() {}

pub unsafe extern "system" fn get_instance_proc_addr(
    _instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    match CStr::from_ptr(p_name).to_bytes() {
        b"vkCreateInstance" => void_fn!(vk::PFN_vkCreateInstance, create_instance),
        b"vkDestroyInstance" => void_fn!(vk::PFN_vkDestroyInstance, destroy_instance),
        b"vkEnumeratePhysicalDevices" => {
            void_fn!(vk::PFN_vkEnumeratePhysicalDevices, enumerate_physical_devices)
        }
        b"vkEnumeratePhysicalDeviceGroups" => void_fn!(
            vk::PFN_vkEnumeratePhysicalDeviceGroups,
            enumerate_physical_device_groups
        ),
        b"vkEnumerateDeviceExtensionProperties" => void_fn!(
            vk::PFN_vkEnumerateDeviceExtensionProperties,
            enumerate_device_extension_properties
        ),
        b"vkCreateDevice" => void_fn!(vk::PFN_vkCreateDevice, create_device),
        b"vkGetPhysicalDeviceProperties" => Some(noop),
        _ => None,
    }
}

pub unsafe extern "system" fn get_device_proc_addr(
    _device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    match CStr::from_ptr(p_name).to_bytes() {
        b"vkDestroyDevice" => void_fn!(vk::PFN_vkDestroyDevice, destroy_device),
        b"vkGetDeviceQueue" => Some(noop),
        _ => None,
    }
}

/// Fails with `VK_ERROR_EXTENSION_NOT_PRESENT` when any extension is requested.
unsafe extern "system" fn create_instance(
    p_create_info: *const vk::InstanceCreateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    if (*p_create_info).enabled_extension_count > 0 {
        return vk::Result::ERROR_EXTENSION_NOT_PRESENT;
    }

    let mock = Box::new(MockInstance {
        loader_data: loader_data(),
        devices: Mutex::new(Vec::new()),
        failure: Mutex::new(None),
        enumerate_calls: AtomicUsize::new(0),
        destroyed: AtomicBool::new(false),
    });
    *p_instance = vk::Instance::from_raw(Box::into_raw(mock) as u64);

    vk::Result::SUCCESS
}

unsafe extern "system" fn destroy_instance(
    handle: vk::Instance,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    instance(handle).destroyed.store(true, Ordering::SeqCst);
}

unsafe extern "system" fn enumerate_physical_devices(
    handle: vk::Instance,
    p_count: *mut u32,
    p_devices: *mut vk::PhysicalDevice,
) -> vk::Result {
    let mock = instance(handle);
    mock.enumerate_calls.fetch_add(1, Ordering::SeqCst);

    if let Some(failure) = *mock.failure.lock() {
        return failure;
    }

    let devices = mock.devices.lock();

    if p_devices.is_null() {
        *p_count = devices.len() as u32;
        return vk::Result::SUCCESS;
    }

    let written = (*p_count as usize).min(devices.len());
    ptr::copy_nonoverlapping(devices.as_ptr(), p_devices, written);
    *p_count = written as u32;

    if written < devices.len() {
        vk::Result::INCOMPLETE
    } else {
        vk::Result::SUCCESS
    }
}

/// One group per device.
unsafe extern "system" fn enumerate_physical_device_groups(
    handle: vk::Instance,
    p_count: *mut u32,
    p_groups: *mut vk::PhysicalDeviceGroupProperties<'_>,
) -> vk::Result {
    let mock = instance(handle);

    if let Some(failure) = *mock.failure.lock() {
        return failure;
    }

    let devices = mock.devices.lock();

    if p_groups.is_null() {
        *p_count = devices.len() as u32;
        return vk::Result::SUCCESS;
    }

    let written = (*p_count as usize).min(devices.len());
    for (i, device) in devices.iter().take(written).enumerate() {
        let group = p_groups.add(i);
        (*group).physical_device_count = 1;
        (*group).physical_devices[0] = *device;
        (*group).subset_allocation = vk::TRUE;
    }
    *p_count = written as u32;

    if written < devices.len() {
        vk::Result::INCOMPLETE
    } else {
        vk::Result::SUCCESS
    }
}

unsafe extern "system" fn enumerate_device_extension_properties(
    _physical_device: vk::PhysicalDevice,
    _p_layer_name: *const c_char,
    p_count: *mut u32,
    _p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    *p_count = EXTENSION_COUNT;
    vk::Result::SUCCESS
}

/// Fails with `VK_ERROR_EXTENSION_NOT_PRESENT` when any extension is requested.
unsafe extern "system" fn create_device(
    _physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo<'_>,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
    p_device: *mut vk::Device,
) -> vk::Result {
    if (*p_create_info).enabled_extension_count > 0 {
        return vk::Result::ERROR_EXTENSION_NOT_PRESENT;
    }

    let mock = Box::new(MockDevice {
        loader_data: loader_data(),
        destroyed: AtomicBool::new(false),
    });
    *p_device = vk::Device::from_raw(Box::into_raw(mock) as u64);

    vk::Result::SUCCESS
}

unsafe extern "system" fn destroy_device(
    handle: vk::Device,
    _p_allocator: *const vk::AllocationCallbacks<'_>,
) {
    device(handle).destroyed.store(true, Ordering::SeqCst);
}

/// The `pNext` chain the loader builds for `vkCreateInstance`: a loader-data
/// callback node followed by the link-info node pointing at the mock.
pub struct InstanceChain {
    _link: Box<LayerInstanceLink>,
    callback: Box<LayerInstanceCreateInfo>,
    info: Box<LayerInstanceCreateInfo>,
    pub create_info: vk::InstanceCreateInfo<'static>,
}

impl InstanceChain {
    pub fn new() -> Self {
        let mut link = Box::new(LayerInstanceLink {
            next: ptr::null_mut(),
            next_get_instance_proc_addr: Some(get_instance_proc_addr),
            next_get_physical_device_proc_addr: None,
        });
        let info = Box::new(LayerInstanceCreateInfo {
            s_type: vk::StructureType::LOADER_INSTANCE_CREATE_INFO,
            p_next: ptr::null(),
            function: LayerFunction::LAYER_LINK_INFO,
            u: LayerInstancePayload {
                layer_info: ptr::addr_of_mut!(*link),
            },
        });
        let callback = Box::new(LayerInstanceCreateInfo {
            s_type: vk::StructureType::LOADER_INSTANCE_CREATE_INFO,
            p_next: ptr::addr_of!(*info).cast(),
            function: LayerFunction::LOADER_DATA_CALLBACK,
            u: LayerInstancePayload {
                set_instance_loader_data: None,
            },
        });
        let create_info = vk::InstanceCreateInfo {
            p_next: ptr::addr_of!(*callback).cast::<c_void>(),
            ..Default::default()
        };

        Self {
            _link: link,
            callback,
            info,
            create_info,
        }
    }

    /// A chain that only carries the callback node.
    pub fn unlinked() -> Self {
        let mut chain = Self::new();
        chain.callback.p_next = ptr::null();

        chain
    }

    pub fn layer_info(&self) -> *mut LayerInstanceLink {
        unsafe { self.info.u.layer_info }
    }
}

pub struct DeviceChain {
    _link: Box<LayerDeviceLink>,
    info: Box<LayerDeviceCreateInfo>,
    pub create_info: vk::DeviceCreateInfo<'static>,
}

impl DeviceChain {
    pub fn new() -> Self {
        let mut link = Box::new(LayerDeviceLink {
            next: ptr::null_mut(),
            next_get_instance_proc_addr: Some(get_instance_proc_addr),
            next_get_device_proc_addr: Some(get_device_proc_addr),
        });
        let info = Box::new(LayerDeviceCreateInfo {
            s_type: vk::StructureType::LOADER_DEVICE_CREATE_INFO,
            p_next: ptr::null(),
            function: LayerFunction::LAYER_LINK_INFO,
            u: LayerDevicePayload {
                layer_info: ptr::addr_of_mut!(*link),
            },
        });
        let create_info = vk::DeviceCreateInfo {
            p_next: ptr::addr_of!(*info).cast::<c_void>(),
            ..Default::default()
        };

        Self {
            _link: link,
            info,
            create_info,
        }
    }

    pub fn layer_info(&self) -> *mut LayerDeviceLink {
        unsafe { self.info.u.layer_info }
    }
}

/// In-memory sink standing in for one console stream.
#[derive(Clone, Debug, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[derive(Debug)]
pub struct Logs {
    pub stdout: String,
    pub stderr: String,
}

/// Runs `f` on this thread under the layer's console formatting, with both
/// streams redirected into memory.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Logs) {
    let stdout = LogBuffer::default();
    let stderr = LogBuffer::default();
    let writer = stderr
        .clone()
        .with_max_level(Level::WARN)
        .or_else(stdout.clone());
    let subscriber = tracing_subscriber::registry().with(logging::console_layer(writer));

    let result = tracing::subscriber::with_default(subscriber, f);

    (
        result,
        Logs {
            stdout: stdout.contents(),
            stderr: stderr.contents(),
        },
    )
}
