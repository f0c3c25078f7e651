//! Loader <-> layer handshake structures from `vk_layer.h`.
//!
//! These are not part of the registry `ash` is generated from, so they are
//! declared here with the C layout the loader expects.

use std::{
    ffi::{c_char, c_void},
    mem::size_of,
};

use ash::vk;
use static_assertions::const_assert_eq;

#[allow(non_camel_case_types)]
pub type PFN_GetPhysicalDeviceProcAddr = unsafe extern "system" fn(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction;

pub const CURRENT_LOADER_LAYER_INTERFACE_VERSION: u32 = 2;

#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerFunction(i32);

impl LayerFunction {
    pub const LAYER_LINK_INFO: Self = Self(0);
    pub const LOADER_DATA_CALLBACK: Self = Self(1);
}

#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NegotiateLayerStructType(i32);

impl NegotiateLayerStructType {
    pub const UNINITIALIZED: Self = Self(0);
    pub const INTERFACE_STRUCT: Self = Self(1);
}

#[repr(C)]
#[derive(Debug)]
pub struct LayerInstanceLink {
    pub next: *mut LayerInstanceLink,
    pub next_get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub next_get_physical_device_proc_addr: Option<PFN_GetPhysicalDeviceProcAddr>,
}

#[repr(C)]
#[derive(Debug)]
pub struct LayerDeviceLink {
    pub next: *mut LayerDeviceLink,
    pub next_get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub next_get_device_proc_addr: Option<vk::PFN_vkGetDeviceProcAddr>,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union LayerInstancePayload {
    pub layer_info: *mut LayerInstanceLink,
    pub set_instance_loader_data: vk::PFN_vkVoidFunction,
    pub layer_device: [vk::PFN_vkVoidFunction; 2],
    pub loader_features: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union LayerDevicePayload {
    pub layer_info: *mut LayerDeviceLink,
}

/// `VkLayerInstanceCreateInfo`
#[repr(C)]
pub struct LayerInstanceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: LayerFunction,
    pub u: LayerInstancePayload,
}

/// `VkLayerDeviceCreateInfo`
#[repr(C)]
pub struct LayerDeviceCreateInfo {
    pub s_type: vk::StructureType,
    pub p_next: *const c_void,
    pub function: LayerFunction,
    pub u: LayerDevicePayload,
}

/// `VkNegotiateLayerInterface`
#[repr(C)]
pub struct NegotiateLayerInterface {
    pub s_type: NegotiateLayerStructType,
    pub p_next: *mut c_void,
    pub loader_layer_interface_version: u32,
    pub pfn_get_instance_proc_addr: Option<vk::PFN_vkGetInstanceProcAddr>,
    pub pfn_get_device_proc_addr: Option<vk::PFN_vkGetDeviceProcAddr>,
    pub pfn_get_physical_device_proc_addr: Option<PFN_GetPhysicalDeviceProcAddr>,
}

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        const_assert_eq!(size_of::<LayerInstanceCreateInfo>(), 40);
        const_assert_eq!(size_of::<LayerDeviceCreateInfo>(), 32);
        const_assert_eq!(size_of::<NegotiateLayerInterface>(), 48);
    } else if #[cfg(target_pointer_width = "32")] {
        const_assert_eq!(size_of::<LayerInstanceCreateInfo>(), 20);
        const_assert_eq!(size_of::<LayerDeviceCreateInfo>(), 16);
        const_assert_eq!(size_of::<NegotiateLayerInterface>(), 24);
    }
}

/// Common prefix of every structure that can appear in a `pNext` chain.
#[repr(C)]
struct ChainHeader {
    s_type: vk::StructureType,
    p_next: *const ChainHeader,
}

/// Walks a `pNext` chain node by node.
pub struct Chain {
    next: *const ChainHeader,
}

impl Chain {
    /// # Safety
    /// `p_next` must be null or the head of a well-formed `pNext` chain that
    /// outlives the iterator.
    pub unsafe fn new(p_next: *const c_void) -> Self {
        Self {
            next: p_next.cast(),
        }
    }
}

impl Iterator for Chain {
    type Item = (vk::StructureType, *const c_void);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next;

        if node.is_null() {
            return None;
        }

        // SAFETY: non-null nodes of a well-formed chain start with a header.
        let header = unsafe { &*node };
        self.next = header.p_next;

        Some((header.s_type, node.cast()))
    }
}

/// A loader-owned create-info node carrying a per-layer link list.
pub trait LoaderCreateInfo {
    const STRUCTURE_TYPE: vk::StructureType;

    fn function(&self) -> LayerFunction;
}

impl LoaderCreateInfo for LayerInstanceCreateInfo {
    const STRUCTURE_TYPE: vk::StructureType = vk::StructureType::LOADER_INSTANCE_CREATE_INFO;

    fn function(&self) -> LayerFunction {
        self.function
    }
}

impl LoaderCreateInfo for LayerDeviceCreateInfo {
    const STRUCTURE_TYPE: vk::StructureType = vk::StructureType::LOADER_DEVICE_CREATE_INFO;

    fn function(&self) -> LayerFunction {
        self.function
    }
}

/// Finds the first `T` node in the chain whose function is `VK_LAYER_LINK_INFO`.
///
/// The loader hands the chain over as `const`, but each layer is expected to
/// advance the link pointer in place, hence the mutable result.
///
/// # Safety
/// Same requirements as [`Chain::new`].
pub unsafe fn find_link_info<T: LoaderCreateInfo>(p_next: *const c_void) -> Option<*mut T> {
    Chain::new(p_next)
        .filter(|(s_type, _)| *s_type == T::STRUCTURE_TYPE)
        .map(|(_, node)| node.cast_mut().cast::<T>())
        .find(|node| (**node).function() == LayerFunction::LAYER_LINK_INFO)
}

/// Resolvers the next layer exposes to this one.
#[derive(Clone, Copy, Debug)]
pub struct NextDeviceLink {
    pub get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    pub get_device_proc_addr: vk::PFN_vkGetDeviceProcAddr,
}

impl LayerInstanceCreateInfo {
    /// Takes this layer's link and moves the chain on for the next layer.
    ///
    /// # Safety
    /// `self` must be a link-info node whose `layer_info` is null or valid.
    pub unsafe fn take_link(&mut self) -> Option<vk::PFN_vkGetInstanceProcAddr> {
        let link = self.u.layer_info.as_ref()?;
        let get_instance_proc_addr = link.next_get_instance_proc_addr?;
        self.u.layer_info = link.next;

        Some(get_instance_proc_addr)
    }
}

impl LayerDeviceCreateInfo {
    /// Takes this layer's link and moves the chain on for the next layer.
    ///
    /// # Safety
    /// `self` must be a link-info node whose `layer_info` is null or valid.
    pub unsafe fn take_link(&mut self) -> Option<NextDeviceLink> {
        let link = self.u.layer_info.as_ref()?;
        let next = NextDeviceLink {
            get_instance_proc_addr: link.next_get_instance_proc_addr?,
            get_device_proc_addr: link.next_get_device_proc_addr?,
        };
        self.u.layer_info = link.next;

        Some(next)
    }
}
