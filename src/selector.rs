use std::ptr;

use ash::{prelude::VkResult, vk};
use tracing::{debug, info, warn};

/// Outcome of picking one device out of the real list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    /// The layer below reported no devices at all.
    NoDevice,
    Chosen {
        device: vk::PhysicalDevice,
        index: usize,
    },
    /// The requested index was out of range; device 0 was taken instead.
    Fallback {
        device: vk::PhysicalDevice,
        requested: i64,
        count: usize,
    },
}

impl Selection {
    pub fn device(&self) -> Option<vk::PhysicalDevice> {
        match *self {
            Self::NoDevice => None,
            Self::Chosen { device, .. } | Self::Fallback { device, .. } => Some(device),
        }
    }
}

pub fn select(devices: &[vk::PhysicalDevice], requested: i64) -> Selection {
    let Some(&first) = devices.first() else {
        return Selection::NoDevice;
    };

    match usize::try_from(requested)
        .ok()
        .and_then(|index| devices.get(index).map(|device| (index, *device)))
    {
        Some((index, device)) => Selection::Chosen { device, index },
        None => Selection::Fallback {
            device: first,
            requested,
            count: devices.len(),
        },
    }
}

/// Asks the layer below for its complete device list.
///
/// Any non-success code, `VK_INCOMPLETE` included, is returned as is.
///
/// # Safety
/// `enumerate` must be the next layer's `vkEnumeratePhysicalDevices` for `instance`.
pub unsafe fn enumerate_physical_devices(
    instance: vk::Instance,
    enumerate: vk::PFN_vkEnumeratePhysicalDevices,
) -> VkResult<Vec<vk::PhysicalDevice>> {
    let mut count = 0;
    enumerate(instance, &mut count, ptr::null_mut()).result()?;

    if count == 0 {
        return Ok(Vec::new());
    }

    let mut devices = Vec::with_capacity(count as usize);
    enumerate(instance, &mut count, devices.as_mut_ptr()).result()?;
    devices.set_len((count as usize).min(devices.capacity()));

    Ok(devices)
}

/// Fetches the real devices and picks the one at `requested`.
///
/// # Safety
/// Same requirements as [`enumerate_physical_devices`].
pub unsafe fn choose_device(
    instance: vk::Instance,
    enumerate: vk::PFN_vkEnumeratePhysicalDevices,
    requested: i64,
) -> VkResult<Selection> {
    let devices = enumerate_physical_devices(instance, enumerate)?;
    let selection = select(&devices, requested);

    match selection {
        Selection::NoDevice => debug!("No physical devices reported, nothing to choose from"),
        Selection::Chosen { index, .. } => info!("Using Vulkan device index {index}"),
        Selection::Fallback {
            requested, count, ..
        } => warn!(
            "Device index {requested} is out of bounds (found {count} devices), falling back to device 0"
        ),
    }

    Ok(selection)
}

/// Answers a count-then-fill query whose result holds at most one element.
///
/// A null `p_out` is the count query. A buffer with zero capacity is left
/// untouched together with the count.
///
/// # Safety
/// `p_count` must be valid; `p_out` must be null or point to `*p_count` elements.
pub unsafe fn report_one<T>(
    device: Option<vk::PhysicalDevice>,
    p_count: *mut u32,
    p_out: *mut T,
    fill: impl FnOnce(*mut T, vk::PhysicalDevice),
) {
    let Some(device) = device else {
        *p_count = 0;
        return;
    };

    if p_out.is_null() {
        *p_count = 1;
    } else if *p_count > 0 {
        fill(p_out, device);
        *p_count = 1;
    }
}

/// # Safety
/// See [`report_one`].
pub unsafe fn report_device(
    device: Option<vk::PhysicalDevice>,
    p_count: *mut u32,
    p_devices: *mut vk::PhysicalDevice,
) {
    report_one(device, p_count, p_devices, |out, device| out.write(device));
}

/// Reports a single group holding only the chosen device.
///
/// # Safety
/// See [`report_one`]. The caller owns `sType`/`pNext` of the group.
pub unsafe fn report_device_group(
    device: Option<vk::PhysicalDevice>,
    p_count: *mut u32,
    p_groups: *mut vk::PhysicalDeviceGroupProperties<'_>,
) {
    report_one(device, p_count, p_groups, |group, device| {
        (*group).physical_device_count = 1;
        (*group).physical_devices[0] = device;
        (*group).subset_allocation = vk::FALSE;
    });
}
