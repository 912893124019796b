/*! GPU synchronization primitives.
 *
 * [`Semaphore`] is a binary semaphore: one signaler, one waiter, queue-side
 * only. [`Fence`] is a monotonic 64-bit timeline with any number of waiters
 * and signalers, and is the backbone of deferred destruction, swapchain
 * pacing and upload completion tracking.
 */

use std::sync::Weak;

use anyhow::Result;
use ash::vk;

use crate::{
    device::{self, Device, DeviceShared, ResourceKind},
    handle::{DeviceResource, Handle, RefCount},
};

#[derive(Clone, Debug, Default)]
pub struct SemaphoreInfo {
    pub name: String,
}

pub struct Semaphore {
    pub(crate) raw: vk::Semaphore,
    info: SemaphoreInfo,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

impl DeviceResource for Semaphore {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::Semaphore::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    fn destroy(&self, id: u64) {
        if let Some(device) = self.device.upgrade() {
            device.schedule_zombie(id, ResourceKind::Semaphore);
        }
    }
}

impl Semaphore {
    pub fn from(device: &Device, info: SemaphoreInfo) -> Result<Handle<Semaphore>> {
        let shared = &device.shared;

        let mut type_info =
            vk::SemaphoreTypeCreateInfo::default().semaphore_type(vk::SemaphoreType::BINARY);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
        let raw = unsafe { shared.raw.create_semaphore(&create_info, None)? };

        shared.set_debug_name(raw, &info.name);

        let (index, ptr) = shared.resources.semaphores.insert(Self {
            raw,
            info,
            refs: RefCount::default(),
            device: device::downgrade(device),
        });
        Ok(Handle::from_raw(index.to_u64(), ptr))
    }
}

impl Handle<Semaphore> {
    pub fn info(&self) -> Option<&SemaphoreInfo> {
        self.get().map(|semaphore| &semaphore.info)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FenceInfo {
    pub name: String,
    pub initial_value: u64,
}

pub struct Fence {
    pub(crate) raw: vk::Semaphore,
    info: FenceInfo,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

impl DeviceResource for Fence {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::Semaphore::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    fn destroy(&self, id: u64) {
        if let Some(device) = self.device.upgrade() {
            device.schedule_zombie(id, ResourceKind::Fence);
        }
    }
}

impl Fence {
    pub fn from(device: &Device, info: FenceInfo) -> Result<Handle<Fence>> {
        let shared = &device.shared;

        let mut type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(info.initial_value);
        let create_info = vk::SemaphoreCreateInfo::default().push_next(&mut type_info);
        let raw = unsafe { shared.raw.create_semaphore(&create_info, None)? };

        shared.set_debug_name(raw, &info.name);

        let (index, ptr) = shared.resources.fences.insert(Self {
            raw,
            info,
            refs: RefCount::default(),
            device: device::downgrade(device),
        });
        Ok(Handle::from_raw(index.to_u64(), ptr))
    }
}

impl Handle<Fence> {
    pub fn info(&self) -> Option<&FenceInfo> {
        self.get().map(|fence| &fence.info)
    }

    /// Current timeline value; zero when the fence or its device is gone.
    pub fn value(&self) -> u64 {
        let Some(fence) = self.get() else {
            return 0;
        };
        let Some(device) = fence.device.upgrade() else {
            return 0;
        };
        unsafe { device.raw.get_semaphore_counter_value(fence.raw).unwrap_or(0) }
    }

    /// Signals the timeline to `value` from the host.
    pub fn signal(&self, value: u64) {
        let Some(fence) = self.get() else {
            return;
        };
        let Some(device) = fence.device.upgrade() else {
            return;
        };
        let signal_info = vk::SemaphoreSignalInfo::default()
            .semaphore(fence.raw)
            .value(value);
        unsafe {
            if let Err(error) = device.raw.signal_semaphore(&signal_info) {
                log::error!("vkSignalSemaphore failed: {}", error);
            }
        }
    }

    /// Blocks until the timeline reaches `value` or `timeout` device ticks
    /// elapse. Returns `false` on timeout.
    pub fn wait_for_value(&self, value: u64, timeout: u64) -> bool {
        let Some(fence) = self.get() else {
            return false;
        };
        let Some(device) = fence.device.upgrade() else {
            return false;
        };
        let semaphores = [fence.raw];
        let values = [value];
        let wait_info = vk::SemaphoreWaitInfo::default()
            .semaphores(&semaphores)
            .values(&values);
        unsafe { device.raw.wait_semaphores(&wait_info, timeout).is_ok() }
    }
}
