/*! Device buffers.
 *
 * Every buffer is created with `SHADER_DEVICE_ADDRESS` usage and captures
 * its GPU address at creation. Shaders reach buffers through the
 * buffer-device-address table rather than descriptor slots; [`Handle::bind`]
 * writes the address into the table slot the caller picked.
 */

use std::sync::Weak;

use anyhow::Result;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};

use ash::vk;

use crate::{
    device::{self, Device, DeviceShared, ResourceKind},
    handle::{DeviceResource, Handle, RefCount},
    translate,
    types::{BufferUsage, MemoryUsage, SharingMode},
};

#[derive(Clone, Debug)]
pub struct BufferInfo {
    pub name: String,
    pub size: usize,
    pub buffer_usage: BufferUsage,
    pub memory_usage: MemoryUsage,
    pub sharing_mode: SharingMode,
}

impl Default for BufferInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            size: 0,
            buffer_usage: BufferUsage::empty(),
            memory_usage: MemoryUsage::CAN_ALIAS | MemoryUsage::DEDICATED,
            sharing_mode: SharingMode::Concurrent,
        }
    }
}

/// Selects the buffer-device-address table slot a buffer address lands in.
#[derive(Clone, Copy, Debug)]
pub struct BufferBindInfo {
    pub offset: usize,
    /// Range the consumer reads through the published address;
    /// `usize::MAX` means "to the end of the buffer".
    pub size: usize,
    pub index: u32,
}

impl Default for BufferBindInfo {
    fn default() -> Self {
        Self {
            offset: 0,
            size: usize::MAX,
            index: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryRequirementInfo {
    pub size: u64,
    pub alignment: u64,
    pub memory_type_bits: u32,
}

pub struct Buffer {
    pub(crate) raw: vk::Buffer,
    pub(crate) address: vk::DeviceAddress,
    pub(crate) allocation: Option<Allocation>,
    info: BufferInfo,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

impl DeviceResource for Buffer {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::Buffer::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    fn destroy(&self, id: u64) {
        if let Some(device) = self.device.upgrade() {
            device.schedule_zombie(id, ResourceKind::Buffer);
        }
    }
}

impl Buffer {
    pub fn from(device: &Device, info: BufferInfo) -> Result<Handle<Buffer>> {
        if info.size == 0 {
            return Err(anyhow::anyhow!("Buffer size must be non-zero"));
        }

        let shared = &device.shared;

        let usage_flags = translate::translate_buffer_usage_flags(info.buffer_usage)
            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;

        let queue_family_indices = shared_queue_family_indices(shared);
        let mut create_info = vk::BufferCreateInfo::default()
            .size(info.size as vk::DeviceSize)
            .usage(usage_flags)
            .sharing_mode(translate::translate_sharing_mode(info.sharing_mode));
        if info.sharing_mode == SharingMode::Concurrent {
            create_info = create_info.queue_family_indices(&queue_family_indices);
        }

        let raw = unsafe { shared.raw.create_buffer(&create_info, None)? };
        let requirements = unsafe { shared.raw.get_buffer_memory_requirements(raw) };

        let allocation = shared.allocator.lock().allocate(&AllocationCreateDesc {
            name: &info.name,
            requirements,
            location: translate::memory_location(info.memory_usage),
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(error) => {
                unsafe { shared.raw.destroy_buffer(raw, None) };
                return Err(error.into());
            }
        };

        unsafe {
            shared
                .raw
                .bind_buffer_memory(raw, allocation.memory(), allocation.offset())?;
        }

        let address_info = vk::BufferDeviceAddressInfo::default().buffer(raw);
        let address = unsafe { shared.raw.get_buffer_device_address(&address_info) };

        shared.set_debug_name(raw, &info.name);

        let (index, ptr) = shared.resources.buffers.insert(Self {
            raw,
            address,
            allocation: Some(allocation),
            info,
            refs: RefCount::default(),
            device: device::downgrade(device),
        });
        Ok(Handle::from_raw(index.to_u64(), ptr))
    }

    /// Size and alignment a buffer with `info` would require, without
    /// creating it.
    pub fn memory_requirement(device: &Device, info: &BufferInfo) -> MemoryRequirementInfo {
        let usage_flags = translate::translate_buffer_usage_flags(info.buffer_usage)
            | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS;
        let create_info = vk::BufferCreateInfo::default()
            .size(info.size as vk::DeviceSize)
            .usage(usage_flags)
            .sharing_mode(translate::translate_sharing_mode(info.sharing_mode));
        let requirements_info =
            vk::DeviceBufferMemoryRequirements::default().create_info(&create_info);
        let mut requirements = vk::MemoryRequirements2::default();
        unsafe {
            device
                .shared
                .raw
                .get_device_buffer_memory_requirements(&requirements_info, &mut requirements);
        }
        MemoryRequirementInfo {
            size: requirements.memory_requirements.size,
            alignment: requirements.memory_requirements.alignment,
            memory_type_bits: requirements.memory_requirements.memory_type_bits,
        }
    }

    fn mapped_ptr(&self) -> Option<*mut u8> {
        self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .map(|ptr| ptr.as_ptr() as *mut u8)
    }
}

fn shared_queue_family_indices(shared: &DeviceShared) -> Vec<u32> {
    let mut indices = vec![
        shared.main_queue.family_index,
        shared.compute_queue.family_index,
        shared.transfer_queue.family_index,
    ];
    indices.sort_unstable();
    indices.dedup();
    indices
}

impl Handle<Buffer> {
    pub fn info(&self) -> Option<&BufferInfo> {
        self.get().map(|buffer| &buffer.info)
    }

    pub fn size(&self) -> usize {
        self.get().map_or(0, |buffer| buffer.info.size)
    }

    pub fn is_host_visible(&self) -> bool {
        self.get()
            .map_or(false, |buffer| buffer.mapped_ptr().is_some())
    }

    /// Persistently mapped pointer; `None` for device-local buffers.
    pub fn data(&self) -> Option<*mut u8> {
        self.get().and_then(Buffer::mapped_ptr)
    }

    /// GPU virtual address of the buffer's backing memory.
    pub fn gpu_address(&self) -> u64 {
        self.get().map_or(0, |buffer| buffer.address)
    }

    /// Copies `data` into the mapped range at `offset`. Requires a
    /// host-visible buffer and `offset + data.len() <= size()`; violations
    /// are debug-asserted and otherwise ignored.
    pub fn write(&self, data: &[u8], offset: usize) {
        let Some(buffer) = self.get() else {
            return;
        };
        let Some(mapped) = buffer.mapped_ptr() else {
            debug_assert!(false, "write on a buffer that is not host visible");
            return;
        };
        let in_bounds = offset
            .checked_add(data.len())
            .map_or(false, |end| end <= buffer.info.size);
        debug_assert!(in_bounds, "write past the end of the buffer");
        if !in_bounds {
            return;
        }
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.add(offset), data.len());
        }
    }

    /// Typed variant of [`Self::write`].
    pub fn write_slice<T: Copy>(&self, data: &[T], offset: usize) {
        let bytes = unsafe {
            std::slice::from_raw_parts(data.as_ptr() as *const u8, std::mem::size_of_val(data))
        };
        self.write(bytes, offset);
    }

    /// Zeroes the whole mapped range of a host-visible buffer.
    pub fn clear(&self) {
        let Some(buffer) = self.get() else {
            return;
        };
        let Some(mapped) = buffer.mapped_ptr() else {
            return;
        };
        unsafe {
            std::ptr::write_bytes(mapped, 0, buffer.info.size);
        }
    }

    /// Publishes the buffer's device address in the bindless address table.
    /// Returns the effective bind info with the index reduced modulo the
    /// table capacity.
    pub fn bind(&self, info: BufferBindInfo) -> BufferBindInfo {
        let Some(buffer) = self.get() else {
            return info;
        };
        let Some(device) = buffer.device.upgrade() else {
            return info;
        };

        let index = info.index % device.config().max_buffers;
        device
            .descriptor_cache
            .write_buffer_address(index as usize, buffer.address + info.offset as u64);

        BufferBindInfo {
            offset: info.offset,
            size: info.size,
            index,
        }
    }
}
