/*! Bindless descriptor cache.
 *
 * One descriptor pool, one set layout and one descriptor set per device.
 * Fixed bindings: storage images, combined image samplers, sampled images,
 * samplers and a buffer-device-address table. Buffers never occupy
 * descriptor slots; shaders reach them through the 64-bit addresses written
 * into the table at binding 4.
 *
 * Pipeline layouts are cached per push-constant size class, one layout for
 * every multiple of four bytes up to the configured maximum.
 */

use std::collections::HashMap;

use anyhow::{Context, Result};
use ash::vk;
use gpu_allocator::{
    vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator},
    MemoryLocation,
};

use crate::{
    device::DeviceConfig, BUFFER_DEVICE_ADDRESS_BINDING, COMBINED_IMAGE_SAMPLER_BINDING,
    SAMPLED_IMAGE_BINDING, SAMPLER_BINDING, STORAGE_IMAGE_BINDING,
};

/// Rounds a push-constant size up to its layout key.
pub(crate) fn push_constant_size_key(size: u32) -> u32 {
    (size + 3) & !3u32
}

pub(crate) struct DescriptorCache {
    pipeline_layouts: HashMap<u32, vk::PipelineLayout>,
    max_push_constant_size: u32,

    pub(crate) descriptor_pool: vk::DescriptorPool,
    pub(crate) descriptor_set_layout: vk::DescriptorSetLayout,
    pub(crate) descriptor_set: vk::DescriptorSet,

    pub(crate) bda_buffer: vk::Buffer,
    bda_allocation: Option<Allocation>,
    bda_host: *mut u64,
    bda_capacity: usize,
}

// The host pointer aliases persistently mapped memory owned by the cache.
unsafe impl Send for DescriptorCache {}
unsafe impl Sync for DescriptorCache {}

impl DescriptorCache {
    pub(crate) fn new(
        device: &ash::Device,
        allocator: &mut Allocator,
        config: &DeviceConfig,
    ) -> Result<Self> {
        let pool_sizes = [
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::STORAGE_IMAGE)
                .descriptor_count(config.max_images),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(config.max_images),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(config.max_images),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::SAMPLER)
                .descriptor_count(config.max_samplers),
            vk::DescriptorPoolSize::default()
                .ty(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(1),
        ];
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND)
            .max_sets(1)
            .pool_sizes(&pool_sizes);
        let descriptor_pool = unsafe {
            device
                .create_descriptor_pool(&pool_info, None)
                .with_context(|| "Failed to create the bindless descriptor pool")?
        };

        let bindings = [
            vk::DescriptorSetLayoutBinding::default()
                .binding(STORAGE_IMAGE_BINDING)
                .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                .descriptor_count(config.max_images)
                .stage_flags(vk::ShaderStageFlags::ALL),
            vk::DescriptorSetLayoutBinding::default()
                .binding(COMBINED_IMAGE_SAMPLER_BINDING)
                .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                .descriptor_count(config.max_images)
                .stage_flags(vk::ShaderStageFlags::ALL),
            vk::DescriptorSetLayoutBinding::default()
                .binding(SAMPLED_IMAGE_BINDING)
                .descriptor_type(vk::DescriptorType::SAMPLED_IMAGE)
                .descriptor_count(config.max_images)
                .stage_flags(vk::ShaderStageFlags::ALL),
            vk::DescriptorSetLayoutBinding::default()
                .binding(SAMPLER_BINDING)
                .descriptor_type(vk::DescriptorType::SAMPLER)
                .descriptor_count(config.max_samplers)
                .stage_flags(vk::ShaderStageFlags::ALL),
            vk::DescriptorSetLayoutBinding::default()
                .binding(BUFFER_DEVICE_ADDRESS_BINDING)
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .descriptor_count(1)
                .stage_flags(vk::ShaderStageFlags::ALL),
        ];
        let binding_flags = [vk::DescriptorBindingFlags::PARTIALLY_BOUND
            | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND; 5];
        let mut binding_flags_info =
            vk::DescriptorSetLayoutBindingFlagsCreateInfo::default().binding_flags(&binding_flags);
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default()
            .bindings(&bindings)
            .flags(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
            .push_next(&mut binding_flags_info);
        let descriptor_set_layout = unsafe {
            device
                .create_descriptor_set_layout(&layout_info, None)
                .with_context(|| "Failed to create the bindless descriptor set layout")?
        };

        let set_layouts = [descriptor_set_layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(descriptor_pool)
            .set_layouts(&set_layouts);
        let descriptor_set = unsafe {
            device
                .allocate_descriptor_sets(&allocate_info)
                .with_context(|| "Failed to allocate the bindless descriptor set")?[0]
        };

        // Buffer-device-address table. One u64 slot per addressable buffer,
        // host visible and persistently mapped.
        let bda_capacity = config.max_buffers as usize;
        let bda_size = (bda_capacity * std::mem::size_of::<u64>()) as vk::DeviceSize;
        let bda_info = vk::BufferCreateInfo::default()
            .size(bda_size)
            .usage(vk::BufferUsageFlags::STORAGE_BUFFER);
        let bda_buffer = unsafe { device.create_buffer(&bda_info, None)? };
        let requirements = unsafe { device.get_buffer_memory_requirements(bda_buffer) };
        let bda_allocation = allocator.allocate(&AllocationCreateDesc {
            name: "buffer device address table",
            requirements,
            location: MemoryLocation::CpuToGpu,
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })?;
        unsafe {
            device.bind_buffer_memory(bda_buffer, bda_allocation.memory(), bda_allocation.offset())?;
        }
        let bda_host = bda_allocation
            .mapped_ptr()
            .map(|ptr| ptr.as_ptr() as *mut u64)
            .ok_or_else(|| anyhow::anyhow!("Buffer device address table is not host mapped"))?;

        let bda_descriptor_info = [vk::DescriptorBufferInfo::default()
            .buffer(bda_buffer)
            .offset(0)
            .range(bda_size)];
        let bda_write = vk::WriteDescriptorSet::default()
            .dst_set(descriptor_set)
            .dst_binding(BUFFER_DEVICE_ADDRESS_BINDING)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
            .buffer_info(&bda_descriptor_info);
        unsafe {
            device.update_descriptor_sets(std::slice::from_ref(&bda_write), &[]);
        }

        let max_push_constant_size = push_constant_size_key(config.push_constant_max_size);
        let mut pipeline_layouts = HashMap::new();
        for size in (0..=max_push_constant_size).step_by(4) {
            let range = [vk::PushConstantRange::default()
                .stage_flags(vk::ShaderStageFlags::ALL)
                .offset(0)
                .size(size)];
            let mut layout_info =
                vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
            if size > 0 {
                layout_info = layout_info.push_constant_ranges(&range);
            }
            let layout = unsafe { device.create_pipeline_layout(&layout_info, None)? };
            pipeline_layouts.insert(size, layout);
        }

        Ok(Self {
            pipeline_layouts,
            max_push_constant_size,
            descriptor_pool,
            descriptor_set_layout,
            descriptor_set,
            bda_buffer,
            bda_allocation: Some(bda_allocation),
            bda_host,
            bda_capacity,
        })
    }

    /// Layout for a push constant of `size` bytes. Sizes above the configured
    /// maximum route through the largest layout.
    pub(crate) fn pipeline_layout(&self, size: u32) -> vk::PipelineLayout {
        let key = push_constant_size_key(size).min(self.max_push_constant_size);
        self.pipeline_layouts[&key]
    }

    /// Writes a buffer's device address into the table. `slot` is already
    /// reduced modulo the table capacity by the caller.
    pub(crate) fn write_buffer_address(&self, slot: usize, address: u64) {
        debug_assert!(slot < self.bda_capacity);
        if slot < self.bda_capacity {
            unsafe {
                self.bda_host.add(slot).write_volatile(address);
            }
        }
    }

    pub(crate) fn destroy(&mut self, device: &ash::Device, allocator: &mut Allocator) {
        unsafe {
            for (_, layout) in self.pipeline_layouts.drain() {
                device.destroy_pipeline_layout(layout, None);
            }
            device.destroy_buffer(self.bda_buffer, None);
            if let Some(allocation) = self.bda_allocation.take() {
                let _ = allocator.free(allocation);
            }
            device.destroy_descriptor_set_layout(self.descriptor_set_layout, None);
            device.destroy_descriptor_pool(self.descriptor_pool, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_constant_size_keys_round_up_to_four() {
        assert_eq!(push_constant_size_key(0), 0);
        assert_eq!(push_constant_size_key(1), 4);
        assert_eq!(push_constant_size_key(4), 4);
        assert_eq!(push_constant_size_key(13), 16);
        assert_eq!(push_constant_size_key(16), 16);
        assert_eq!(push_constant_size_key(64), 64);
        assert_eq!(push_constant_size_key(127), 128);
    }
}
