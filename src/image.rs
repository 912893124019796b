/*! Device images and image views.
 *
 * An image owns one view covering every mip level and a single array layer;
 * the view's aspect is derived from the format. Swapchain images are pooled
 * like any other image but carry no allocation, since the driver owns their
 * memory.
 */

use std::sync::Weak;

use anyhow::Result;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};

use crate::{
    device::{self, Device, DeviceShared, ResourceKind},
    handle::{DeviceResource, Handle, RefCount},
    sampler::Sampler,
    translate,
    types::{
        is_depth_format, is_stencil_format, ClearValue, Extent3D, Format, ImageAspect, ImageTiling,
        ImageType, ImageUsage, MemoryUsage, SampleCount, SharingMode,
    },
    COMBINED_IMAGE_SAMPLER_BINDING, SAMPLED_IMAGE_BINDING, STORAGE_IMAGE_BINDING,
};

#[derive(Clone, Debug)]
pub struct ImageInfo {
    pub name: String,
    pub ty: ImageType,
    pub format: Format,
    pub samples: SampleCount,
    pub tiling: ImageTiling,
    pub image_usage: ImageUsage,
    pub memory_usage: MemoryUsage,
    pub dimension: Extent3D,
    pub clear_value: ClearValue,
    pub mip_levels: u32,
    pub sharing_mode: SharingMode,
}

impl Default for ImageInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            ty: ImageType::Image2D,
            format: Format::Undefined,
            samples: SampleCount::Count1,
            tiling: ImageTiling::Optimal,
            image_usage: ImageUsage::empty(),
            memory_usage: MemoryUsage::DEDICATED,
            dimension: Extent3D::default(),
            clear_value: ClearValue::default(),
            mip_levels: 1,
            sharing_mode: SharingMode::Exclusive,
        }
    }
}

/// Descriptor slot assignment for a bindless image bind.
#[derive(Clone, Debug, Default)]
pub struct ImageBindInfo {
    pub sampler: Option<Handle<Sampler>>,
    pub index: u32,
}

/// Aspect flags the image's view is created with.
pub fn aspect_for_format(format: Format) -> ImageAspect {
    let mut aspect = ImageAspect::empty();
    if is_depth_format(format) {
        aspect |= ImageAspect::DEPTH;
    }
    if is_stencil_format(format) {
        aspect |= ImageAspect::STENCIL;
    }
    if aspect.is_empty() {
        aspect = ImageAspect::COLOR;
    }
    aspect
}

pub struct Image {
    pub(crate) raw: vk::Image,
    pub(crate) view: vk::ImageView,
    pub(crate) allocation: Option<Allocation>,
    pub(crate) swapchain_owned: bool,
    info: ImageInfo,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

impl DeviceResource for Image {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::Image::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    fn destroy(&self, id: u64) {
        if let Some(device) = self.device.upgrade() {
            device.schedule_zombie(id, ResourceKind::Image);
        }
    }
}

fn image_create_info<'a>(info: &ImageInfo) -> vk::ImageCreateInfo<'a> {
    let extent = vk::Extent3D {
        width: info.dimension.width,
        height: info.dimension.height,
        depth: info.dimension.depth.max(1),
    };
    vk::ImageCreateInfo::default()
        .image_type(translate::translate_image_type(info.ty))
        .format(translate::translate_format(info.format))
        .extent(extent)
        .mip_levels(info.mip_levels)
        .array_layers(1)
        .samples(translate::translate_sample_count(info.samples))
        .tiling(translate::translate_image_tiling(info.tiling))
        .usage(translate::translate_image_usage_flags(info.image_usage))
        .sharing_mode(translate::translate_sharing_mode(info.sharing_mode))
        .initial_layout(vk::ImageLayout::UNDEFINED)
}

impl Image {
    pub fn from(device: &Device, info: ImageInfo) -> Result<Handle<Image>> {
        let shared = &device.shared;

        let max_dimension = info.dimension.width.max(info.dimension.height).max(1);
        let max_mip_levels = 32 - max_dimension.leading_zeros();
        if info.mip_levels == 0 || info.mip_levels > max_mip_levels {
            return Err(anyhow::anyhow!(
                "Image mip level count {} is outside of [1, {}]",
                info.mip_levels,
                max_mip_levels
            ));
        }
        if info.format == Format::Undefined {
            return Err(anyhow::anyhow!("Image format must not be Undefined"));
        }

        let queue_family_indices = [
            shared.main_queue.family_index,
            shared.compute_queue.family_index,
            shared.transfer_queue.family_index,
        ];
        let mut create_info = image_create_info(&info);
        if info.sharing_mode == SharingMode::Concurrent {
            create_info = create_info.queue_family_indices(&queue_family_indices);
        }

        let raw = unsafe { shared.raw.create_image(&create_info, None)? };
        let requirements = unsafe { shared.raw.get_image_memory_requirements(raw) };

        let allocation = shared.allocator.lock().allocate(&AllocationCreateDesc {
            name: &info.name,
            requirements,
            location: translate::memory_location(info.memory_usage),
            linear: false,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        });
        let allocation = match allocation {
            Ok(allocation) => allocation,
            Err(error) => {
                unsafe { shared.raw.destroy_image(raw, None) };
                return Err(error.into());
            }
        };
        unsafe {
            shared
                .raw
                .bind_image_memory(raw, allocation.memory(), allocation.offset())?;
        }

        let view = create_view(shared, raw, &info, info.mip_levels)?;

        shared.set_debug_name(raw, &info.name);
        shared.set_debug_name(view, &info.name);

        let (index, ptr) = shared.resources.images.insert(Self {
            raw,
            view,
            allocation: Some(allocation),
            swapchain_owned: false,
            info,
            refs: RefCount::default(),
            device: device::downgrade(device),
        });
        Ok(Handle::from_raw(index.to_u64(), ptr))
    }

    /// Shared handles to the images backing `swapchain`.
    pub fn from_swapchain(
        swapchain: &Handle<crate::swapchain::Swapchain>,
    ) -> Vec<Handle<Image>> {
        swapchain.images()
    }

    /// Size and alignment an image with `info` would require, without
    /// creating it.
    pub fn memory_requirement(
        device: &Device,
        info: &ImageInfo,
    ) -> crate::buffer::MemoryRequirementInfo {
        let create_info = image_create_info(info);
        let requirements_info =
            vk::DeviceImageMemoryRequirements::default().create_info(&create_info);
        let mut requirements = vk::MemoryRequirements2::default();
        unsafe {
            device
                .shared
                .raw
                .get_device_image_memory_requirements(&requirements_info, &mut requirements);
        }
        crate::buffer::MemoryRequirementInfo {
            size: requirements.memory_requirements.size,
            alignment: requirements.memory_requirements.alignment,
            memory_type_bits: requirements.memory_requirements.memory_type_bits,
        }
    }

    /// Wraps driver-owned swapchain images in pooled image resources. Their
    /// destroy path releases the view but never the image or an allocation.
    pub(crate) fn wrap_swapchain_images(
        device: &Device,
        raw_images: &[vk::Image],
        format: Format,
        dimension: Extent3D,
        image_usage: ImageUsage,
        name: &str,
    ) -> Result<Vec<Handle<Image>>> {
        let shared = &device.shared;

        let mut handles = Vec::with_capacity(raw_images.len());
        for (image_index, &raw) in raw_images.iter().enumerate() {
            let info = ImageInfo {
                name: if name.is_empty() {
                    String::new()
                } else {
                    format!("{}_{}", name, image_index)
                },
                ty: ImageType::Image2D,
                format,
                samples: SampleCount::Count1,
                tiling: ImageTiling::Optimal,
                image_usage,
                memory_usage: MemoryUsage::DEDICATED,
                dimension,
                clear_value: ClearValue::default(),
                mip_levels: 1,
                sharing_mode: SharingMode::Exclusive,
            };

            let view = create_view(shared, raw, &info, 1)?;
            shared.set_debug_name(view, &info.name);

            let (index, ptr) = shared.resources.images.insert(Self {
                raw,
                view,
                allocation: None,
                swapchain_owned: true,
                info,
                refs: RefCount::default(),
                device: device::downgrade(device),
            });
            handles.push(Handle::from_raw(index.to_u64(), ptr));
        }
        Ok(handles)
    }
}

fn create_view(
    shared: &DeviceShared,
    image: vk::Image,
    info: &ImageInfo,
    mip_levels: u32,
) -> Result<vk::ImageView> {
    let subresource_range = vk::ImageSubresourceRange::default()
        .aspect_mask(translate::translate_image_aspect_flags(aspect_for_format(
            info.format,
        )))
        .base_mip_level(0)
        .level_count(mip_levels)
        .base_array_layer(0)
        .layer_count(1);
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(translate::translate_image_view_type(info.ty))
        .format(translate::translate_format(info.format))
        .subresource_range(subresource_range);
    Ok(unsafe { shared.raw.create_image_view(&view_info, None)? })
}

impl Handle<Image> {
    pub fn info(&self) -> Option<&ImageInfo> {
        self.get().map(|image| &image.info)
    }

    pub fn is_swapchain_image(&self) -> bool {
        self.get().map_or(false, |image| image.swapchain_owned)
    }

    /// Writes the image into the bindless descriptor set. Sampled usage lands
    /// in the sampled-image binding, or the combined binding when a sampler
    /// is supplied; storage usage lands in the storage-image binding.
    /// Rebinding the same info is idempotent.
    pub fn bind(&self, info: ImageBindInfo) -> ImageBindInfo {
        let Some(image) = self.get() else {
            return info;
        };
        let Some(device) = image.device.upgrade() else {
            return info;
        };

        let index = info.index % device.config().max_images;

        let mut sampled_info = vk::DescriptorImageInfo::default()
            .image_view(image.view)
            .image_layout(vk::ImageLayout::READ_ONLY_OPTIMAL);
        let sampler_raw = info
            .sampler
            .as_ref()
            .and_then(|sampler| sampler.get())
            .map(|sampler| sampler.raw);
        if let Some(sampler_raw) = sampler_raw {
            sampled_info = sampled_info.sampler(sampler_raw);
        }
        let sampled_infos = [sampled_info];

        let storage_infos = [vk::DescriptorImageInfo::default()
            .image_view(image.view)
            .image_layout(vk::ImageLayout::GENERAL)];

        let mut writes = Vec::with_capacity(2);
        if image.info.image_usage.contains(ImageUsage::SAMPLED) {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(device.descriptor_cache.descriptor_set)
                    .dst_binding(if sampler_raw.is_some() {
                        COMBINED_IMAGE_SAMPLER_BINDING
                    } else {
                        SAMPLED_IMAGE_BINDING
                    })
                    .dst_array_element(index)
                    .descriptor_type(if sampler_raw.is_some() {
                        vk::DescriptorType::COMBINED_IMAGE_SAMPLER
                    } else {
                        vk::DescriptorType::SAMPLED_IMAGE
                    })
                    .image_info(&sampled_infos),
            );
        }
        if image.info.image_usage.contains(ImageUsage::STORAGE) {
            writes.push(
                vk::WriteDescriptorSet::default()
                    .dst_set(device.descriptor_cache.descriptor_set)
                    .dst_binding(STORAGE_IMAGE_BINDING)
                    .dst_array_element(index)
                    .descriptor_type(vk::DescriptorType::STORAGE_IMAGE)
                    .image_info(&storage_infos),
            );
        }

        if !writes.is_empty() {
            unsafe {
                device.raw.update_descriptor_sets(&writes, &[]);
            }
        }

        ImageBindInfo {
            sampler: info.sampler,
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_derivation() {
        assert_eq!(aspect_for_format(Format::R8G8B8A8Srgb), ImageAspect::COLOR);
        assert_eq!(aspect_for_format(Format::D32Float), ImageAspect::DEPTH);
        assert_eq!(aspect_for_format(Format::S8Uint), ImageAspect::STENCIL);
        assert_eq!(
            aspect_for_format(Format::D24UnormS8Uint),
            ImageAspect::DEPTH | ImageAspect::STENCIL
        );
    }
}
