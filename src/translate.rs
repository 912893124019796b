/*! Translation of the crate's closed enum surface to and from Vulkan.
 */

use ash::vk;
use gpu_allocator::MemoryLocation;

use crate::types::*;

pub fn translate_format(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,
        Format::R4G4UnormPack8 => vk::Format::R4G4_UNORM_PACK8,
        Format::R4G4B4A4UnormPack16 => vk::Format::R4G4B4A4_UNORM_PACK16,
        Format::B4G4R4A4UnormPack16 => vk::Format::B4G4R4A4_UNORM_PACK16,
        Format::R5G6B5UnormPack16 => vk::Format::R5G6B5_UNORM_PACK16,
        Format::B5G6R5UnormPack16 => vk::Format::B5G6R5_UNORM_PACK16,
        Format::R5G5B5A1UnormPack16 => vk::Format::R5G5B5A1_UNORM_PACK16,
        Format::B5G5R5A1UnormPack16 => vk::Format::B5G5R5A1_UNORM_PACK16,
        Format::A1R5G5B5UnormPack16 => vk::Format::A1R5G5B5_UNORM_PACK16,
        Format::R8Unorm => vk::Format::R8_UNORM,
        Format::R8Snorm => vk::Format::R8_SNORM,
        Format::R8Uscaled => vk::Format::R8_USCALED,
        Format::R8Sscaled => vk::Format::R8_SSCALED,
        Format::R8Uint => vk::Format::R8_UINT,
        Format::R8Sint => vk::Format::R8_SINT,
        Format::R8Srgb => vk::Format::R8_SRGB,
        Format::R8G8Unorm => vk::Format::R8G8_UNORM,
        Format::R8G8Snorm => vk::Format::R8G8_SNORM,
        Format::R8G8Uscaled => vk::Format::R8G8_USCALED,
        Format::R8G8Sscaled => vk::Format::R8G8_SSCALED,
        Format::R8G8Uint => vk::Format::R8G8_UINT,
        Format::R8G8Sint => vk::Format::R8G8_SINT,
        Format::R8G8Srgb => vk::Format::R8G8_SRGB,
        Format::R8G8B8Unorm => vk::Format::R8G8B8_UNORM,
        Format::R8G8B8Snorm => vk::Format::R8G8B8_SNORM,
        Format::R8G8B8Uscaled => vk::Format::R8G8B8_USCALED,
        Format::R8G8B8Sscaled => vk::Format::R8G8B8_SSCALED,
        Format::R8G8B8Uint => vk::Format::R8G8B8_UINT,
        Format::R8G8B8Sint => vk::Format::R8G8B8_SINT,
        Format::R8G8B8Srgb => vk::Format::R8G8B8_SRGB,
        Format::B8G8R8Unorm => vk::Format::B8G8R8_UNORM,
        Format::B8G8R8Snorm => vk::Format::B8G8R8_SNORM,
        Format::B8G8R8Uscaled => vk::Format::B8G8R8_USCALED,
        Format::B8G8R8Sscaled => vk::Format::B8G8R8_SSCALED,
        Format::B8G8R8Uint => vk::Format::B8G8R8_UINT,
        Format::B8G8R8Sint => vk::Format::B8G8R8_SINT,
        Format::B8G8R8Srgb => vk::Format::B8G8R8_SRGB,
        Format::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8Snorm => vk::Format::R8G8B8A8_SNORM,
        Format::R8G8B8A8Uscaled => vk::Format::R8G8B8A8_USCALED,
        Format::R8G8B8A8Sscaled => vk::Format::R8G8B8A8_SSCALED,
        Format::R8G8B8A8Uint => vk::Format::R8G8B8A8_UINT,
        Format::R8G8B8A8Sint => vk::Format::R8G8B8A8_SINT,
        Format::R8G8B8A8Srgb => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        Format::B8G8R8A8Snorm => vk::Format::B8G8R8A8_SNORM,
        Format::B8G8R8A8Uscaled => vk::Format::B8G8R8A8_USCALED,
        Format::B8G8R8A8Sscaled => vk::Format::B8G8R8A8_SSCALED,
        Format::B8G8R8A8Uint => vk::Format::B8G8R8A8_UINT,
        Format::B8G8R8A8Sint => vk::Format::B8G8R8A8_SINT,
        Format::B8G8R8A8Srgb => vk::Format::B8G8R8A8_SRGB,
        Format::A8B8G8R8UnormPack32 => vk::Format::A8B8G8R8_UNORM_PACK32,
        Format::A8B8G8R8SnormPack32 => vk::Format::A8B8G8R8_SNORM_PACK32,
        Format::A8B8G8R8UscaledPack32 => vk::Format::A8B8G8R8_USCALED_PACK32,
        Format::A8B8G8R8SscaledPack32 => vk::Format::A8B8G8R8_SSCALED_PACK32,
        Format::A8B8G8R8UintPack32 => vk::Format::A8B8G8R8_UINT_PACK32,
        Format::A8B8G8R8SintPack32 => vk::Format::A8B8G8R8_SINT_PACK32,
        Format::A8B8G8R8SrgbPack32 => vk::Format::A8B8G8R8_SRGB_PACK32,
        Format::A2R10G10B10UnormPack32 => vk::Format::A2R10G10B10_UNORM_PACK32,
        Format::A2R10G10B10SnormPack32 => vk::Format::A2R10G10B10_SNORM_PACK32,
        Format::A2R10G10B10UscaledPack32 => vk::Format::A2R10G10B10_USCALED_PACK32,
        Format::A2R10G10B10SscaledPack32 => vk::Format::A2R10G10B10_SSCALED_PACK32,
        Format::A2R10G10B10UintPack32 => vk::Format::A2R10G10B10_UINT_PACK32,
        Format::A2R10G10B10SintPack32 => vk::Format::A2R10G10B10_SINT_PACK32,
        Format::A2B10G10R10UnormPack32 => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::A2B10G10R10SnormPack32 => vk::Format::A2B10G10R10_SNORM_PACK32,
        Format::A2B10G10R10UscaledPack32 => vk::Format::A2B10G10R10_USCALED_PACK32,
        Format::A2B10G10R10SscaledPack32 => vk::Format::A2B10G10R10_SSCALED_PACK32,
        Format::A2B10G10R10UintPack32 => vk::Format::A2B10G10R10_UINT_PACK32,
        Format::A2B10G10R10SintPack32 => vk::Format::A2B10G10R10_SINT_PACK32,
        Format::R16Unorm => vk::Format::R16_UNORM,
        Format::R16Snorm => vk::Format::R16_SNORM,
        Format::R16Uscaled => vk::Format::R16_USCALED,
        Format::R16Sscaled => vk::Format::R16_SSCALED,
        Format::R16Uint => vk::Format::R16_UINT,
        Format::R16Sint => vk::Format::R16_SINT,
        Format::R16Float => vk::Format::R16_SFLOAT,
        Format::R16G16Unorm => vk::Format::R16G16_UNORM,
        Format::R16G16Snorm => vk::Format::R16G16_SNORM,
        Format::R16G16Uscaled => vk::Format::R16G16_USCALED,
        Format::R16G16Sscaled => vk::Format::R16G16_SSCALED,
        Format::R16G16Uint => vk::Format::R16G16_UINT,
        Format::R16G16Sint => vk::Format::R16G16_SINT,
        Format::R16G16Float => vk::Format::R16G16_SFLOAT,
        Format::R16G16B16Unorm => vk::Format::R16G16B16_UNORM,
        Format::R16G16B16Snorm => vk::Format::R16G16B16_SNORM,
        Format::R16G16B16Uscaled => vk::Format::R16G16B16_USCALED,
        Format::R16G16B16Sscaled => vk::Format::R16G16B16_SSCALED,
        Format::R16G16B16Uint => vk::Format::R16G16B16_UINT,
        Format::R16G16B16Sint => vk::Format::R16G16B16_SINT,
        Format::R16G16B16Float => vk::Format::R16G16B16_SFLOAT,
        Format::R16G16B16A16Unorm => vk::Format::R16G16B16A16_UNORM,
        Format::R16G16B16A16Snorm => vk::Format::R16G16B16A16_SNORM,
        Format::R16G16B16A16Uscaled => vk::Format::R16G16B16A16_USCALED,
        Format::R16G16B16A16Sscaled => vk::Format::R16G16B16A16_SSCALED,
        Format::R16G16B16A16Uint => vk::Format::R16G16B16A16_UINT,
        Format::R16G16B16A16Sint => vk::Format::R16G16B16A16_SINT,
        Format::R16G16B16A16Float => vk::Format::R16G16B16A16_SFLOAT,
        Format::R32Uint => vk::Format::R32_UINT,
        Format::R32Sint => vk::Format::R32_SINT,
        Format::R32Float => vk::Format::R32_SFLOAT,
        Format::R32G32Uint => vk::Format::R32G32_UINT,
        Format::R32G32Sint => vk::Format::R32G32_SINT,
        Format::R32G32Float => vk::Format::R32G32_SFLOAT,
        Format::R32G32B32Uint => vk::Format::R32G32B32_UINT,
        Format::R32G32B32Sint => vk::Format::R32G32B32_SINT,
        Format::R32G32B32Float => vk::Format::R32G32B32_SFLOAT,
        Format::R32G32B32A32Uint => vk::Format::R32G32B32A32_UINT,
        Format::R32G32B32A32Sint => vk::Format::R32G32B32A32_SINT,
        Format::R32G32B32A32Float => vk::Format::R32G32B32A32_SFLOAT,
        Format::R64Uint => vk::Format::R64_UINT,
        Format::R64Sint => vk::Format::R64_SINT,
        Format::R64Float => vk::Format::R64_SFLOAT,
        Format::R64G64Uint => vk::Format::R64G64_UINT,
        Format::R64G64Sint => vk::Format::R64G64_SINT,
        Format::R64G64Float => vk::Format::R64G64_SFLOAT,
        Format::R64G64B64Uint => vk::Format::R64G64B64_UINT,
        Format::R64G64B64Sint => vk::Format::R64G64B64_SINT,
        Format::R64G64B64Float => vk::Format::R64G64B64_SFLOAT,
        Format::R64G64B64A64Uint => vk::Format::R64G64B64A64_UINT,
        Format::R64G64B64A64Sint => vk::Format::R64G64B64A64_SINT,
        Format::R64G64B64A64Float => vk::Format::R64G64B64A64_SFLOAT,
        Format::B10G11R11UfloatPack32 => vk::Format::B10G11R11_UFLOAT_PACK32,
        Format::E5B9G9R9UfloatPack32 => vk::Format::E5B9G9R9_UFLOAT_PACK32,
        Format::D16Unorm => vk::Format::D16_UNORM,
        Format::X8D24UnormPack32 => vk::Format::X8_D24_UNORM_PACK32,
        Format::D32Float => vk::Format::D32_SFLOAT,
        Format::S8Uint => vk::Format::S8_UINT,
        Format::D16UnormS8Uint => vk::Format::D16_UNORM_S8_UINT,
        Format::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        Format::D32FloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Inverse of [`translate_format`] for the formats the surface negotiation
/// cares about. Anything unrecognized maps back to `Undefined`.
pub fn format_from_vk(format: vk::Format) -> Format {
    match format {
        vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8Unorm,
        vk::Format::R8G8B8A8_SRGB => Format::R8G8B8A8Srgb,
        vk::Format::B8G8R8A8_UNORM => Format::B8G8R8A8Unorm,
        vk::Format::B8G8R8A8_SRGB => Format::B8G8R8A8Srgb,
        vk::Format::A8B8G8R8_UNORM_PACK32 => Format::A8B8G8R8UnormPack32,
        vk::Format::A8B8G8R8_SRGB_PACK32 => Format::A8B8G8R8SrgbPack32,
        vk::Format::A2R10G10B10_UNORM_PACK32 => Format::A2R10G10B10UnormPack32,
        vk::Format::A2B10G10R10_UNORM_PACK32 => Format::A2B10G10R10UnormPack32,
        vk::Format::R16G16B16A16_SFLOAT => Format::R16G16B16A16Float,
        vk::Format::R5G6B5_UNORM_PACK16 => Format::R5G6B5UnormPack16,
        vk::Format::B5G6R5_UNORM_PACK16 => Format::B5G6R5UnormPack16,
        _ => Format::Undefined,
    }
}

pub fn translate_color_space(color_space: ColorSpace) -> vk::ColorSpaceKHR {
    match color_space {
        ColorSpace::SrgbNonLinear => vk::ColorSpaceKHR::SRGB_NONLINEAR,
        ColorSpace::DisplayP3NonLinear => vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT,
        ColorSpace::ExtendedSrgbLinear => vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        ColorSpace::DisplayP3Linear => vk::ColorSpaceKHR::DISPLAY_P3_LINEAR_EXT,
        ColorSpace::DciP3NonLinear => vk::ColorSpaceKHR::DCI_P3_NONLINEAR_EXT,
        ColorSpace::Bt709Linear => vk::ColorSpaceKHR::BT709_LINEAR_EXT,
        ColorSpace::Bt709NonLinear => vk::ColorSpaceKHR::BT709_NONLINEAR_EXT,
        ColorSpace::Bt2020Linear => vk::ColorSpaceKHR::BT2020_LINEAR_EXT,
        ColorSpace::Hdr10St2084 => vk::ColorSpaceKHR::HDR10_ST2084_EXT,
        ColorSpace::DolbyVision => vk::ColorSpaceKHR::DOLBYVISION_EXT,
        ColorSpace::Hdr10Hlg => vk::ColorSpaceKHR::HDR10_HLG_EXT,
        ColorSpace::AdobeRgbLinear => vk::ColorSpaceKHR::ADOBERGB_LINEAR_EXT,
        ColorSpace::AdobeRgbNonLinear => vk::ColorSpaceKHR::ADOBERGB_NONLINEAR_EXT,
        ColorSpace::PassThrough => vk::ColorSpaceKHR::PASS_THROUGH_EXT,
        ColorSpace::ExtendedSrgbNonLinear => vk::ColorSpaceKHR::EXTENDED_SRGB_NONLINEAR_EXT,
    }
}

pub fn color_space_from_vk(color_space: vk::ColorSpaceKHR) -> ColorSpace {
    match color_space {
        vk::ColorSpaceKHR::DISPLAY_P3_NONLINEAR_EXT => ColorSpace::DisplayP3NonLinear,
        vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT => ColorSpace::ExtendedSrgbLinear,
        vk::ColorSpaceKHR::DISPLAY_P3_LINEAR_EXT => ColorSpace::DisplayP3Linear,
        vk::ColorSpaceKHR::DCI_P3_NONLINEAR_EXT => ColorSpace::DciP3NonLinear,
        vk::ColorSpaceKHR::BT709_LINEAR_EXT => ColorSpace::Bt709Linear,
        vk::ColorSpaceKHR::BT709_NONLINEAR_EXT => ColorSpace::Bt709NonLinear,
        vk::ColorSpaceKHR::BT2020_LINEAR_EXT => ColorSpace::Bt2020Linear,
        vk::ColorSpaceKHR::HDR10_ST2084_EXT => ColorSpace::Hdr10St2084,
        vk::ColorSpaceKHR::DOLBYVISION_EXT => ColorSpace::DolbyVision,
        vk::ColorSpaceKHR::HDR10_HLG_EXT => ColorSpace::Hdr10Hlg,
        vk::ColorSpaceKHR::ADOBERGB_LINEAR_EXT => ColorSpace::AdobeRgbLinear,
        vk::ColorSpaceKHR::ADOBERGB_NONLINEAR_EXT => ColorSpace::AdobeRgbNonLinear,
        vk::ColorSpaceKHR::PASS_THROUGH_EXT => ColorSpace::PassThrough,
        vk::ColorSpaceKHR::EXTENDED_SRGB_NONLINEAR_EXT => ColorSpace::ExtendedSrgbNonLinear,
        _ => ColorSpace::SrgbNonLinear,
    }
}

pub fn translate_image_layout(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::Preinitialized => vk::ImageLayout::PREINITIALIZED,
        ImageLayout::DepthReadOnlyStencilAttachment => {
            vk::ImageLayout::DEPTH_READ_ONLY_STENCIL_ATTACHMENT_OPTIMAL
        }
        ImageLayout::DepthAttachmentStencilReadOnly => {
            vk::ImageLayout::DEPTH_ATTACHMENT_STENCIL_READ_ONLY_OPTIMAL
        }
        ImageLayout::DepthAttachment => vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthReadOnly => vk::ImageLayout::DEPTH_READ_ONLY_OPTIMAL,
        ImageLayout::StencilAttachment => vk::ImageLayout::STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::StencilReadOnly => vk::ImageLayout::STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::ReadOnly => vk::ImageLayout::READ_ONLY_OPTIMAL,
        ImageLayout::Attachment => vk::ImageLayout::ATTACHMENT_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
        ImageLayout::SharedPresent => vk::ImageLayout::SHARED_PRESENT_KHR,
        ImageLayout::FragmentDensityMap => vk::ImageLayout::FRAGMENT_DENSITY_MAP_OPTIMAL_EXT,
        ImageLayout::FragmentShadingRateAttachment => {
            vk::ImageLayout::FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR
        }
    }
}

pub fn translate_image_aspect_flags(aspect: ImageAspect) -> vk::ImageAspectFlags {
    let mut flags = vk::ImageAspectFlags::empty();
    if aspect.contains(ImageAspect::COLOR) {
        flags |= vk::ImageAspectFlags::COLOR;
    }
    if aspect.contains(ImageAspect::DEPTH) {
        flags |= vk::ImageAspectFlags::DEPTH;
    }
    if aspect.contains(ImageAspect::STENCIL) {
        flags |= vk::ImageAspectFlags::STENCIL;
    }
    if aspect.contains(ImageAspect::METADATA) {
        flags |= vk::ImageAspectFlags::METADATA;
    }
    if aspect.contains(ImageAspect::PLANE_0) {
        flags |= vk::ImageAspectFlags::PLANE_0;
    }
    if aspect.contains(ImageAspect::PLANE_1) {
        flags |= vk::ImageAspectFlags::PLANE_1;
    }
    if aspect.contains(ImageAspect::PLANE_2) {
        flags |= vk::ImageAspectFlags::PLANE_2;
    }
    flags
}

pub fn translate_image_usage_flags(usage: ImageUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(ImageUsage::TRANSFER_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(ImageUsage::TRANSFER_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(ImageUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(ImageUsage::STORAGE) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(ImageUsage::TRANSIENT_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::TRANSIENT_ATTACHMENT;
    }
    if usage.contains(ImageUsage::INPUT_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::INPUT_ATTACHMENT;
    }
    if usage.contains(ImageUsage::FRAGMENT_DENSITY_MAP) {
        flags |= vk::ImageUsageFlags::FRAGMENT_DENSITY_MAP_EXT;
    }
    if usage.contains(ImageUsage::FRAGMENT_SHADING_RATE_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR;
    }
    flags
}

pub fn translate_buffer_usage_flags(usage: BufferUsage) -> vk::BufferUsageFlags {
    let mut flags = vk::BufferUsageFlags::empty();
    if usage.contains(BufferUsage::VERTEX) {
        flags |= vk::BufferUsageFlags::VERTEX_BUFFER;
    }
    if usage.contains(BufferUsage::INDEX) {
        flags |= vk::BufferUsageFlags::INDEX_BUFFER;
    }
    if usage.contains(BufferUsage::UNIFORM) {
        flags |= vk::BufferUsageFlags::UNIFORM_BUFFER;
    }
    if usage.contains(BufferUsage::STORAGE) {
        flags |= vk::BufferUsageFlags::STORAGE_BUFFER;
    }
    if usage.contains(BufferUsage::TRANSFER_SRC) {
        flags |= vk::BufferUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(BufferUsage::TRANSFER_DST) {
        flags |= vk::BufferUsageFlags::TRANSFER_DST;
    }
    if usage.contains(BufferUsage::INDIRECT) {
        flags |= vk::BufferUsageFlags::INDIRECT_BUFFER;
    }
    flags
}

/// The allocator location a `MemoryUsage` maps to. Host flags win over the
/// placement hints; everything else lands in device-local memory.
pub fn memory_location(usage: MemoryUsage) -> MemoryLocation {
    if usage.contains(MemoryUsage::HOST_ACCESSIBLE) {
        MemoryLocation::GpuToCpu
    } else if usage.contains(MemoryUsage::HOST_WRITABLE) {
        MemoryLocation::CpuToGpu
    } else {
        MemoryLocation::GpuOnly
    }
}

pub fn is_host_visible_usage(usage: MemoryUsage) -> bool {
    usage.intersects(MemoryUsage::HOST_WRITABLE | MemoryUsage::HOST_ACCESSIBLE)
}

pub fn translate_image_type(ty: ImageType) -> vk::ImageType {
    match ty {
        ImageType::Image1D => vk::ImageType::TYPE_1D,
        ImageType::Image2D => vk::ImageType::TYPE_2D,
        ImageType::Image3D => vk::ImageType::TYPE_3D,
    }
}

pub fn translate_image_view_type(ty: ImageType) -> vk::ImageViewType {
    match ty {
        ImageType::Image1D => vk::ImageViewType::TYPE_1D,
        ImageType::Image2D => vk::ImageViewType::TYPE_2D,
        ImageType::Image3D => vk::ImageViewType::TYPE_3D,
    }
}

pub fn translate_sample_count(samples: SampleCount) -> vk::SampleCountFlags {
    match samples {
        SampleCount::Count1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::Count2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::Count4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::Count8 => vk::SampleCountFlags::TYPE_8,
        SampleCount::Count16 => vk::SampleCountFlags::TYPE_16,
        SampleCount::Count32 => vk::SampleCountFlags::TYPE_32,
        SampleCount::Count64 => vk::SampleCountFlags::TYPE_64,
    }
}

pub fn translate_image_tiling(tiling: ImageTiling) -> vk::ImageTiling {
    match tiling {
        ImageTiling::Optimal => vk::ImageTiling::OPTIMAL,
        ImageTiling::Linear => vk::ImageTiling::LINEAR,
    }
}

pub fn translate_swapchain_presentation_mode(mode: SwapchainPresentMode) -> vk::PresentModeKHR {
    match mode {
        SwapchainPresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
        SwapchainPresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
        SwapchainPresentMode::Fifo => vk::PresentModeKHR::FIFO,
        SwapchainPresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        SwapchainPresentMode::SharedDemandRefresh => vk::PresentModeKHR::SHARED_DEMAND_REFRESH,
        SwapchainPresentMode::SharedContinuousRefresh => {
            vk::PresentModeKHR::SHARED_CONTINUOUS_REFRESH
        }
    }
}

pub fn translate_shader_stage(ty: ShaderType) -> vk::ShaderStageFlags {
    match ty {
        ShaderType::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderType::Pixel => vk::ShaderStageFlags::FRAGMENT,
        ShaderType::Geometry => vk::ShaderStageFlags::GEOMETRY,
        ShaderType::TesselationControl => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        ShaderType::TesselationEvaluation => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        ShaderType::Compute => vk::ShaderStageFlags::COMPUTE,
        ShaderType::None => vk::ShaderStageFlags::empty(),
    }
}

pub fn translate_shader_stage_flags(stage: ShaderStage) -> vk::ShaderStageFlags {
    if stage.contains(ShaderStage::ALL) {
        return vk::ShaderStageFlags::ALL;
    }
    let mut flags = vk::ShaderStageFlags::empty();
    if stage.contains(ShaderStage::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stage.contains(ShaderStage::TESSELATION_CONTROL) {
        flags |= vk::ShaderStageFlags::TESSELLATION_CONTROL;
    }
    if stage.contains(ShaderStage::TESSELATION_EVALUATION) {
        flags |= vk::ShaderStageFlags::TESSELLATION_EVALUATION;
    }
    if stage.contains(ShaderStage::GEOMETRY) {
        flags |= vk::ShaderStageFlags::GEOMETRY;
    }
    if stage.contains(ShaderStage::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    if stage.contains(ShaderStage::COMPUTE) {
        flags |= vk::ShaderStageFlags::COMPUTE;
    }
    flags
}

pub fn translate_texel_filter(filter: TexelFilter) -> vk::Filter {
    match filter {
        TexelFilter::Nearest => vk::Filter::NEAREST,
        TexelFilter::Linear => vk::Filter::LINEAR,
        TexelFilter::CubicImage => vk::Filter::CUBIC_EXT,
    }
}

pub fn translate_mipmap_mode(mode: MipmapMode) -> vk::SamplerMipmapMode {
    match mode {
        MipmapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipmapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn translate_sampler_address_mode(address: SamplerAddress) -> vk::SamplerAddressMode {
    match address {
        SamplerAddress::Repeat => vk::SamplerAddressMode::REPEAT,
        SamplerAddress::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        SamplerAddress::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        SamplerAddress::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        SamplerAddress::MirrorClampToEdge => vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE,
    }
}

pub fn translate_compare_op(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn translate_border_color(color: BorderColor) -> vk::BorderColor {
    match color {
        BorderColor::FloatTransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
        BorderColor::IntTransparentBlack => vk::BorderColor::INT_TRANSPARENT_BLACK,
        BorderColor::FloatOpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColor::IntOpaqueBlack => vk::BorderColor::INT_OPAQUE_BLACK,
        BorderColor::FloatOpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
        BorderColor::IntOpaqueWhite => vk::BorderColor::INT_OPAQUE_WHITE,
    }
}

pub fn translate_attachment_load_op(load_op: AttachmentLoadOp) -> vk::AttachmentLoadOp {
    match load_op {
        AttachmentLoadOp::Load => vk::AttachmentLoadOp::LOAD,
        AttachmentLoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        AttachmentLoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
        AttachmentLoadOp::None => vk::AttachmentLoadOp::NONE_EXT,
    }
}

pub fn translate_attachment_store_op(store_op: AttachmentStoreOp) -> vk::AttachmentStoreOp {
    match store_op {
        AttachmentStoreOp::Store => vk::AttachmentStoreOp::STORE,
        AttachmentStoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
        AttachmentStoreOp::None => vk::AttachmentStoreOp::NONE,
    }
}

pub fn translate_topology(topology: TopologyType) -> vk::PrimitiveTopology {
    match topology {
        TopologyType::Point => vk::PrimitiveTopology::POINT_LIST,
        TopologyType::Line => vk::PrimitiveTopology::LINE_LIST,
        TopologyType::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        TopologyType::Triangle => vk::PrimitiveTopology::TRIANGLE_LIST,
        TopologyType::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        TopologyType::TriangleFan => vk::PrimitiveTopology::TRIANGLE_FAN,
    }
}

pub fn translate_polygon_mode(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub fn translate_cull_mode(mode: CullingMode) -> vk::CullModeFlags {
    match mode {
        CullingMode::None => vk::CullModeFlags::NONE,
        CullingMode::Back => vk::CullModeFlags::BACK,
        CullingMode::Front => vk::CullModeFlags::FRONT,
        CullingMode::FrontAndBack => vk::CullModeFlags::FRONT_AND_BACK,
    }
}

pub fn translate_front_face_dir(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
    }
}

pub fn translate_blend_factor(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcColor => vk::BlendFactor::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => vk::BlendFactor::DST_COLOR,
        BlendFactor::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColor => vk::BlendFactor::CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColor => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::ConstantAlpha => vk::BlendFactor::CONSTANT_ALPHA,
        BlendFactor::OneMinusConstantAlpha => vk::BlendFactor::ONE_MINUS_CONSTANT_ALPHA,
        BlendFactor::SrcAlphaSaturate => vk::BlendFactor::SRC_ALPHA_SATURATE,
        BlendFactor::Src1Color => vk::BlendFactor::SRC1_COLOR,
        BlendFactor::OneMinusSrc1Color => vk::BlendFactor::ONE_MINUS_SRC1_COLOR,
        BlendFactor::Src1Alpha => vk::BlendFactor::SRC1_ALPHA,
        BlendFactor::OneMinusSrc1Alpha => vk::BlendFactor::ONE_MINUS_SRC1_ALPHA,
    }
}

pub fn translate_blend_op(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
    }
}

pub fn translate_sharing_mode(mode: SharingMode) -> vk::SharingMode {
    match mode {
        SharingMode::Exclusive => vk::SharingMode::EXCLUSIVE,
        SharingMode::Concurrent => vk::SharingMode::CONCURRENT,
    }
}

pub fn translate_index_type(ty: IndexType) -> vk::IndexType {
    match ty {
        IndexType::Uint8 => vk::IndexType::UINT8_EXT,
        IndexType::Uint16 => vk::IndexType::UINT16,
        IndexType::Uint32 => vk::IndexType::UINT32,
    }
}

pub fn translate_pipeline_stage_flags(stages: PipelineStage) -> vk::PipelineStageFlags2 {
    const TABLE: &[(PipelineStage, vk::PipelineStageFlags2)] = &[
        (PipelineStage::TOP_OF_PIPE, vk::PipelineStageFlags2::TOP_OF_PIPE),
        (PipelineStage::DRAW_INDIRECT, vk::PipelineStageFlags2::DRAW_INDIRECT),
        (PipelineStage::VERTEX_INPUT, vk::PipelineStageFlags2::VERTEX_INPUT),
        (PipelineStage::VERTEX_SHADER, vk::PipelineStageFlags2::VERTEX_SHADER),
        (
            PipelineStage::TESSELATION_CONTROL,
            vk::PipelineStageFlags2::TESSELLATION_CONTROL_SHADER,
        ),
        (
            PipelineStage::TESSELATION_EVALUATION,
            vk::PipelineStageFlags2::TESSELLATION_EVALUATION_SHADER,
        ),
        (PipelineStage::GEOMETRY_SHADER, vk::PipelineStageFlags2::GEOMETRY_SHADER),
        (PipelineStage::FRAGMENT_SHADER, vk::PipelineStageFlags2::FRAGMENT_SHADER),
        (
            PipelineStage::EARLY_FRAGMENT_TEST,
            vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS,
        ),
        (
            PipelineStage::LATE_FRAGMENT_TEST,
            vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
        ),
        (
            PipelineStage::COLOR_ATTACHMENT_OUTPUT,
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        ),
        (PipelineStage::COMPUTE_SHADER, vk::PipelineStageFlags2::COMPUTE_SHADER),
        (PipelineStage::TRANSFER, vk::PipelineStageFlags2::ALL_TRANSFER),
        (PipelineStage::BOTTOM_OF_PIPE, vk::PipelineStageFlags2::BOTTOM_OF_PIPE),
        (PipelineStage::HOST, vk::PipelineStageFlags2::HOST),
        (PipelineStage::ALL_GRAPHICS, vk::PipelineStageFlags2::ALL_GRAPHICS),
        (PipelineStage::ALL_COMMANDS, vk::PipelineStageFlags2::ALL_COMMANDS),
        (PipelineStage::COPY, vk::PipelineStageFlags2::COPY),
        (PipelineStage::RESOLVE, vk::PipelineStageFlags2::RESOLVE),
        (PipelineStage::BLIT, vk::PipelineStageFlags2::BLIT),
        (PipelineStage::CLEAR, vk::PipelineStageFlags2::CLEAR),
        (PipelineStage::INDEX_INPUT, vk::PipelineStageFlags2::INDEX_INPUT),
        (
            PipelineStage::VERTEX_ATTRIBUTE_INPUT,
            vk::PipelineStageFlags2::VERTEX_ATTRIBUTE_INPUT,
        ),
        (
            PipelineStage::PRE_RASTERIZATION_SHADERS,
            vk::PipelineStageFlags2::PRE_RASTERIZATION_SHADERS,
        ),
        (
            PipelineStage::ACCELERATION_STRUCTURE_BUILD,
            vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_BUILD_KHR,
        ),
        (
            PipelineStage::RAY_TRACING_SHADER,
            vk::PipelineStageFlags2::RAY_TRACING_SHADER_KHR,
        ),
        (PipelineStage::TASK_SHADER, vk::PipelineStageFlags2::TASK_SHADER_EXT),
        (PipelineStage::MESH_SHADER, vk::PipelineStageFlags2::MESH_SHADER_EXT),
        (
            PipelineStage::ACCELERATION_STRUCTURE_COPY,
            vk::PipelineStageFlags2::ACCELERATION_STRUCTURE_COPY_KHR,
        ),
    ];

    let mut flags = vk::PipelineStageFlags2::NONE;
    for (stage, vk_stage) in TABLE {
        if stages.contains(*stage) {
            flags |= *vk_stage;
        }
    }
    flags
}

pub fn translate_memory_access_flags(access: MemoryAccessType) -> vk::AccessFlags2 {
    let mut flags = vk::AccessFlags2::NONE;
    if access.contains(MemoryAccessType::HOST_READ) {
        flags |= vk::AccessFlags2::HOST_READ;
    }
    if access.contains(MemoryAccessType::HOST_WRITE) {
        flags |= vk::AccessFlags2::HOST_WRITE;
    }
    if access.contains(MemoryAccessType::MEMORY_READ) {
        flags |= vk::AccessFlags2::MEMORY_READ;
    }
    if access.contains(MemoryAccessType::MEMORY_WRITE) {
        flags |= vk::AccessFlags2::MEMORY_WRITE;
    }
    flags
}

/// Formats accepted as reflected vertex input attributes.
pub fn translate_shader_attrib_format(format: Format) -> vk::Format {
    translate_format(format)
}

/// Byte stride a reflected vertex attribute occupies in an interleaved
/// vertex buffer.
pub fn stride_for_shader_attrib_format(format: Format) -> u32 {
    match format {
        Format::R8Unorm | Format::R8Snorm | Format::R8Uint | Format::R8Sint => 1,
        Format::R8G8Unorm | Format::R8G8Snorm | Format::R8G8Uint | Format::R8G8Sint => 2,
        Format::R16Uint | Format::R16Sint | Format::R16Float => 2,
        Format::R8G8B8A8Unorm
        | Format::R8G8B8A8Snorm
        | Format::R8G8B8A8Uint
        | Format::R8G8B8A8Sint
        | Format::B8G8R8A8Unorm => 4,
        Format::R16G16Uint | Format::R16G16Sint | Format::R16G16Float => 4,
        Format::R32Uint | Format::R32Sint | Format::R32Float => 4,
        Format::R16G16B16A16Uint | Format::R16G16B16A16Sint | Format::R16G16B16A16Float => 8,
        Format::R32G32Uint | Format::R32G32Sint | Format::R32G32Float => 8,
        Format::R32G32B32Uint | Format::R32G32B32Sint | Format::R32G32B32Float => 12,
        Format::R32G32B32A32Uint | Format::R32G32B32A32Sint | Format::R32G32B32A32Float => 16,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_round_trip_for_surface_formats() {
        for format in [
            Format::B8G8R8A8Srgb,
            Format::B8G8R8A8Unorm,
            Format::R8G8B8A8Srgb,
            Format::A2B10G10R10UnormPack32,
            Format::R16G16B16A16Float,
        ] {
            assert_eq!(format_from_vk(translate_format(format)), format);
        }
    }

    #[test]
    fn depth_stencil_formats_translate() {
        assert_eq!(translate_format(Format::D32Float), vk::Format::D32_SFLOAT);
        assert_eq!(
            translate_format(Format::D24UnormS8Uint),
            vk::Format::D24_UNORM_S8_UINT
        );
        assert_eq!(translate_format(Format::S8Uint), vk::Format::S8_UINT);
    }

    #[test]
    fn pipeline_stage_bits_compose() {
        let flags = translate_pipeline_stage_flags(
            PipelineStage::TRANSFER | PipelineStage::FRAGMENT_SHADER,
        );
        assert!(flags.contains(vk::PipelineStageFlags2::ALL_TRANSFER));
        assert!(flags.contains(vk::PipelineStageFlags2::FRAGMENT_SHADER));
        assert!(!flags.contains(vk::PipelineStageFlags2::COMPUTE_SHADER));
    }

    #[test]
    fn memory_access_translates() {
        assert_eq!(
            translate_memory_access_flags(MemoryAccessType::MEMORY_READ_WRITE),
            vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE
        );
        assert_eq!(
            translate_memory_access_flags(MemoryAccessType::empty()),
            vk::AccessFlags2::NONE
        );
    }

    #[test]
    fn attrib_strides() {
        assert_eq!(stride_for_shader_attrib_format(Format::R32G32B32Float), 12);
        assert_eq!(stride_for_shader_attrib_format(Format::R32G32Float), 8);
        assert_eq!(stride_for_shader_attrib_format(Format::R8G8B8A8Unorm), 4);
    }

    #[test]
    fn host_visibility_from_memory_usage() {
        assert!(is_host_visible_usage(MemoryUsage::HOST_WRITABLE));
        assert!(is_host_visible_usage(
            MemoryUsage::HOST_ACCESSIBLE | MemoryUsage::BEST_FIT
        ));
        assert!(!is_host_visible_usage(
            MemoryUsage::DEDICATED | MemoryUsage::CAN_ALIAS
        ));
        assert_eq!(
            memory_location(MemoryUsage::CAN_ALIAS | MemoryUsage::BEST_FIT),
            MemoryLocation::GpuOnly
        );
        assert_eq!(
            memory_location(MemoryUsage::HOST_WRITABLE | MemoryUsage::CAN_ALIAS),
            MemoryLocation::CpuToGpu
        );
    }
}
