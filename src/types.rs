/*! Shared scalar types, enums and flag sets of the public API surface.
 *
 * Everything here translates 1:1 to a Vulkan counterpart through
 * [`crate::translate`]; the crate never leaks raw `vk` types through the
 * recording or resource interfaces.
 */

use bitflags::bitflags;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn full(extent: Extent2D) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Offset2D {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Offset3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect2D {
    pub offset: Offset2D,
    pub extent: Extent2D,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorValue {
    Float32([f32; 4]),
    Int32([i32; 4]),
    Uint32([u32; 4]),
}

impl Default for ColorValue {
    fn default() -> Self {
        Self::Float32([0.0, 0.0, 0.0, 1.0])
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepthStencilValue {
    pub depth: f32,
    pub stencil: u32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    Color(ColorValue),
    DepthStencil(DepthStencilValue),
}

impl Default for ClearValue {
    fn default() -> Self {
        Self::Color(ColorValue::default())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceType {
    #[default]
    Other,
    IntegratedGpu,
    DiscreteGpu,
    VirtualGpu,
    Cpu,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorSeverity {
    Verbose,
    Info,
    Warning,
    Error,
}

/// Logical queues exposed by the device. `Main` is the graphics + present
/// queue; `None` stands for "no queue" in ownership transfers and maps to
/// `VK_QUEUE_FAMILY_IGNORED`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceQueue {
    None,
    #[default]
    Main,
    Transfer,
    Compute,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageType {
    Image1D,
    #[default]
    Image2D,
    Image3D,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    #[default]
    Undefined,
    R4G4UnormPack8,
    R4G4B4A4UnormPack16,
    B4G4R4A4UnormPack16,
    R5G6B5UnormPack16,
    B5G6R5UnormPack16,
    R5G5B5A1UnormPack16,
    B5G5R5A1UnormPack16,
    A1R5G5B5UnormPack16,
    R8Unorm,
    R8Snorm,
    R8Uscaled,
    R8Sscaled,
    R8Uint,
    R8Sint,
    R8Srgb,
    R8G8Unorm,
    R8G8Snorm,
    R8G8Uscaled,
    R8G8Sscaled,
    R8G8Uint,
    R8G8Sint,
    R8G8Srgb,
    R8G8B8Unorm,
    R8G8B8Snorm,
    R8G8B8Uscaled,
    R8G8B8Sscaled,
    R8G8B8Uint,
    R8G8B8Sint,
    R8G8B8Srgb,
    B8G8R8Unorm,
    B8G8R8Snorm,
    B8G8R8Uscaled,
    B8G8R8Sscaled,
    B8G8R8Uint,
    B8G8R8Sint,
    B8G8R8Srgb,
    R8G8B8A8Unorm,
    R8G8B8A8Snorm,
    R8G8B8A8Uscaled,
    R8G8B8A8Sscaled,
    R8G8B8A8Uint,
    R8G8B8A8Sint,
    R8G8B8A8Srgb,
    B8G8R8A8Unorm,
    B8G8R8A8Snorm,
    B8G8R8A8Uscaled,
    B8G8R8A8Sscaled,
    B8G8R8A8Uint,
    B8G8R8A8Sint,
    B8G8R8A8Srgb,
    A8B8G8R8UnormPack32,
    A8B8G8R8SnormPack32,
    A8B8G8R8UscaledPack32,
    A8B8G8R8SscaledPack32,
    A8B8G8R8UintPack32,
    A8B8G8R8SintPack32,
    A8B8G8R8SrgbPack32,
    A2R10G10B10UnormPack32,
    A2R10G10B10SnormPack32,
    A2R10G10B10UscaledPack32,
    A2R10G10B10SscaledPack32,
    A2R10G10B10UintPack32,
    A2R10G10B10SintPack32,
    A2B10G10R10UnormPack32,
    A2B10G10R10SnormPack32,
    A2B10G10R10UscaledPack32,
    A2B10G10R10SscaledPack32,
    A2B10G10R10UintPack32,
    A2B10G10R10SintPack32,
    R16Unorm,
    R16Snorm,
    R16Uscaled,
    R16Sscaled,
    R16Uint,
    R16Sint,
    R16Float,
    R16G16Unorm,
    R16G16Snorm,
    R16G16Uscaled,
    R16G16Sscaled,
    R16G16Uint,
    R16G16Sint,
    R16G16Float,
    R16G16B16Unorm,
    R16G16B16Snorm,
    R16G16B16Uscaled,
    R16G16B16Sscaled,
    R16G16B16Uint,
    R16G16B16Sint,
    R16G16B16Float,
    R16G16B16A16Unorm,
    R16G16B16A16Snorm,
    R16G16B16A16Uscaled,
    R16G16B16A16Sscaled,
    R16G16B16A16Uint,
    R16G16B16A16Sint,
    R16G16B16A16Float,
    R32Uint,
    R32Sint,
    R32Float,
    R32G32Uint,
    R32G32Sint,
    R32G32Float,
    R32G32B32Uint,
    R32G32B32Sint,
    R32G32B32Float,
    R32G32B32A32Uint,
    R32G32B32A32Sint,
    R32G32B32A32Float,
    R64Uint,
    R64Sint,
    R64Float,
    R64G64Uint,
    R64G64Sint,
    R64G64Float,
    R64G64B64Uint,
    R64G64B64Sint,
    R64G64B64Float,
    R64G64B64A64Uint,
    R64G64B64A64Sint,
    R64G64B64A64Float,
    B10G11R11UfloatPack32,
    E5B9G9R9UfloatPack32,
    D16Unorm,
    X8D24UnormPack32,
    D32Float,
    S8Uint,
    D16UnormS8Uint,
    D24UnormS8Uint,
    D32FloatS8Uint,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorSpace {
    #[default]
    SrgbNonLinear,
    DisplayP3NonLinear,
    ExtendedSrgbLinear,
    DisplayP3Linear,
    DciP3NonLinear,
    Bt709Linear,
    Bt709NonLinear,
    Bt2020Linear,
    Hdr10St2084,
    DolbyVision,
    Hdr10Hlg,
    AdobeRgbLinear,
    AdobeRgbNonLinear,
    PassThrough,
    ExtendedSrgbNonLinear,
}

/// Layouts used when recording pipeline barriers and descriptor writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageLayout {
    #[default]
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    Preinitialized,
    DepthReadOnlyStencilAttachment,
    DepthAttachmentStencilReadOnly,
    DepthAttachment,
    DepthReadOnly,
    StencilAttachment,
    StencilReadOnly,
    ReadOnly,
    Attachment,
    PresentSrc,
    SharedPresent,
    FragmentDensityMap,
    FragmentShadingRateAttachment,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageTiling {
    #[default]
    Optimal,
    Linear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TexelFilter {
    Nearest,
    #[default]
    Linear,
    CubicImage,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SamplerAddress {
    Repeat,
    MirroredRepeat,
    #[default]
    ClampToEdge,
    ClampToBorder,
    MirrorClampToEdge,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MipmapMode {
    Nearest,
    #[default]
    Linear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BorderColor {
    FloatTransparentBlack,
    IntTransparentBlack,
    #[default]
    FloatOpaqueBlack,
    IntOpaqueBlack,
    FloatOpaqueWhite,
    IntOpaqueWhite,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CompareOp {
    Never,
    #[default]
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttachmentLoadOp {
    #[default]
    Load,
    Clear,
    DontCare,
    None,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AttachmentStoreOp {
    #[default]
    Store,
    DontCare,
    None,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SwapchainPresentMode {
    Immediate,
    Mailbox,
    #[default]
    Fifo,
    FifoRelaxed,
    SharedDemandRefresh,
    SharedContinuousRefresh,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SwapchainState {
    Ok,
    TimedOut,
    NotReady,
    Suboptimal,
    #[default]
    Error,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexType {
    Uint8,
    Uint16,
    #[default]
    Uint32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleCount {
    #[default]
    Count1,
    Count2,
    Count4,
    Count8,
    Count16,
    Count32,
    Count64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TopologyType {
    Point,
    Line,
    LineStrip,
    #[default]
    Triangle,
    TriangleStrip,
    TriangleFan,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
    Point,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    #[default]
    CounterClockwise,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CullingMode {
    None,
    #[default]
    Back,
    Front,
    FrontAndBack,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendFactor {
    Zero,
    #[default]
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
    Src1Color,
    OneMinusSrc1Color,
    Src1Alpha,
    OneMinusSrc1Alpha,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendOp {
    #[default]
    Add,
    Subtract,
    ReverseSubtract,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SharingMode {
    #[default]
    Exclusive,
    Concurrent,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PipelineType {
    #[default]
    None,
    Rasterization,
    Compute,
    RayTracing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShaderType {
    #[default]
    Vertex,
    Pixel,
    Geometry,
    TesselationControl,
    TesselationEvaluation,
    Compute,
    None,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ShaderStage: u32 {
        const VERTEX = 1 << 0;
        const TESSELATION_CONTROL = 1 << 1;
        const TESSELATION_EVALUATION = 1 << 2;
        const GEOMETRY = 1 << 3;
        const FRAGMENT = 1 << 4;
        const COMPUTE = 1 << 5;
        const ALL_GRAPHICS = Self::VERTEX.bits()
            | Self::TESSELATION_CONTROL.bits()
            | Self::TESSELATION_EVALUATION.bits()
            | Self::GEOMETRY.bits()
            | Self::FRAGMENT.bits();
        const ALL = 1 << 6;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ImageAspect: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const METADATA = 1 << 3;
        const PLANE_0 = 1 << 4;
        const PLANE_1 = 1 << 5;
        const PLANE_2 = 1 << 6;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const COLOR_ATTACHMENT = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
        const TRANSIENT_ATTACHMENT = 1 << 6;
        const INPUT_ATTACHMENT = 1 << 7;
        const FRAGMENT_DENSITY_MAP = 1 << 8;
        const FRAGMENT_SHADING_RATE_ATTACHMENT = 1 << 9;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Vertex buffer input for draw commands.
        const VERTEX = 1 << 0;
        /// Index buffer input for indexed draw commands.
        const INDEX = 1 << 1;
        /// Uniform buffer descriptor.
        const UNIFORM = 1 << 2;
        /// Storage buffer descriptor.
        const STORAGE = 1 << 3;
        /// Source of a transfer command.
        const TRANSFER_SRC = 1 << 4;
        /// Destination of a transfer command.
        const TRANSFER_DST = 1 << 5;
        /// Backing store for indirect draw commands.
        const INDIRECT = 1 << 6;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemoryUsage: u32 {
        /// The allocation gets its own memory block.
        const DEDICATED = 1 << 0;
        /// The block of memory may be aliased by other resources.
        const CAN_ALIAS = 1 << 1;
        /// Host visible, persistently mapped, written sequentially.
        const HOST_WRITABLE = 1 << 2;
        /// Host visible, persistently mapped, random access reads and writes.
        const HOST_ACCESSIBLE = 1 << 3;
        /// With one of the host flags, lets the allocator pick device-local
        /// memory when it improves performance (BAR, ReBAR, unified memory).
        const HOST_TRANSFERABLE = 1 << 4;
        /// Smallest suitable free range, minimizes fragmentation.
        const BEST_FIT = 1 << 5;
        /// First suitable free range, fastest allocation.
        const FIRST_FIT = 1 << 6;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PipelineStage: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const DRAW_INDIRECT = 1 << 2;
        const VERTEX_INPUT = 1 << 3;
        const VERTEX_SHADER = 1 << 4;
        const TESSELATION_CONTROL = 1 << 5;
        const TESSELATION_EVALUATION = 1 << 6;
        const GEOMETRY_SHADER = 1 << 7;
        const FRAGMENT_SHADER = 1 << 8;
        const EARLY_FRAGMENT_TEST = 1 << 9;
        const LATE_FRAGMENT_TEST = 1 << 10;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 11;
        const COMPUTE_SHADER = 1 << 12;
        const TRANSFER = 1 << 13;
        const BOTTOM_OF_PIPE = 1 << 14;
        const HOST = 1 << 15;
        const ALL_GRAPHICS = 1 << 16;
        const ALL_COMMANDS = 1 << 17;
        const COPY = 1 << 18;
        const RESOLVE = 1 << 19;
        const BLIT = 1 << 20;
        const CLEAR = 1 << 21;
        const INDEX_INPUT = 1 << 22;
        const VERTEX_ATTRIBUTE_INPUT = 1 << 23;
        const PRE_RASTERIZATION_SHADERS = 1 << 24;
        const ACCELERATION_STRUCTURE_BUILD = 1 << 25;
        const RAY_TRACING_SHADER = 1 << 26;
        const TASK_SHADER = 1 << 27;
        const MESH_SHADER = 1 << 28;
        const ACCELERATION_STRUCTURE_COPY = 1 << 29;
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MemoryAccessType: u32 {
        const HOST_READ = 1 << 0;
        const HOST_WRITE = 1 << 1;
        const MEMORY_READ = 1 << 2;
        const MEMORY_WRITE = 1 << 3;
        const HOST_READ_WRITE = Self::HOST_READ.bits() | Self::HOST_WRITE.bits();
        const MEMORY_READ_WRITE = Self::MEMORY_READ.bits() | Self::MEMORY_WRITE.bits();
    }
}

/// Pipeline barrier access: an execution stage paired with a memory access
/// type. Pre-composed values live in [`crate::access`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Access {
    pub stages: PipelineStage,
    pub ty: MemoryAccessType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSubresource {
    pub aspect_flags: ImageAspect,
    pub mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl Default for ImageSubresource {
    fn default() -> Self {
        Self {
            aspect_flags: ImageAspect::COLOR,
            mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        }
    }
}

pub fn is_color_format(format: Format) -> bool {
    !is_depth_format(format) && !is_stencil_format(format) && format != Format::Undefined
}

pub fn is_depth_format(format: Format) -> bool {
    matches!(
        format,
        Format::D16Unorm
            | Format::X8D24UnormPack32
            | Format::D32Float
            | Format::D16UnormS8Uint
            | Format::D24UnormS8Uint
            | Format::D32FloatS8Uint
    )
}

pub fn is_stencil_format(format: Format) -> bool {
    matches!(
        format,
        Format::S8Uint
            | Format::D16UnormS8Uint
            | Format::D24UnormS8Uint
            | Format::D32FloatS8Uint
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_classification() {
        assert!(is_color_format(Format::R8G8B8A8Srgb));
        assert!(is_color_format(Format::B10G11R11UfloatPack32));
        assert!(!is_color_format(Format::Undefined));
        assert!(is_depth_format(Format::D32Float));
        assert!(is_depth_format(Format::D24UnormS8Uint));
        assert!(!is_depth_format(Format::S8Uint));
        assert!(is_stencil_format(Format::S8Uint));
        assert!(is_stencil_format(Format::D32FloatS8Uint));
        assert!(!is_stencil_format(Format::D32Float));
    }

    #[test]
    fn memory_access_composition() {
        let rw = MemoryAccessType::MEMORY_READ_WRITE;
        assert!(rw.contains(MemoryAccessType::MEMORY_READ));
        assert!(rw.contains(MemoryAccessType::MEMORY_WRITE));
        assert!(!rw.contains(MemoryAccessType::HOST_READ));
    }

    #[test]
    fn image_subresource_defaults() {
        let sub = ImageSubresource::default();
        assert_eq!(sub.aspect_flags, ImageAspect::COLOR);
        assert_eq!(sub.level_count, 1);
        assert_eq!(sub.layer_count, 1);
    }
}
