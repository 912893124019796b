/*! Bindless Vulkan device and resource runtime.
 *
 * The crate wraps a single Vulkan 1.3 device behind typed, reference-counted
 * resource handles. Resources live in paged pools owned by the device; the
 * last handle drop schedules the Vulkan object for destruction once the GPU
 * timeline has caught up with the CPU timeline recorded at drop time.
 *
 * Command recording batches pipeline barriers, rendering uses dynamic
 * rendering only, and all shader-visible resources go through one bindless
 * descriptor set plus a buffer-device-address table.
 */

pub mod access;
pub mod buffer;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod handle;
pub mod image;
pub mod pipeline;
pub(crate) mod pool;
pub mod sampler;
pub mod shader;
pub mod submit;
pub mod swapchain;
pub mod sync;
pub mod translate;
pub mod types;
pub mod upload;

/// External dependencies exposed outside of the current crate.
pub use ash::{self, vk};
pub use gpu_allocator;
pub use raw_window_handle;

pub use buffer::{Buffer, BufferBindInfo, BufferInfo, MemoryRequirementInfo};
pub use command::{
    CommandBuffer, CommandBufferInfo, CommandBufferState, CommandPool, CommandPoolInfo,
};
pub use device::{
    DebugCallback, Device, DeviceConfig, DeviceInfo, DeviceInitInfo, PresentInfo, SubmitInfo,
};
pub use handle::{DeviceResource, Handle};
pub use image::{Image, ImageBindInfo, ImageInfo};
pub use pipeline::{Pipeline, PipelineShaderInfo, RasterPipelineInfo};
pub use sampler::{sampler_info_packed_u64, Sampler, SamplerInfo};
pub use shader::{CompiledShaderInfo, Shader, ShaderAttribute, ShaderInfo};
pub use submit::{CommandQueue, SubmissionGroup, SubmissionQueue};
pub use swapchain::{SurfaceInfo, Swapchain, SwapchainInfo};
pub use sync::{Fence, FenceInfo, Semaphore, SemaphoreInfo};
pub use types::*;
pub use upload::{
    BufferDataUploadInfo, FenceValue, ImageDataUploadInfo, UploadHeap, UploadId,
};

// Runtime limits.
pub const MAX_FRAMES_IN_FLIGHT: usize = 4;
pub const MAX_COMMAND_BUFFER_PER_POOL: usize = 16;
pub const MAX_COMMAND_BUFFER_BARRIER_COUNT: usize = 16;
pub const MAX_COMMAND_BUFFER_ATTACHMENT: usize = 16;
// Resource limits.
pub const MAX_BUFFERS: u32 = 10_000;
pub const MAX_IMAGES: u32 = 10_000;
pub const MAX_SAMPLERS: u32 = 100;
// Shader bindings of the bindless descriptor set.
pub const STORAGE_IMAGE_BINDING: u32 = 0;
pub const COMBINED_IMAGE_SAMPLER_BINDING: u32 = 1;
pub const SAMPLED_IMAGE_BINDING: u32 = 2;
pub const SAMPLER_BINDING: u32 = 3;
pub const BUFFER_DEVICE_ADDRESS_BINDING: u32 = 4;
