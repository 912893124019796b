/*! Command pools, command buffers and recording.
 *
 * A command pool owns an inline store of at most
 * [`MAX_COMMAND_BUFFER_PER_POOL`](crate::MAX_COMMAND_BUFFER_PER_POOL)
 * recyclable command buffers. Dropping the last handle of a command buffer
 * returns its slot to the pool's free list; the slot is only handed out
 * again once the GPU timeline has passed the buffer's recording timeline.
 *
 * Pipeline barriers batch into three small arrays and flush as a single
 * `vkCmdPipelineBarrier2` before any non-barrier command and at `end`.
 */

use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Weak,
};

use anyhow::Result;
use ash::vk;
use parking_lot::Mutex;

use crate::{
    buffer::Buffer,
    device::{Device, DeviceShared, ResourceKind},
    handle::{DeviceResource, Handle, RefCount},
    image::Image,
    pipeline::Pipeline,
    pool::PoolIndex,
    swapchain::Swapchain,
    translate,
    types::{
        is_color_format, Access, AttachmentLoadOp, AttachmentStoreOp, ClearValue, ColorValue,
        DeviceQueue, Extent3D, ImageLayout, ImageSubresource, IndexType, Offset3D, Rect2D,
        ShaderStage, TexelFilter, Viewport,
    },
    MAX_COMMAND_BUFFER_ATTACHMENT, MAX_COMMAND_BUFFER_BARRIER_COUNT, MAX_COMMAND_BUFFER_PER_POOL,
};

#[derive(Clone, Debug, Default)]
pub struct CommandPoolInfo {
    pub name: String,
    pub queue: DeviceQueue,
}

#[derive(Clone, Debug, Default)]
pub struct CommandBufferInfo {
    pub name: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandBufferState {
    Initial,
    Recording,
    Executable,
}

fn state_to_u8(state: CommandBufferState) -> u8 {
    match state {
        CommandBufferState::Initial => 0,
        CommandBufferState::Recording => 1,
        CommandBufferState::Executable => 2,
    }
}

fn state_from_u8(state: u8) -> CommandBufferState {
    match state {
        1 => CommandBufferState::Recording,
        2 => CommandBufferState::Executable,
        _ => CommandBufferState::Initial,
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryBarrierInfo {
    pub src_access: Access,
    pub dst_access: Access,
}

#[derive(Clone, Copy, Debug)]
pub struct BufferBarrierInfo {
    /// `usize::MAX` covers the whole buffer.
    pub size: usize,
    pub offset: usize,
    pub src_access: Access,
    pub dst_access: Access,
    pub src_queue: DeviceQueue,
    pub dst_queue: DeviceQueue,
}

impl Default for BufferBarrierInfo {
    fn default() -> Self {
        Self {
            size: usize::MAX,
            offset: 0,
            src_access: Access::default(),
            dst_access: Access::default(),
            src_queue: DeviceQueue::Main,
            dst_queue: DeviceQueue::Main,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ImageBarrierInfo {
    pub src_access: Access,
    pub dst_access: Access,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub subresource: ImageSubresource,
    pub src_queue: DeviceQueue,
    pub dst_queue: DeviceQueue,
}

impl Default for ImageBarrierInfo {
    fn default() -> Self {
        Self {
            src_access: Access::default(),
            dst_access: Access::default(),
            old_layout: ImageLayout::Undefined,
            new_layout: ImageLayout::Undefined,
            subresource: ImageSubresource::default(),
            src_queue: DeviceQueue::Main,
            dst_queue: DeviceQueue::Main,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ImageClearInfo {
    pub dst_image_layout: ImageLayout,
    pub subresource: ImageSubresource,
}

impl Default for ImageClearInfo {
    fn default() -> Self {
        Self {
            dst_image_layout: ImageLayout::General,
            subresource: ImageSubresource::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BufferClearInfo {
    pub offset: usize,
    /// `usize::MAX` covers the whole buffer.
    pub size: usize,
    pub data: u32,
}

impl Default for BufferClearInfo {
    fn default() -> Self {
        Self {
            offset: 0,
            size: usize::MAX,
            data: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DrawInfo {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DrawIndexedInfo {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DrawIndirectInfo {
    pub offset: usize,
    pub draw_count: u32,
    pub stride: u32,
    pub indexed: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DrawIndirectCountInfo {
    /// Offset into the buffer that contains the packed draw parameters.
    pub offset: usize,
    /// Offset into the buffer that contains the packed u32 draw count.
    pub count_buffer_offset: usize,
    pub max_draw_count: u32,
    pub stride: u32,
    pub indexed: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BindVertexBufferInfo {
    pub first_binding: u32,
    pub offset: usize,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BindIndexBufferInfo {
    pub offset: usize,
    pub index_type: IndexType,
}

pub struct BindPushConstantInfo<'a> {
    pub data: &'a [u8],
    pub offset: usize,
    pub shader_stage: ShaderStage,
}

impl<'a> Default for BindPushConstantInfo<'a> {
    fn default() -> Self {
        Self {
            data: &[],
            offset: 0,
            shader_stage: ShaderStage::ALL,
        }
    }
}

#[derive(Clone)]
pub struct RenderAttachment {
    pub image: Handle<Image>,
    pub image_layout: ImageLayout,
    pub load_op: AttachmentLoadOp,
    pub store_op: AttachmentStoreOp,
}

pub struct RenderingInfo<'a> {
    pub color_attachments: &'a [RenderAttachment],
    pub depth_attachment: Option<&'a RenderAttachment>,
    pub stencil_attachment: Option<&'a RenderAttachment>,
    pub render_area: Rect2D,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BufferCopyInfo {
    pub src_offset: usize,
    pub dst_offset: usize,
    pub size: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct BufferImageCopyInfo {
    pub buffer_offset: usize,
    pub dst_image_layout: ImageLayout,
    pub image_subresource: ImageSubresource,
    pub image_offset: Offset3D,
    pub image_extent: Extent3D,
}

impl Default for BufferImageCopyInfo {
    fn default() -> Self {
        Self {
            buffer_offset: 0,
            dst_image_layout: ImageLayout::TransferDst,
            image_subresource: ImageSubresource::default(),
            image_offset: Offset3D::default(),
            image_extent: Extent3D::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ImageBufferCopyInfo {
    pub buffer_offset: usize,
    pub src_image_layout: ImageLayout,
    pub image_subresource: ImageSubresource,
    pub image_offset: Offset3D,
    pub image_extent: Extent3D,
}

impl Default for ImageBufferCopyInfo {
    fn default() -> Self {
        Self {
            buffer_offset: 0,
            src_image_layout: ImageLayout::TransferSrc,
            image_subresource: ImageSubresource::default(),
            image_offset: Offset3D::default(),
            image_extent: Extent3D::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ImageCopyInfo {
    pub src_image_layout: ImageLayout,
    pub src_subresource: ImageSubresource,
    pub src_offset: Offset3D,
    pub dst_image_layout: ImageLayout,
    pub dst_subresource: ImageSubresource,
    pub dst_offset: Offset3D,
    pub extent: Extent3D,
}

impl Default for ImageCopyInfo {
    fn default() -> Self {
        Self {
            src_image_layout: ImageLayout::TransferSrc,
            src_subresource: ImageSubresource::default(),
            src_offset: Offset3D::default(),
            dst_image_layout: ImageLayout::TransferDst,
            dst_subresource: ImageSubresource::default(),
            dst_offset: Offset3D::default(),
            extent: Extent3D::default(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ImageBlitInfo {
    pub src_image_layout: ImageLayout,
    pub src_offset: [Offset3D; 2],
    pub src_subresource: ImageSubresource,
    pub dst_image_layout: ImageLayout,
    pub dst_offset: [Offset3D; 2],
    pub dst_subresource: ImageSubresource,
    pub filter: TexelFilter,
}

impl Default for ImageBlitInfo {
    fn default() -> Self {
        Self {
            src_image_layout: ImageLayout::TransferSrc,
            src_offset: [Offset3D::default(); 2],
            src_subresource: ImageSubresource::default(),
            dst_image_layout: ImageLayout::TransferDst,
            dst_offset: [Offset3D::default(); 2],
            dst_subresource: ImageSubresource::default(),
            filter: TexelFilter::Linear,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DebugLabelInfo<'a> {
    pub name: &'a str,
    pub color: [f32; 4],
}

impl<'a> Default for DebugLabelInfo<'a> {
    fn default() -> Self {
        Self {
            name: "",
            color: [1.0; 4],
        }
    }
}

struct BarrierBatch {
    memory: [vk::MemoryBarrier2<'static>; MAX_COMMAND_BUFFER_BARRIER_COUNT],
    buffer: [vk::BufferMemoryBarrier2<'static>; MAX_COMMAND_BUFFER_BARRIER_COUNT],
    image: [vk::ImageMemoryBarrier2<'static>; MAX_COMMAND_BUFFER_BARRIER_COUNT],
    num_memory: usize,
    num_buffer: usize,
    num_image: usize,
}

impl Default for BarrierBatch {
    fn default() -> Self {
        Self {
            memory: [vk::MemoryBarrier2::default(); MAX_COMMAND_BUFFER_BARRIER_COUNT],
            buffer: [vk::BufferMemoryBarrier2::default(); MAX_COMMAND_BUFFER_BARRIER_COUNT],
            image: [vk::ImageMemoryBarrier2::default(); MAX_COMMAND_BUFFER_BARRIER_COUNT],
            num_memory: 0,
            num_buffer: 0,
            num_image: 0,
        }
    }
}

// The batched vk structs never chain a p_next.
unsafe impl Send for BarrierBatch {}

struct CommandBufferStore {
    buffers: [Option<CommandBuffer>; MAX_COMMAND_BUFFER_PER_POOL],
    free_slots: [usize; MAX_COMMAND_BUFFER_PER_POOL],
    free_count: usize,
    count: usize,
}

impl Default for CommandBufferStore {
    fn default() -> Self {
        Self {
            buffers: std::array::from_fn(|_| None),
            free_slots: [0; MAX_COMMAND_BUFFER_PER_POOL],
            free_count: 0,
            count: 0,
        }
    }
}

pub struct CommandPool {
    pub(crate) raw: vk::CommandPool,
    store: Mutex<CommandBufferStore>,
    info: CommandPoolInfo,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

impl DeviceResource for CommandPool {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::CommandPool::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    fn destroy(&self, id: u64) {
        if let Some(device) = self.device.upgrade() {
            device.schedule_zombie(id, ResourceKind::CommandPool);
        }
    }
}

impl CommandPool {
    pub fn from(device: &Device, info: CommandPoolInfo) -> Result<Handle<CommandPool>> {
        let shared = &device.shared;

        let Some(queue) = shared.queue(info.queue) else {
            return Err(anyhow::anyhow!(
                "Command pool requires a concrete device queue"
            ));
        };

        let create_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue.family_index);
        let raw = unsafe { shared.raw.create_command_pool(&create_info, None)? };

        shared.set_debug_name(raw, &info.name);

        let (index, ptr) = shared.resources.command_pools.insert(Self {
            raw,
            store: Mutex::new(CommandBufferStore::default()),
            info,
            refs: RefCount::default(),
            device: crate::device::downgrade(device),
        });
        Ok(Handle::from_raw(index.to_u64(), ptr))
    }
}

impl Handle<CommandPool> {
    pub fn info(&self) -> Option<&CommandPoolInfo> {
        self.get().map(|pool| &pool.info)
    }

    /// Resets the underlying pool, releasing every command buffer back to
    /// the initial state.
    pub fn reset(&self) {
        let Some(pool) = self.get() else {
            return;
        };
        let Some(device) = pool.device.upgrade() else {
            return;
        };
        unsafe {
            if let Err(error) = device
                .raw
                .reset_command_pool(pool.raw, vk::CommandPoolResetFlags::empty())
            {
                log::error!("vkResetCommandPool failed: {}", error);
                return;
            }
        }

        let store = pool.store.lock();
        for buffer in store.buffers.iter().flatten() {
            buffer
                .state
                .store(state_to_u8(CommandBufferState::Initial), Ordering::Release);
        }
    }
}

pub struct CommandBuffer {
    pub(crate) raw: vk::CommandBuffer,
    recording_timeline: AtomicU64,
    state: AtomicU8,
    barriers: Mutex<BarrierBatch>,
    pool_id: u64,
    info: CommandBufferInfo,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

// vk::CommandBuffer is a dispatchable handle; recording is externally
// synchronized by the per-thread pool ownership rules.
unsafe impl Send for CommandBuffer {}
unsafe impl Sync for CommandBuffer {}

impl DeviceResource for CommandBuffer {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::CommandBuffer::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    /// A command buffer is never released from its pool; the slot returns to
    /// the free list and reuse is gated on the GPU timeline.
    fn destroy(&self, id: u64) {
        let Some(device) = self.device.upgrade() else {
            return;
        };
        let Some(pool_ptr) = device
            .resources
            .command_pools
            .get(PoolIndex::from_u64(self.pool_id))
        else {
            return;
        };
        let pool = unsafe { pool_ptr.as_ref() };
        let mut store = pool.store.lock();
        let slot = id as usize;
        if slot < MAX_COMMAND_BUFFER_PER_POOL && store.free_count < MAX_COMMAND_BUFFER_PER_POOL {
            let free_count = store.free_count;
            store.free_slots[free_count] = slot;
            store.free_count += 1;
        }
    }
}

impl CommandBuffer {
    /// Requests a command buffer from `pool`. Free slots whose recording the
    /// GPU has retired are recycled first; otherwise a fresh buffer is
    /// allocated until the pool cap is reached.
    pub fn from(pool: &Handle<CommandPool>) -> Result<Handle<CommandBuffer>> {
        let Some(pool_resource) = pool.get() else {
            return Err(anyhow::anyhow!("Command pool handle is null"));
        };
        let Some(device) = pool_resource.device.upgrade() else {
            return Err(anyhow::anyhow!("Device is gone"));
        };

        let gpu_timeline = device.gpu_timeline();
        let mut store = pool_resource.store.lock();

        for free_index in 0..store.free_count {
            let slot = store.free_slots[free_index];
            let recycled = store.buffers[slot]
                .as_ref()
                .map_or(false, |buffer| {
                    buffer.recording_timeline.load(Ordering::Acquire) < gpu_timeline
                });
            if recycled {
                store.free_slots[free_index] = store.free_slots[store.free_count - 1];
                store.free_count -= 1;

                let buffer = store.buffers[slot].as_ref().unwrap();
                return Ok(Handle::from_raw(slot as u64, std::ptr::NonNull::from(buffer)));
            }
        }

        if store.count >= MAX_COMMAND_BUFFER_PER_POOL {
            return Err(anyhow::anyhow!(
                "Command pool is out of command buffers"
            ));
        }

        let allocate_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool_resource.raw)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let raw = unsafe { device.raw.allocate_command_buffers(&allocate_info)?[0] };

        let slot = store.count;
        store.count += 1;

        let info = CommandBufferInfo {
            name: format!("<command_buffer:{}>:{}", slot, pool_resource.info.name),
        };
        device.set_debug_name(raw, &info.name);

        store.buffers[slot] = Some(CommandBuffer {
            raw,
            recording_timeline: AtomicU64::new(0),
            state: AtomicU8::new(state_to_u8(CommandBufferState::Initial)),
            barriers: Mutex::new(BarrierBatch::default()),
            pool_id: pool.id(),
            info,
            refs: RefCount::default(),
            device: pool_resource.device.clone(),
        });

        let buffer = store.buffers[slot].as_ref().unwrap();
        Ok(Handle::from_raw(slot as u64, std::ptr::NonNull::from(buffer)))
    }

    fn flush_barriers_locked(&self, device: &DeviceShared, batch: &mut BarrierBatch) {
        if batch.num_memory == 0 && batch.num_buffer == 0 && batch.num_image == 0 {
            return;
        }

        let dependency_info = vk::DependencyInfo::default()
            .memory_barriers(&batch.memory[..batch.num_memory])
            .buffer_memory_barriers(&batch.buffer[..batch.num_buffer])
            .image_memory_barriers(&batch.image[..batch.num_image]);
        unsafe {
            device.raw.cmd_pipeline_barrier2(self.raw, &dependency_info);
        }

        batch.num_memory = 0;
        batch.num_buffer = 0;
        batch.num_image = 0;
    }
}

fn clear_color_value(clear: &ClearValue) -> vk::ClearColorValue {
    match clear {
        ClearValue::Color(ColorValue::Float32(values)) => {
            vk::ClearColorValue { float32: *values }
        }
        ClearValue::Color(ColorValue::Int32(values)) => vk::ClearColorValue { int32: *values },
        ClearValue::Color(ColorValue::Uint32(values)) => vk::ClearColorValue { uint32: *values },
        ClearValue::DepthStencil(_) => vk::ClearColorValue::default(),
    }
}

fn clear_depth_stencil_value(clear: &ClearValue) -> vk::ClearDepthStencilValue {
    match clear {
        ClearValue::DepthStencil(value) => vk::ClearDepthStencilValue {
            depth: value.depth,
            stencil: value.stencil,
        },
        ClearValue::Color(_) => vk::ClearDepthStencilValue::default(),
    }
}

fn subresource_range(subresource: &ImageSubresource) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(translate::translate_image_aspect_flags(
            subresource.aspect_flags,
        ))
        .base_mip_level(subresource.mip_level)
        .level_count(subresource.level_count)
        .base_array_layer(subresource.base_array_layer)
        .layer_count(subresource.layer_count)
}

fn subresource_layers(subresource: &ImageSubresource) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers::default()
        .aspect_mask(translate::translate_image_aspect_flags(
            subresource.aspect_flags,
        ))
        .mip_level(subresource.mip_level)
        .base_array_layer(subresource.base_array_layer)
        .layer_count(subresource.layer_count)
}

fn to_vk_offset(offset: Offset3D) -> vk::Offset3D {
    vk::Offset3D {
        x: offset.x,
        y: offset.y,
        z: offset.z,
    }
}

fn to_vk_extent(extent: Extent3D) -> vk::Extent3D {
    vk::Extent3D {
        width: extent.width,
        height: extent.height,
        depth: extent.depth.max(1),
    }
}

impl Handle<CommandBuffer> {
    pub fn info(&self) -> Option<&CommandBufferInfo> {
        self.get().map(|buffer| &buffer.info)
    }

    pub fn state(&self) -> CommandBufferState {
        self.get().map_or(CommandBufferState::Initial, |buffer| {
            state_from_u8(buffer.state.load(Ordering::Acquire))
        })
    }

    /// CPU timeline value captured by the last `begin`.
    pub fn recording_timeline(&self) -> u64 {
        self.get()
            .map_or(0, |buffer| buffer.recording_timeline.load(Ordering::Acquire))
    }

    fn with_device<R>(&self, op: impl FnOnce(&CommandBuffer, &DeviceShared) -> R) -> Option<R> {
        let buffer = self.get()?;
        let device = buffer.device.upgrade()?;
        Some(op(buffer, &device))
    }

    /// Starts a one-time-submit recording and advances the device CPU
    /// timeline by one.
    pub fn begin(&self) -> Result<()> {
        self.with_device(|buffer, device| {
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            unsafe { device.raw.begin_command_buffer(buffer.raw, &begin_info)? };

            let timeline = device.cpu_timeline.fetch_add(1, Ordering::AcqRel) + 1;
            buffer.recording_timeline.store(timeline, Ordering::Release);
            buffer
                .state
                .store(state_to_u8(CommandBufferState::Recording), Ordering::Release);
            Ok(())
        })
        .unwrap_or_else(|| Err(anyhow::anyhow!("Command buffer handle is null")))
    }

    /// Flushes any pending barriers and ends the recording.
    pub fn end(&self) -> Result<()> {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            unsafe { device.raw.end_command_buffer(buffer.raw)? };
            buffer.state.store(
                state_to_u8(CommandBufferState::Executable),
                Ordering::Release,
            );
            Ok(())
        })
        .unwrap_or_else(|| Err(anyhow::anyhow!("Command buffer handle is null")))
    }

    /// Resets the buffer, but only when the GPU has retired its last
    /// recording.
    pub fn reset(&self) {
        self.with_device(|buffer, device| {
            if buffer.recording_timeline.load(Ordering::Acquire) >= device.gpu_timeline() {
                return;
            }
            unsafe {
                if let Err(error) = device.raw.reset_command_buffer(
                    buffer.raw,
                    vk::CommandBufferResetFlags::RELEASE_RESOURCES,
                ) {
                    log::error!("vkResetCommandBuffer failed: {}", error);
                    return;
                }
            }
            buffer
                .state
                .store(state_to_u8(CommandBufferState::Initial), Ordering::Release);
        });
    }

    /// Queues a global memory barrier; flushes the batch first when full.
    pub fn pipeline_barrier(&self, barrier: &MemoryBarrierInfo) {
        self.with_device(|buffer, device| {
            let mut batch = buffer.barriers.lock();
            if batch.num_memory >= MAX_COMMAND_BUFFER_BARRIER_COUNT {
                buffer.flush_barriers_locked(device, &mut batch);
            }

            let slot = batch.num_memory;
            batch.memory[slot] = vk::MemoryBarrier2::default()
                .src_stage_mask(translate::translate_pipeline_stage_flags(
                    barrier.src_access.stages,
                ))
                .src_access_mask(translate::translate_memory_access_flags(
                    barrier.src_access.ty,
                ))
                .dst_stage_mask(translate::translate_pipeline_stage_flags(
                    barrier.dst_access.stages,
                ))
                .dst_access_mask(translate::translate_memory_access_flags(
                    barrier.dst_access.ty,
                ));
            batch.num_memory += 1;
        });
    }

    /// Queues a buffer barrier; distinct src/dst queues emit a queue family
    /// ownership transfer.
    pub fn pipeline_buffer_barrier(&self, target: &Handle<Buffer>, barrier: &BufferBarrierInfo) {
        self.with_device(|buffer, device| {
            let Some(target_resource) = target.get() else {
                return;
            };
            let mut batch = buffer.barriers.lock();
            if batch.num_buffer >= MAX_COMMAND_BUFFER_BARRIER_COUNT {
                buffer.flush_barriers_locked(device, &mut batch);
            }

            let size = if barrier.size == usize::MAX {
                target.size()
            } else {
                barrier.size
            };

            let slot = batch.num_buffer;
            batch.buffer[slot] = vk::BufferMemoryBarrier2::default()
                .src_stage_mask(translate::translate_pipeline_stage_flags(
                    barrier.src_access.stages,
                ))
                .src_access_mask(translate::translate_memory_access_flags(
                    barrier.src_access.ty,
                ))
                .dst_stage_mask(translate::translate_pipeline_stage_flags(
                    barrier.dst_access.stages,
                ))
                .dst_access_mask(translate::translate_memory_access_flags(
                    barrier.dst_access.ty,
                ))
                .src_queue_family_index(device.queue_family_index(barrier.src_queue))
                .dst_queue_family_index(device.queue_family_index(barrier.dst_queue))
                .buffer(target_resource.raw)
                .offset(barrier.offset as vk::DeviceSize)
                .size(size as vk::DeviceSize);
            batch.num_buffer += 1;
        });
    }

    /// Queues an image barrier: layout transition plus optional queue family
    /// ownership transfer.
    pub fn pipeline_image_barrier(&self, target: &Handle<Image>, barrier: &ImageBarrierInfo) {
        self.with_device(|buffer, device| {
            let Some(target_resource) = target.get() else {
                return;
            };
            let mut batch = buffer.barriers.lock();
            if batch.num_image >= MAX_COMMAND_BUFFER_BARRIER_COUNT {
                buffer.flush_barriers_locked(device, &mut batch);
            }

            let slot = batch.num_image;
            batch.image[slot] = vk::ImageMemoryBarrier2::default()
                .src_stage_mask(translate::translate_pipeline_stage_flags(
                    barrier.src_access.stages,
                ))
                .src_access_mask(translate::translate_memory_access_flags(
                    barrier.src_access.ty,
                ))
                .dst_stage_mask(translate::translate_pipeline_stage_flags(
                    barrier.dst_access.stages,
                ))
                .dst_access_mask(translate::translate_memory_access_flags(
                    barrier.dst_access.ty,
                ))
                .old_layout(translate::translate_image_layout(barrier.old_layout))
                .new_layout(translate::translate_image_layout(barrier.new_layout))
                .src_queue_family_index(device.queue_family_index(barrier.src_queue))
                .dst_queue_family_index(device.queue_family_index(barrier.dst_queue))
                .image(target_resource.raw)
                .subresource_range(subresource_range(&barrier.subresource));
            batch.num_image += 1;
        });
    }

    /// Issues the pending barrier batch as one `vkCmdPipelineBarrier2`.
    pub fn flush_barriers(&self) {
        self.with_device(|buffer, device| {
            let mut batch = buffer.barriers.lock();
            buffer.flush_barriers_locked(device, &mut batch);
        });
    }

    /// Clears a color or depth/stencil image, picking the clear verb from
    /// the image's format. The clear value comes from the image's info.
    pub fn clear_image(&self, image: &Handle<Image>, info: &ImageClearInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let Some(image_resource) = image.get() else {
                return;
            };
            let Some(image_info) = image.info() else {
                return;
            };

            let range = subresource_range(&info.subresource);
            let layout = translate::translate_image_layout(info.dst_image_layout);
            unsafe {
                if is_color_format(image_info.format) {
                    let value = clear_color_value(&image_info.clear_value);
                    device.raw.cmd_clear_color_image(
                        buffer.raw,
                        image_resource.raw,
                        layout,
                        &value,
                        std::slice::from_ref(&range),
                    );
                } else {
                    let value = clear_depth_stencil_value(&image_info.clear_value);
                    device.raw.cmd_clear_depth_stencil_image(
                        buffer.raw,
                        image_resource.raw,
                        layout,
                        &value,
                        std::slice::from_ref(&range),
                    );
                }
            }
        });
    }

    pub fn clear_buffer(&self, target: &Handle<Buffer>, info: &BufferClearInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let Some(target_resource) = target.get() else {
                return;
            };
            let size = if info.size == usize::MAX {
                vk::WHOLE_SIZE
            } else {
                info.size as vk::DeviceSize
            };
            unsafe {
                device.raw.cmd_fill_buffer(
                    buffer.raw,
                    target_resource.raw,
                    info.offset as vk::DeviceSize,
                    size,
                    info.data,
                );
            }
        });
    }

    pub fn draw(&self, info: &DrawInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| unsafe {
            device.raw.cmd_draw(
                buffer.raw,
                info.vertex_count,
                info.instance_count.max(1),
                info.first_vertex,
                info.first_instance,
            );
        });
    }

    pub fn draw_indexed(&self, info: &DrawIndexedInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| unsafe {
            device.raw.cmd_draw_indexed(
                buffer.raw,
                info.index_count,
                info.instance_count.max(1),
                info.first_index,
                info.vertex_offset,
                info.first_instance,
            );
        });
    }

    pub fn draw_indirect(&self, draw_buffer: &Handle<Buffer>, info: &DrawIndirectInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let Some(draw_resource) = draw_buffer.get() else {
                return;
            };
            unsafe {
                if info.indexed {
                    device.raw.cmd_draw_indexed_indirect(
                        buffer.raw,
                        draw_resource.raw,
                        info.offset as vk::DeviceSize,
                        info.draw_count,
                        info.stride,
                    );
                } else {
                    device.raw.cmd_draw_indirect(
                        buffer.raw,
                        draw_resource.raw,
                        info.offset as vk::DeviceSize,
                        info.draw_count,
                        info.stride,
                    );
                }
            }
        });
    }

    pub fn draw_indirect_count(
        &self,
        draw_buffer: &Handle<Buffer>,
        count_buffer: &Handle<Buffer>,
        info: &DrawIndirectCountInfo,
    ) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let (Some(draw_resource), Some(count_resource)) =
                (draw_buffer.get(), count_buffer.get())
            else {
                return;
            };
            unsafe {
                if info.indexed {
                    device.raw.cmd_draw_indexed_indirect_count(
                        buffer.raw,
                        draw_resource.raw,
                        info.offset as vk::DeviceSize,
                        count_resource.raw,
                        info.count_buffer_offset as vk::DeviceSize,
                        info.max_draw_count,
                        info.stride,
                    );
                } else {
                    device.raw.cmd_draw_indirect_count(
                        buffer.raw,
                        draw_resource.raw,
                        info.offset as vk::DeviceSize,
                        count_resource.raw,
                        info.count_buffer_offset as vk::DeviceSize,
                        info.max_draw_count,
                        info.stride,
                    );
                }
            }
        });
    }

    pub fn bind_vertex_buffer(&self, vertex_buffer: &Handle<Buffer>, info: &BindVertexBufferInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let Some(vertex_resource) = vertex_buffer.get() else {
                return;
            };
            let usable = vertex_buffer
                .info()
                .map_or(false, |buffer_info| {
                    buffer_info
                        .buffer_usage
                        .contains(crate::types::BufferUsage::VERTEX)
                });
            if !usable {
                return;
            }
            let buffers = [vertex_resource.raw];
            let offsets = [info.offset as vk::DeviceSize];
            unsafe {
                device
                    .raw
                    .cmd_bind_vertex_buffers(buffer.raw, info.first_binding, &buffers, &offsets);
            }
        });
    }

    pub fn bind_index_buffer(&self, index_buffer: &Handle<Buffer>, info: &BindIndexBufferInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let Some(index_resource) = index_buffer.get() else {
                return;
            };
            let usable = index_buffer
                .info()
                .map_or(false, |buffer_info| {
                    buffer_info
                        .buffer_usage
                        .contains(crate::types::BufferUsage::INDEX)
                });
            if !usable {
                return;
            }
            unsafe {
                device.raw.cmd_bind_index_buffer(
                    buffer.raw,
                    index_resource.raw,
                    info.offset as vk::DeviceSize,
                    translate::translate_index_type(info.index_type),
                );
            }
        });
    }

    /// Pushes constants through the layout keyed by the data size rounded up
    /// to a multiple of four. Size and offset must be 4-byte aligned and
    /// within the configured maximum.
    pub fn bind_push_constant(&self, info: &BindPushConstantInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let size = info.data.len() as u32;
            let offset = info.offset as u32;
            let max_size = device.config().push_constant_max_size;

            debug_assert!(size <= max_size, "push constant exceeds the device maximum");
            debug_assert!(offset <= max_size, "push constant offset exceeds the device maximum");
            debug_assert!(size % 4 == 0, "push constant size must be a multiple of 4");
            debug_assert!(offset % 4 == 0, "push constant offset must be a multiple of 4");

            let layout = device.descriptor_cache.pipeline_layout(size);
            unsafe {
                device.raw.cmd_push_constants(
                    buffer.raw,
                    layout,
                    translate::translate_shader_stage_flags(info.shader_stage),
                    offset,
                    info.data,
                );
            }
        });
    }

    /// Binds the bindless descriptor set and then the pipeline at its bind
    /// point.
    pub fn bind_pipeline(&self, pipeline: &Handle<Pipeline>) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let Some(pipeline_resource) = pipeline.get() else {
                return;
            };
            let bind_point = pipeline_resource.bind_point();
            unsafe {
                device.raw.cmd_bind_descriptor_sets(
                    buffer.raw,
                    bind_point,
                    pipeline_resource.layout,
                    0,
                    std::slice::from_ref(&device.descriptor_cache.descriptor_set),
                    &[],
                );
                device
                    .raw
                    .cmd_bind_pipeline(buffer.raw, bind_point, pipeline_resource.raw);
            }
        });
    }

    /// Starts a dynamic rendering scope. Clear values are sourced from each
    /// attachment image's info.
    pub fn begin_rendering(&self, info: &RenderingInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            debug_assert!(info.color_attachments.len() <= MAX_COMMAND_BUFFER_ATTACHMENT);

            let color_attachments = info
                .color_attachments
                .iter()
                .take(MAX_COMMAND_BUFFER_ATTACHMENT)
                .filter_map(|attachment| {
                    let image = attachment.image.get()?;
                    let image_info = attachment.image.info()?;
                    Some(
                        vk::RenderingAttachmentInfo::default()
                            .image_view(image.view)
                            .image_layout(translate::translate_image_layout(
                                attachment.image_layout,
                            ))
                            .resolve_mode(vk::ResolveModeFlags::NONE)
                            .load_op(translate::translate_attachment_load_op(attachment.load_op))
                            .store_op(translate::translate_attachment_store_op(
                                attachment.store_op,
                            ))
                            .clear_value(vk::ClearValue {
                                color: clear_color_value(&image_info.clear_value),
                            }),
                    )
                })
                .collect::<Vec<_>>();

            let depth_attachment = info.depth_attachment.and_then(|attachment| {
                let image = attachment.image.get()?;
                let image_info = attachment.image.info()?;
                Some(
                    vk::RenderingAttachmentInfo::default()
                        .image_view(image.view)
                        .image_layout(translate::translate_image_layout(attachment.image_layout))
                        .resolve_mode(vk::ResolveModeFlags::NONE)
                        .load_op(translate::translate_attachment_load_op(attachment.load_op))
                        .store_op(translate::translate_attachment_store_op(attachment.store_op))
                        .clear_value(vk::ClearValue {
                            depth_stencil: clear_depth_stencil_value(&image_info.clear_value),
                        }),
                )
            });
            let stencil_attachment = info.stencil_attachment.and_then(|attachment| {
                let image = attachment.image.get()?;
                let image_info = attachment.image.info()?;
                Some(
                    vk::RenderingAttachmentInfo::default()
                        .image_view(image.view)
                        .image_layout(translate::translate_image_layout(attachment.image_layout))
                        .resolve_mode(vk::ResolveModeFlags::NONE)
                        .load_op(translate::translate_attachment_load_op(attachment.load_op))
                        .store_op(translate::translate_attachment_store_op(attachment.store_op))
                        .clear_value(vk::ClearValue {
                            depth_stencil: clear_depth_stencil_value(&image_info.clear_value),
                        }),
                )
            });

            let mut rendering_info = vk::RenderingInfo::default()
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D {
                        x: info.render_area.offset.x,
                        y: info.render_area.offset.y,
                    },
                    extent: vk::Extent2D {
                        width: info.render_area.extent.width,
                        height: info.render_area.extent.height,
                    },
                })
                .layer_count(1)
                .color_attachments(&color_attachments);
            if let Some(depth_attachment) = &depth_attachment {
                rendering_info = rendering_info.depth_attachment(depth_attachment);
            }
            if let Some(stencil_attachment) = &stencil_attachment {
                rendering_info = rendering_info.stencil_attachment(stencil_attachment);
            }

            unsafe {
                device.raw.cmd_begin_rendering(buffer.raw, &rendering_info);
            }
        });
    }

    pub fn end_rendering(&self) {
        self.flush_barriers();
        self.with_device(|buffer, device| unsafe {
            device.raw.cmd_end_rendering(buffer.raw);
        });
    }

    pub fn copy_buffer_to_buffer(
        &self,
        src: &Handle<Buffer>,
        dst: &Handle<Buffer>,
        info: &BufferCopyInfo,
    ) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let (Some(src_resource), Some(dst_resource)) = (src.get(), dst.get()) else {
                return;
            };
            debug_assert!(info.size > 0);
            let region = vk::BufferCopy::default()
                .src_offset(info.src_offset as vk::DeviceSize)
                .dst_offset(info.dst_offset as vk::DeviceSize)
                .size(info.size as vk::DeviceSize);
            unsafe {
                device.raw.cmd_copy_buffer(
                    buffer.raw,
                    src_resource.raw,
                    dst_resource.raw,
                    std::slice::from_ref(&region),
                );
            }
        });
    }

    pub fn copy_buffer_to_image(
        &self,
        src: &Handle<Buffer>,
        dst: &Handle<Image>,
        info: &BufferImageCopyInfo,
    ) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let (Some(src_resource), Some(dst_resource)) = (src.get(), dst.get()) else {
                return;
            };
            let region = vk::BufferImageCopy::default()
                .buffer_offset(info.buffer_offset as vk::DeviceSize)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(subresource_layers(&info.image_subresource))
                .image_offset(to_vk_offset(info.image_offset))
                .image_extent(to_vk_extent(info.image_extent));
            unsafe {
                device.raw.cmd_copy_buffer_to_image(
                    buffer.raw,
                    src_resource.raw,
                    dst_resource.raw,
                    translate::translate_image_layout(info.dst_image_layout),
                    std::slice::from_ref(&region),
                );
            }
        });
    }

    pub fn copy_image_to_buffer(
        &self,
        src: &Handle<Image>,
        dst: &Handle<Buffer>,
        info: &ImageBufferCopyInfo,
    ) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let (Some(src_resource), Some(dst_resource)) = (src.get(), dst.get()) else {
                return;
            };
            let region = vk::BufferImageCopy::default()
                .buffer_offset(info.buffer_offset as vk::DeviceSize)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(subresource_layers(&info.image_subresource))
                .image_offset(to_vk_offset(info.image_offset))
                .image_extent(to_vk_extent(info.image_extent));
            unsafe {
                device.raw.cmd_copy_image_to_buffer(
                    buffer.raw,
                    src_resource.raw,
                    translate::translate_image_layout(info.src_image_layout),
                    dst_resource.raw,
                    std::slice::from_ref(&region),
                );
            }
        });
    }

    pub fn copy_image_to_image(
        &self,
        src: &Handle<Image>,
        dst: &Handle<Image>,
        info: &ImageCopyInfo,
    ) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let (Some(src_resource), Some(dst_resource)) = (src.get(), dst.get()) else {
                return;
            };
            let region = vk::ImageCopy::default()
                .src_subresource(subresource_layers(&info.src_subresource))
                .src_offset(to_vk_offset(info.src_offset))
                .dst_subresource(subresource_layers(&info.dst_subresource))
                .dst_offset(to_vk_offset(info.dst_offset))
                .extent(to_vk_extent(info.extent));
            unsafe {
                device.raw.cmd_copy_image(
                    buffer.raw,
                    src_resource.raw,
                    translate::translate_image_layout(info.src_image_layout),
                    dst_resource.raw,
                    translate::translate_image_layout(info.dst_image_layout),
                    std::slice::from_ref(&region),
                );
            }
        });
    }

    pub fn blit_image(&self, src: &Handle<Image>, dst: &Handle<Image>, info: &ImageBlitInfo) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let (Some(src_resource), Some(dst_resource)) = (src.get(), dst.get()) else {
                return;
            };
            blit_raw(
                device,
                buffer.raw,
                src_resource.raw,
                dst_resource.raw,
                info,
            );
        });
    }

    /// Blits into the image most recently acquired from `dst`.
    pub fn blit_image_to_swapchain(
        &self,
        src: &Handle<Image>,
        dst: &Handle<Swapchain>,
        info: &ImageBlitInfo,
    ) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let current = dst.current_image();
            let (Some(src_resource), Some(dst_resource)) = (src.get(), current.get()) else {
                return;
            };
            blit_raw(
                device,
                buffer.raw,
                src_resource.raw,
                dst_resource.raw,
                info,
            );
        });
    }

    pub fn set_viewport(&self, viewport: &Viewport) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let viewports = [vk::Viewport {
                x: viewport.x,
                y: viewport.y,
                width: viewport.width,
                height: viewport.height,
                min_depth: viewport.min_depth,
                max_depth: viewport.max_depth,
            }];
            unsafe {
                device.raw.cmd_set_viewport(buffer.raw, 0, &viewports);
            }
        });
    }

    pub fn set_scissor(&self, rect: &Rect2D) {
        self.flush_barriers();
        self.with_device(|buffer, device| {
            let scissors = [vk::Rect2D {
                offset: vk::Offset2D {
                    x: rect.offset.x,
                    y: rect.offset.y,
                },
                extent: vk::Extent2D {
                    width: rect.extent.width,
                    height: rect.extent.height,
                },
            }];
            unsafe {
                device.raw.cmd_set_scissor(buffer.raw, 0, &scissors);
            }
        });
    }

    pub fn begin_debug_label(&self, info: &DebugLabelInfo) {
        self.with_device(|buffer, device| {
            let Some(debug_utils_device) = &device.debug_utils_device else {
                return;
            };
            let Ok(name) = std::ffi::CString::new(info.name) else {
                return;
            };
            let label = vk::DebugUtilsLabelEXT::default()
                .label_name(&name)
                .color(info.color);
            unsafe {
                debug_utils_device.cmd_begin_debug_utils_label(buffer.raw, &label);
            }
        });
    }

    pub fn end_debug_label(&self) {
        self.with_device(|buffer, device| {
            let Some(debug_utils_device) = &device.debug_utils_device else {
                return;
            };
            unsafe {
                debug_utils_device.cmd_end_debug_utils_label(buffer.raw);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_encoding_round_trips() {
        for state in [
            CommandBufferState::Initial,
            CommandBufferState::Recording,
            CommandBufferState::Executable,
        ] {
            assert_eq!(state_from_u8(state_to_u8(state)), state);
        }
    }

    #[test]
    fn whole_resource_defaults() {
        assert_eq!(BufferBarrierInfo::default().size, usize::MAX);
        assert_eq!(BufferClearInfo::default().size, usize::MAX);
        assert_eq!(
            ImageClearInfo::default().dst_image_layout,
            crate::types::ImageLayout::General
        );
        assert_eq!(
            BufferImageCopyInfo::default().dst_image_layout,
            crate::types::ImageLayout::TransferDst
        );
    }
}

fn blit_raw(
    device: &DeviceShared,
    command_buffer: vk::CommandBuffer,
    src: vk::Image,
    dst: vk::Image,
    info: &ImageBlitInfo,
) {
    let region = vk::ImageBlit::default()
        .src_subresource(subresource_layers(&info.src_subresource))
        .src_offsets([to_vk_offset(info.src_offset[0]), to_vk_offset(info.src_offset[1])])
        .dst_subresource(subresource_layers(&info.dst_subresource))
        .dst_offsets([to_vk_offset(info.dst_offset[0]), to_vk_offset(info.dst_offset[1])]);
    unsafe {
        device.raw.cmd_blit_image(
            command_buffer,
            src,
            translate::translate_image_layout(info.src_image_layout),
            dst,
            translate::translate_image_layout(info.dst_image_layout),
            std::slice::from_ref(&region),
            translate::translate_texel_filter(info.filter),
        );
    }
}
