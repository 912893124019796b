/*! Staging heap for host-to-device uploads.
 *
 * A ring of three pools, each holding lazily allocated host-writable staging
 * blocks plus the upload records written against them. `send_to_gpu` builds
 * one transfer-queue command buffer per flush: acquire barriers pull
 * ownership of the destinations onto the transfer queue, the copies run,
 * and release barriers hand ownership to each destination's consuming
 * queue. Consumers wait on the returned timeline fence value before
 * touching the data.
 *
 * Buffer uploads chunk across staging blocks; image uploads do not, since
 * optimally tiled images are not a linear sequence of bytes.
 */

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;

use crate::{
    access,
    buffer::{Buffer, BufferInfo},
    command::{
        BufferBarrierInfo, BufferCopyInfo, BufferImageCopyInfo, CommandBuffer, ImageBarrierInfo,
        MemoryBarrierInfo,
    },
    device::Device,
    handle::Handle,
    image::Image,
    submit::{CommandQueue, SubmissionQueue},
    sync::{Fence, FenceInfo},
    types::{
        BufferUsage, DeviceQueue, Extent3D, ImageAspect, ImageLayout, ImageSubresource,
        MemoryUsage, SharingMode,
    },
};

pub const MAX_POOL_IN_QUEUE: usize = 3;
pub const MAX_UPLOAD_HEAP_BUFFERS_PER_POOL: usize = 8;
pub const MAX_UPLOADS_PER_POOL: usize = 64;
pub const HEAP_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Monotonic upload ticket. Compare against the heap's timeline fence to
/// learn whether the upload has landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct UploadId(u64);

impl UploadId {
    pub const INVALID: Self = Self(u64::MAX);

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn valid(self) -> bool {
        self != Self::INVALID
    }
}

/// Fence/value pair consumers wait on before reading uploaded data.
#[derive(Clone)]
pub struct FenceValue {
    pub fence: Handle<Fence>,
    pub value: u64,
}

pub struct BufferDataUploadInfo<'a> {
    pub dst: Handle<Buffer>,
    pub data: &'a [u8],
    pub dst_offset: usize,
    /// Queue family currently owning `dst`; `None` for freshly created
    /// resources.
    pub src_queue: DeviceQueue,
    /// Queue family that consumes the data after the upload.
    pub dst_queue: DeviceQueue,
}

pub struct ImageDataUploadInfo<'a> {
    pub image: Handle<Image>,
    pub data: &'a [u8],
    pub mip_level: u32,
    pub aspect_mask: ImageAspect,
    pub src_queue: DeviceQueue,
    pub dst_queue: DeviceQueue,
}

struct HeapBlock {
    buffer: Handle<Buffer>,
    byte_offset: usize,
}

impl HeapBlock {
    fn remaining_capacity(&self) -> usize {
        HEAP_BLOCK_SIZE - self.byte_offset
    }
}

struct BufferUploadRecord {
    src: Handle<Buffer>,
    dst: Handle<Buffer>,
    copy: BufferCopyInfo,
    owning_queue: DeviceQueue,
    dst_queue: DeviceQueue,
}

struct ImageUploadRecord {
    src: Handle<Buffer>,
    dst: Handle<Image>,
    copy: BufferImageCopyInfo,
    owning_queue: DeviceQueue,
    dst_queue: DeviceQueue,
}

#[derive(Default)]
struct UploadPool {
    heaps: Vec<HeapBlock>,
    current: usize,
    buffer_uploads: Vec<BufferUploadRecord>,
    image_uploads: Vec<ImageUploadRecord>,
}

impl UploadPool {
    fn reset(&mut self) {
        for heap in &mut self.heaps {
            heap.byte_offset = 0;
        }
        self.current = 0;
        self.buffer_uploads.clear();
        self.image_uploads.clear();
    }

    fn has_pending(&self) -> bool {
        !self.buffer_uploads.is_empty() || !self.image_uploads.is_empty()
    }
}

/// Extent of a mip level of a 2D image.
fn mip_extent(dimension: Extent3D, mip_level: u32) -> Extent3D {
    Extent3D {
        width: (dimension.width >> mip_level).max(1),
        height: (dimension.height >> mip_level).max(1),
        depth: 1,
    }
}

pub struct UploadHeap {
    device: Device,
    transfer_queue: CommandQueue,
    pools: [UploadPool; MAX_POOL_IN_QUEUE],
    next_pool: usize,
    cpu_upload_timeline: u64,
    previous_signal: [u64; MAX_POOL_IN_QUEUE],
    gpu_upload_timeline: Handle<Fence>,
}

impl UploadHeap {
    pub fn new(device: &Device, submission_queue: Arc<Mutex<SubmissionQueue>>) -> Result<Self> {
        let gpu_upload_timeline = Fence::from(
            device,
            FenceInfo {
                name: String::from("upload heap gpu timeline"),
                initial_value: 0,
            },
        )?;

        Ok(Self {
            device: device.clone(),
            transfer_queue: CommandQueue::new(
                device.clone(),
                DeviceQueue::Transfer,
                submission_queue,
            ),
            pools: std::array::from_fn(|_| UploadPool::default()),
            next_pool: 0,
            cpu_upload_timeline: 0,
            previous_signal: [0; MAX_POOL_IN_QUEUE],
            gpu_upload_timeline,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The id the next `send_to_gpu` resolves.
    pub fn current_upload_id(&self) -> UploadId {
        UploadId(self.cpu_upload_timeline + 1)
    }

    pub fn upload_completed(&self, id: UploadId) -> bool {
        id.valid() && self.gpu_upload_timeline.value() >= id.get()
    }

    /// Stages `data` for copy into `dst`, chunking across heap blocks when
    /// the source exceeds the remaining capacity. A saturated pool forces an
    /// intermediate flush.
    pub fn upload_data_to_buffer(&mut self, info: BufferDataUploadInfo) -> UploadId {
        if !info.dst.valid() || info.data.is_empty() {
            return UploadId::INVALID;
        }

        let mut written = 0usize;
        while written < info.data.len() {
            if self.pools[self.next_pool].buffer_uploads.len() >= MAX_UPLOADS_PER_POOL {
                if self.flush_saturated_pool().is_err() {
                    return UploadId::INVALID;
                }
            }

            let block_index = match self.next_available_block(1) {
                Some(index) => index,
                None => {
                    if self.flush_saturated_pool().is_err() {
                        return UploadId::INVALID;
                    }
                    match self.next_available_block(1) {
                        Some(index) => index,
                        None => return UploadId::INVALID,
                    }
                }
            };

            let pool = &mut self.pools[self.next_pool];
            let block = &mut pool.heaps[block_index];

            let chunk = (info.data.len() - written).min(block.remaining_capacity());
            let write_offset = block.byte_offset;
            block.buffer.write(&info.data[written..written + chunk], write_offset);
            block.byte_offset += chunk;

            pool.buffer_uploads.push(BufferUploadRecord {
                src: block.buffer.clone(),
                dst: info.dst.clone(),
                copy: BufferCopyInfo {
                    src_offset: write_offset,
                    dst_offset: info.dst_offset + written,
                    size: chunk,
                },
                owning_queue: info.src_queue,
                dst_queue: info.dst_queue,
            });

            written += chunk;
        }

        UploadId(self.cpu_upload_timeline + 1)
    }

    /// Stages `data` for copy into one mip level of `image`. Image data is
    /// never chunked and must fit a single heap block.
    pub fn upload_data_to_image(&mut self, info: ImageDataUploadInfo) -> UploadId {
        let Some(image_info) = info.image.info() else {
            return UploadId::INVALID;
        };
        if info.mip_level >= image_info.mip_levels {
            return UploadId::INVALID;
        }
        if info.data.is_empty() || info.data.len() > HEAP_BLOCK_SIZE {
            return UploadId::INVALID;
        }
        let dimension = image_info.dimension;

        if self.pools[self.next_pool].image_uploads.len() >= MAX_UPLOADS_PER_POOL
            || self.next_available_block(info.data.len()).is_none()
        {
            if self.flush_saturated_pool().is_err() {
                return UploadId::INVALID;
            }
        }

        let Some(block_index) = self.next_available_block(info.data.len()) else {
            return UploadId::INVALID;
        };

        let pool = &mut self.pools[self.next_pool];
        let block = &mut pool.heaps[block_index];

        let write_offset = block.byte_offset;
        block.buffer.write(info.data, write_offset);
        block.byte_offset += info.data.len();

        pool.image_uploads.push(ImageUploadRecord {
            src: block.buffer.clone(),
            dst: info.image.clone(),
            copy: BufferImageCopyInfo {
                buffer_offset: write_offset,
                dst_image_layout: ImageLayout::TransferDst,
                image_subresource: ImageSubresource {
                    aspect_flags: info.aspect_mask,
                    mip_level: info.mip_level,
                    ..Default::default()
                },
                image_offset: Default::default(),
                image_extent: mip_extent(dimension, info.mip_level),
            },
            owning_queue: info.src_queue,
            dst_queue: info.dst_queue,
        });

        UploadId(self.cpu_upload_timeline + 1)
    }

    /// Submits everything staged so far on the transfer queue and rotates to
    /// the next pool. Returns the fence/value pair consumers wait on.
    pub fn send_to_gpu(&mut self) -> FenceValue {
        if self.pools[self.next_pool].has_pending() {
            if let Err(error) = self.upload_to_gpu(false) {
                log::error!("Upload heap flush failed: {}", error);
            }
        }
        self.next_pool = (self.next_pool + 1) % MAX_POOL_IN_QUEUE;
        self.pools[self.next_pool].reset();

        FenceValue {
            fence: self.gpu_upload_timeline.clone(),
            value: self.cpu_upload_timeline,
        }
    }

    /// Forced mid-stream flush when the current pool has no room left. The
    /// GPU is drained before the pool is rewound for reuse.
    fn flush_saturated_pool(&mut self) -> Result<()> {
        self.upload_to_gpu(true)?;
        self.pools[self.next_pool].reset();
        Ok(())
    }

    fn upload_to_gpu(&mut self, wait_idle: bool) -> Result<()> {
        self.cpu_upload_timeline += 1;

        let cmd = self.transfer_queue.next_free_command_buffer()?;

        cmd.reset();
        cmd.begin()?;

        let pool = &self.pools[self.next_pool];
        acquire_buffer_resources(&cmd, &pool.buffer_uploads);

        cmd.pipeline_barrier(&MemoryBarrierInfo {
            src_access: access::TOP_OF_PIPE_NONE,
            dst_access: access::TRANSFER_WRITE,
        });

        acquire_image_resources(&cmd, &pool.image_uploads);

        for record in &pool.buffer_uploads {
            cmd.copy_buffer_to_buffer(&record.src, &record.dst, &record.copy);
        }
        for record in &pool.image_uploads {
            cmd.copy_buffer_to_image(&record.src, &record.dst, &record.copy);
        }

        release_image_resources(&cmd, &pool.image_uploads);
        release_buffer_resources(&cmd, &pool.buffer_uploads);

        cmd.end()?;

        let mut group = self.transfer_queue.new_submission_group();
        group.submit_command_buffer(&cmd);
        group.wait_on_fence(
            &self.gpu_upload_timeline,
            self.previous_signal[self.next_pool],
        );
        group.signal_fence(&self.gpu_upload_timeline, self.cpu_upload_timeline);
        self.transfer_queue.submit(group);
        self.transfer_queue.send_to_gpu();

        self.previous_signal[self.next_pool] = self.cpu_upload_timeline;

        if wait_idle {
            self.device.wait_idle();
        }
        Ok(())
    }

    /// First block from the pool's cursor with at least `size` bytes free,
    /// allocating a fresh block while under the per-pool cap.
    fn next_available_block(&mut self, size: usize) -> Option<usize> {
        let pool_index = self.next_pool;

        let found = {
            let pool = &self.pools[pool_index];
            (pool.current..pool.heaps.len())
                .find(|&index| pool.heaps[index].remaining_capacity() >= size)
        };
        if found.is_some() {
            return found;
        }

        if self.pools[pool_index].heaps.len() >= MAX_UPLOAD_HEAP_BUFFERS_PER_POOL {
            return None;
        }

        let name = format!(
            "upload heap {}:{}",
            pool_index,
            self.pools[pool_index].heaps.len()
        );
        let buffer = Buffer::from(
            &self.device,
            BufferInfo {
                name,
                size: HEAP_BLOCK_SIZE,
                buffer_usage: BufferUsage::TRANSFER_SRC,
                memory_usage: MemoryUsage::CAN_ALIAS | MemoryUsage::HOST_WRITABLE,
                sharing_mode: SharingMode::Exclusive,
            },
        );
        let buffer = match buffer {
            Ok(buffer) => buffer,
            Err(error) => {
                log::error!("Upload heap block allocation failed: {}", error);
                return None;
            }
        };

        let pool = &mut self.pools[pool_index];
        pool.heaps.push(HeapBlock {
            buffer,
            byte_offset: 0,
        });
        Some(pool.heaps.len() - 1)
    }
}

/// Ownership acquisition of destination buffers onto the transfer queue.
/// Concurrently shared resources need no transfer.
fn acquire_buffer_resources(cmd: &Handle<CommandBuffer>, records: &[BufferUploadRecord]) {
    for record in records {
        let concurrent = record
            .dst
            .info()
            .map_or(false, |info| info.sharing_mode == SharingMode::Concurrent);
        if concurrent {
            continue;
        }
        if record.owning_queue != DeviceQueue::Transfer && record.owning_queue != DeviceQueue::None
        {
            cmd.pipeline_buffer_barrier(
                &record.dst,
                &BufferBarrierInfo {
                    size: record.copy.size,
                    offset: record.copy.dst_offset,
                    dst_access: access::TOP_OF_PIPE_NONE,
                    src_queue: record.owning_queue,
                    dst_queue: DeviceQueue::Transfer,
                    ..Default::default()
                },
            );
        }
    }
}

fn acquire_image_resources(cmd: &Handle<CommandBuffer>, records: &[ImageUploadRecord]) {
    for record in records {
        let concurrent = record
            .dst
            .info()
            .map_or(false, |info| info.sharing_mode == SharingMode::Concurrent);
        if concurrent {
            continue;
        }
        if record.owning_queue != DeviceQueue::Transfer && record.owning_queue != DeviceQueue::None
        {
            cmd.pipeline_image_barrier(
                &record.dst,
                &ImageBarrierInfo {
                    dst_access: access::TRANSFER_WRITE,
                    new_layout: ImageLayout::TransferDst,
                    subresource: record.copy.image_subresource,
                    src_queue: record.owning_queue,
                    dst_queue: DeviceQueue::Transfer,
                    ..Default::default()
                },
            );
        } else {
            cmd.pipeline_image_barrier(
                &record.dst,
                &ImageBarrierInfo {
                    dst_access: access::TRANSFER_WRITE,
                    old_layout: ImageLayout::Undefined,
                    new_layout: ImageLayout::TransferDst,
                    subresource: record.copy.image_subresource,
                    src_queue: DeviceQueue::None,
                    dst_queue: DeviceQueue::None,
                    ..Default::default()
                },
            );
        }
    }
}

/// Ownership release of uploaded images to their consuming queues. The
/// layout stays `TransferDst`; the consumer transitions further as part of
/// its own acquire.
fn release_image_resources(cmd: &Handle<CommandBuffer>, records: &[ImageUploadRecord]) {
    for record in records {
        let concurrent = record
            .dst
            .info()
            .map_or(false, |info| info.sharing_mode == SharingMode::Concurrent);
        if concurrent {
            continue;
        }
        cmd.pipeline_image_barrier(
            &record.dst,
            &ImageBarrierInfo {
                src_access: access::TRANSFER_WRITE,
                old_layout: ImageLayout::TransferDst,
                new_layout: ImageLayout::TransferDst,
                subresource: record.copy.image_subresource,
                src_queue: DeviceQueue::Transfer,
                dst_queue: record.dst_queue,
                ..Default::default()
            },
        );
    }
}

fn release_buffer_resources(cmd: &Handle<CommandBuffer>, records: &[BufferUploadRecord]) {
    for record in records {
        let concurrent = record
            .dst
            .info()
            .map_or(false, |info| info.sharing_mode == SharingMode::Concurrent);
        if concurrent {
            continue;
        }
        cmd.pipeline_buffer_barrier(
            &record.dst,
            &BufferBarrierInfo {
                size: record.copy.size,
                offset: record.copy.dst_offset,
                src_access: access::TRANSFER_WRITE,
                src_queue: DeviceQueue::Transfer,
                dst_queue: record.dst_queue,
                ..Default::default()
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_upload_id_never_compares_complete() {
        assert!(!UploadId::INVALID.valid());
        assert!(UploadId(1).valid());
        assert!(UploadId(1) < UploadId(2));
    }

    #[test]
    fn mip_extents_halve_and_clamp() {
        let base = Extent3D {
            width: 256,
            height: 256,
            depth: 1,
        };
        assert_eq!(mip_extent(base, 0).width, 256);
        assert_eq!(mip_extent(base, 1).width, 128);
        assert_eq!(mip_extent(base, 8).width, 1);
        // Never collapses below a single texel.
        assert_eq!(mip_extent(base, 12).width, 1);
        assert_eq!(mip_extent(base, 12).height, 1);
        assert_eq!(mip_extent(base, 3).depth, 1);
    }
}
