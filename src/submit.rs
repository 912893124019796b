/*! Submission batching and the per-thread command queue façade.
 *
 * A [`SubmissionGroup`] collects command buffers with their wait/signal
 * semaphores and timeline fence values. Groups queue up per device queue in
 * a [`SubmissionQueue`] and flush to the GPU in insertion order, one device
 * submit per group.
 *
 * [`CommandQueue`] fronts one device queue with a command pool per calling
 * thread, so recording never contends across threads.
 */

use std::{
    collections::HashMap,
    sync::Arc,
    thread::ThreadId,
};

use anyhow::Result;
use parking_lot::Mutex;

use crate::{
    command::{CommandBuffer, CommandBufferState, CommandPool, CommandPoolInfo},
    device::{Device, SubmitInfo},
    handle::Handle,
    sync::{Fence, Semaphore},
    types::DeviceQueue,
};

pub const MAX_SUBMISSION_GROUPS: usize = 8;
pub const MAX_COMMAND_BUFFERS_PER_GROUP: usize = 16;
pub const MAX_FENCES_PER_GROUP_HALF: usize = 8;
pub const MAX_SEMAPHORES_PER_GROUP_HALF: usize = 8;

/// One batch of work for a single device queue. Capacities are fixed;
/// exceeding them is a caller bug and debug-asserted.
pub struct SubmissionGroup {
    queue: DeviceQueue,
    command_buffers: Vec<Handle<CommandBuffer>>,
    wait_semaphores: Vec<Handle<Semaphore>>,
    signal_semaphores: Vec<Handle<Semaphore>>,
    wait_fences: Vec<(Handle<Fence>, u64)>,
    signal_fences: Vec<(Handle<Fence>, u64)>,
}

impl SubmissionGroup {
    pub fn new(queue: DeviceQueue) -> Self {
        Self {
            queue,
            command_buffers: Vec::with_capacity(MAX_COMMAND_BUFFERS_PER_GROUP),
            wait_semaphores: Vec::with_capacity(MAX_SEMAPHORES_PER_GROUP_HALF),
            signal_semaphores: Vec::with_capacity(MAX_SEMAPHORES_PER_GROUP_HALF),
            wait_fences: Vec::with_capacity(MAX_FENCES_PER_GROUP_HALF),
            signal_fences: Vec::with_capacity(MAX_FENCES_PER_GROUP_HALF),
        }
    }

    pub fn queue(&self) -> DeviceQueue {
        self.queue
    }

    pub fn is_empty(&self) -> bool {
        self.command_buffers.is_empty()
    }

    pub fn num_command_buffers(&self) -> usize {
        self.command_buffers.len()
    }

    /// Only executable command buffers are accepted; anything else is
    /// silently skipped, matching the device's own submit contract.
    pub fn submit_command_buffer(&mut self, command_buffer: &Handle<CommandBuffer>) {
        if !command_buffer.valid() || command_buffer.state() != CommandBufferState::Executable {
            return;
        }
        debug_assert!(
            self.command_buffers.len() < MAX_COMMAND_BUFFERS_PER_GROUP,
            "submission group command buffer capacity exceeded"
        );
        if self.command_buffers.len() < MAX_COMMAND_BUFFERS_PER_GROUP {
            self.command_buffers.push(command_buffer.clone());
        }
    }

    pub fn signal_fence(&mut self, fence: &Handle<Fence>, value: u64) {
        if !fence.valid() {
            return;
        }
        debug_assert!(
            self.signal_fences.len() < MAX_FENCES_PER_GROUP_HALF,
            "submission group signal fence capacity exceeded"
        );
        if self.signal_fences.len() < MAX_FENCES_PER_GROUP_HALF {
            self.signal_fences.push((fence.clone(), value));
        }
    }

    pub fn wait_on_fence(&mut self, fence: &Handle<Fence>, value: u64) {
        if !fence.valid() {
            return;
        }
        debug_assert!(
            self.wait_fences.len() < MAX_FENCES_PER_GROUP_HALF,
            "submission group wait fence capacity exceeded"
        );
        if self.wait_fences.len() < MAX_FENCES_PER_GROUP_HALF {
            self.wait_fences.push((fence.clone(), value));
        }
    }

    pub fn signal_semaphore(&mut self, semaphore: &Handle<Semaphore>) {
        if !semaphore.valid() {
            return;
        }
        debug_assert!(
            self.signal_semaphores.len() < MAX_SEMAPHORES_PER_GROUP_HALF,
            "submission group signal semaphore capacity exceeded"
        );
        if self.signal_semaphores.len() < MAX_SEMAPHORES_PER_GROUP_HALF {
            self.signal_semaphores.push(semaphore.clone());
        }
    }

    pub fn wait_on_semaphore(&mut self, semaphore: &Handle<Semaphore>) {
        if !semaphore.valid() {
            return;
        }
        debug_assert!(
            self.wait_semaphores.len() < MAX_SEMAPHORES_PER_GROUP_HALF,
            "submission group wait semaphore capacity exceeded"
        );
        if self.wait_semaphores.len() < MAX_SEMAPHORES_PER_GROUP_HALF {
            self.wait_semaphores.push(semaphore.clone());
        }
    }
}

/// Pending submission groups for the main, transfer and compute queues.
pub struct SubmissionQueue {
    device: Device,
    main: Vec<SubmissionGroup>,
    transfer: Vec<SubmissionGroup>,
    compute: Vec<SubmissionGroup>,
}

impl SubmissionQueue {
    pub fn new(device: Device) -> Self {
        Self {
            device,
            main: Vec::with_capacity(MAX_SUBMISSION_GROUPS),
            transfer: Vec::with_capacity(MAX_SUBMISSION_GROUPS),
            compute: Vec::with_capacity(MAX_SUBMISSION_GROUPS),
        }
    }

    pub fn new_submission_group(queue: DeviceQueue) -> SubmissionGroup {
        SubmissionGroup::new(queue)
    }

    fn groups_mut(&mut self, queue: DeviceQueue) -> &mut Vec<SubmissionGroup> {
        match queue {
            DeviceQueue::Transfer => &mut self.transfer,
            DeviceQueue::Compute => &mut self.compute,
            _ => &mut self.main,
        }
    }

    /// Registers a filled group. When the queue already holds the maximum
    /// number of groups, the pending groups flush to the GPU first.
    pub fn enqueue(&mut self, group: SubmissionGroup) {
        let queue = group.queue();
        if self.groups_mut(queue).len() >= MAX_SUBMISSION_GROUPS {
            self.send_to_gpu_queue(queue);
        }
        self.groups_mut(queue).push(group);
    }

    /// Flushes the transfer queue first, then main, then compute.
    pub fn send_to_gpu(&mut self) {
        self.send_to_gpu_queue(DeviceQueue::Transfer);
        self.send_to_gpu_queue(DeviceQueue::Main);
        self.send_to_gpu_queue(DeviceQueue::Compute);
    }

    /// Issues one device submit per non-empty group, in insertion order.
    pub fn send_to_gpu_queue(&mut self, queue: DeviceQueue) {
        let device = self.device.clone();
        let groups = std::mem::take(self.groups_mut(queue));
        for group in &groups {
            if group.is_empty() {
                continue;
            }
            device.submit(&SubmitInfo {
                queue: group.queue,
                command_buffers: &group.command_buffers,
                wait_semaphores: &group.wait_semaphores,
                signal_semaphores: &group.signal_semaphores,
                wait_fences: &group.wait_fences,
                signal_fences: &group.signal_fences,
            });
        }
    }

    /// Drops all pending groups without submitting.
    pub fn clear(&mut self) {
        self.main.clear();
        self.transfer.clear();
        self.compute.clear();
    }
}

/// Per-thread command buffer dispenser for one device queue.
pub struct CommandQueue {
    device: Device,
    queue: DeviceQueue,
    submission_queue: Arc<Mutex<SubmissionQueue>>,
    pools: Mutex<HashMap<ThreadId, Handle<CommandPool>>>,
}

impl CommandQueue {
    pub fn new(
        device: Device,
        queue: DeviceQueue,
        submission_queue: Arc<Mutex<SubmissionQueue>>,
    ) -> Self {
        Self {
            device,
            queue,
            submission_queue,
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub fn queue(&self) -> DeviceQueue {
        self.queue
    }

    pub fn submission_queue(&self) -> &Arc<Mutex<SubmissionQueue>> {
        &self.submission_queue
    }

    /// Hands out the next free command buffer from the calling thread's
    /// pool, creating the pool on first use.
    pub fn next_free_command_buffer(&self) -> Result<Handle<CommandBuffer>> {
        let tid = std::thread::current().id();

        let pool = {
            let mut pools = self.pools.lock();
            if let Some(pool) = pools.get(&tid) {
                pool.clone()
            } else {
                let queue_name = match self.queue {
                    DeviceQueue::Transfer => "transfer",
                    DeviceQueue::Compute => "compute",
                    _ => "main",
                };
                let pool = CommandPool::from(
                    &self.device,
                    CommandPoolInfo {
                        name: format!("type={}, tid={:?}", queue_name, tid),
                        queue: self.queue,
                    },
                )?;
                pools.insert(tid, pool.clone());
                pool
            }
        };

        CommandBuffer::from(&pool)
    }

    pub fn new_submission_group(&self) -> SubmissionGroup {
        SubmissionGroup::new(self.queue)
    }

    /// Registers a filled group with the shared submission queue.
    pub fn submit(&self, group: SubmissionGroup) {
        self.submission_queue.lock().enqueue(group);
    }

    /// Flushes this queue's pending submission groups.
    pub fn send_to_gpu(&self) {
        self.submission_queue.lock().send_to_gpu_queue(self.queue);
    }

    /// Drops every per-thread command pool. Outstanding command buffer
    /// handles must be released first.
    pub fn terminate(&self) {
        self.pools.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles_are_skipped() {
        let mut group = SubmissionGroup::new(DeviceQueue::Main);
        group.submit_command_buffer(&Handle::null());
        group.signal_fence(&Handle::null(), 1);
        group.wait_on_fence(&Handle::null(), 1);
        group.signal_semaphore(&Handle::null());
        group.wait_on_semaphore(&Handle::null());

        assert!(group.is_empty());
        assert_eq!(group.num_command_buffers(), 0);
        assert_eq!(group.queue(), DeviceQueue::Main);
    }
}
