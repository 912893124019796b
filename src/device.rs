/*! Device initialization, queue ownership, submission, presentation and
 * deferred resource destruction.
 *
 * The [`Device`] value is a cheap clone over one shared state. The shared
 * state owns the Vulkan instance, logical device, allocator, queues, the
 * bindless descriptor cache and every resource pool. Resources reference it
 * weakly, so dropping the last [`Device`] clone tears everything down after
 * a final `vkDeviceWaitIdle`.
 */

use std::{
    collections::VecDeque,
    ffi::{c_void, CStr, CString},
    mem::ManuallyDrop,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use anyhow::{Context, Result};
use ash::{ext::debug_utils, khr, vk};
use gpu_allocator::{
    vulkan::{Allocator, AllocatorCreateDesc},
    AllocationSizes, AllocatorDebugSettings,
};
use parking_lot::Mutex;

use crate::{
    buffer::Buffer,
    command::{CommandBuffer, CommandBufferState, CommandPool},
    descriptor::DescriptorCache,
    handle::Handle,
    image::Image,
    pipeline::Pipeline,
    pool::{Pool, PoolIndex},
    sampler::Sampler,
    shader::Shader,
    swapchain::Swapchain,
    sync::{Fence, Semaphore},
    types::{DeviceQueue, DeviceType, ErrorSeverity, Version},
    MAX_BUFFERS, MAX_IMAGES, MAX_SAMPLERS,
};

pub type DebugCallback = dyn Fn(ErrorSeverity, &str) + Send + Sync + 'static;

#[derive(Clone, Copy, Debug)]
pub struct DeviceConfig {
    pub max_frames_in_flight: u32,
    pub swapchain_image_count: u32,
    pub max_buffers: u32,
    pub max_images: u32,
    pub max_samplers: u32,
    /// `u32::MAX` means "whatever the device limit is".
    pub push_constant_max_size: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: 2,
            swapchain_image_count: 3,
            max_buffers: MAX_BUFFERS,
            max_images: MAX_IMAGES,
            max_samplers: MAX_SAMPLERS,
            push_constant_max_size: u32::MAX,
        }
    }
}

pub struct DeviceInitInfo {
    pub name: String,
    pub app_name: String,
    pub app_version: Version,
    pub engine_name: String,
    pub engine_version: Version,
    pub preferred_device: DeviceType,
    pub config: DeviceConfig,
    /// Validation layer feature toggle.
    pub validation: bool,
    /// Forwarded from the validation layer messenger, should the feature be
    /// enabled.
    pub callback: Option<Box<DebugCallback>>,
}

impl Default for DeviceInitInfo {
    fn default() -> Self {
        Self {
            name: String::from("device"),
            app_name: String::from("sable"),
            app_version: Version::new(0, 1, 0),
            engine_name: String::from("sable"),
            engine_version: Version::new(0, 1, 0),
            preferred_device: DeviceType::DiscreteGpu,
            config: DeviceConfig::default(),
            validation: false,
            callback: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct DeviceInfo {
    pub name: String,
    pub ty: DeviceType,
    pub vendor_id: u32,
    pub device_id: u32,
    pub device_name: String,
    pub api_version: Version,
    pub driver_version: Version,
}

pub struct SubmitInfo<'a> {
    pub queue: DeviceQueue,
    pub command_buffers: &'a [Handle<CommandBuffer>],
    pub wait_semaphores: &'a [Handle<Semaphore>],
    pub signal_semaphores: &'a [Handle<Semaphore>],
    pub wait_fences: &'a [(Handle<Fence>, u64)],
    pub signal_fences: &'a [(Handle<Fence>, u64)],
}

pub struct PresentInfo<'a> {
    pub swapchains: &'a [Handle<Swapchain>],
}

#[derive(Clone, Copy)]
pub(crate) struct Queue {
    pub(crate) raw: vk::Queue,
    pub(crate) family_index: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ResourceKind {
    Semaphore,
    Fence,
    Buffer,
    Image,
    Sampler,
    Swapchain,
    Shader,
    Pipeline,
    CommandPool,
}

pub(crate) struct Zombie {
    pub(crate) timeline: u64,
    pub(crate) id: u64,
    pub(crate) kind: ResourceKind,
}

#[derive(Default)]
pub(crate) struct ResourcePools {
    pub(crate) semaphores: Pool<Semaphore>,
    pub(crate) fences: Pool<Fence>,
    pub(crate) buffers: Pool<Buffer>,
    pub(crate) images: Pool<Image>,
    pub(crate) samplers: Pool<Sampler>,
    pub(crate) sampler_cache: Mutex<std::collections::HashMap<u64, u64>>,
    pub(crate) swapchains: Pool<Swapchain>,
    pub(crate) shaders: Pool<Shader>,
    pub(crate) pipelines: Pool<Pipeline>,
    pub(crate) command_pools: Pool<CommandPool>,
}

struct DebugUserData {
    callback: Option<Box<DebugCallback>>,
}

struct DebugMessenger {
    instance: debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
    // Pointed to by the messenger's user data; heap address is stable.
    _user_data: Box<DebugUserData>,
}

pub(crate) struct DeviceShared {
    // vkQueue* calls require external synchronization on the queue.
    pub(crate) submit_lock: Mutex<()>,
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,
    pub(crate) descriptor_cache: ManuallyDrop<DescriptorCache>,
    pub(crate) resources: ResourcePools,
    pub(crate) zombies: Mutex<VecDeque<Zombie>>,
    pub(crate) cpu_timeline: AtomicU64,
    gpu_timeline_semaphore: vk::Semaphore,
    pub(crate) main_queue: Queue,
    pub(crate) transfer_queue: Queue,
    pub(crate) compute_queue: Queue,
    pub(crate) raw: ash::Device,
    pub(crate) debug_utils_device: Option<debug_utils::Device>,
    pub(crate) gpu: vk::PhysicalDevice,
    _properties: vk::PhysicalDeviceProperties,
    info: DeviceInfo,
    config: DeviceConfig,
    debug: Option<DebugMessenger>,
    pub(crate) instance: ash::Instance,
    pub(crate) entry: ash::Entry,
}

// Dispatchable Vulkan handles (physical device, queues) are raw pointers;
// queue access is serialized through `submit_lock` and everything else is
// internally synchronized.
unsafe impl Send for DeviceShared {}
unsafe impl Sync for DeviceShared {}

/// Logical GPU device. Cloning shares the same underlying device.
#[derive(Clone)]
pub struct Device {
    pub(crate) shared: Arc<DeviceShared>,
}

impl Device {
    pub fn from(init: DeviceInitInfo) -> Result<Self> {
        let entry = unsafe { ash::Entry::load()? };

        let instance = create_instance(&entry, &init)?;
        let debug = if init.validation {
            Some(create_debug_messenger(&entry, &instance, init.callback)?)
        } else {
            None
        };

        let (gpu, properties) = choose_physical_device(&instance, init.preferred_device)?;
        let family_indices = select_queue_family_indices(&instance, gpu);

        let raw = create_logical_device(&instance, gpu, &family_indices)?;

        let main_queue = Queue {
            raw: unsafe { raw.get_device_queue(family_indices.main, 0) },
            family_index: family_indices.main,
        };
        let transfer_queue = Queue {
            raw: unsafe { raw.get_device_queue(family_indices.transfer, 0) },
            family_index: family_indices.transfer,
        };
        let compute_queue = Queue {
            raw: unsafe { raw.get_device_queue(family_indices.compute, 0) },
            family_index: family_indices.compute,
        };

        let mut allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: raw.clone(),
            physical_device: gpu,
            debug_settings: AllocatorDebugSettings {
                log_leaks_on_shutdown: true,
                ..Default::default()
            },
            buffer_device_address: true,
            allocation_sizes: AllocationSizes::default(),
        })?;

        let mut config = init.config;
        config.push_constant_max_size = config
            .push_constant_max_size
            .min(properties.limits.max_push_constants_size);

        let descriptor_cache = DescriptorCache::new(&raw, &mut allocator, &config)?;

        let mut timeline_type_info = vk::SemaphoreTypeCreateInfo::default()
            .semaphore_type(vk::SemaphoreType::TIMELINE)
            .initial_value(0);
        let timeline_info = vk::SemaphoreCreateInfo::default().push_next(&mut timeline_type_info);
        let gpu_timeline_semaphore = unsafe { raw.create_semaphore(&timeline_info, None)? };

        let debug_utils_device = debug
            .is_some()
            .then(|| debug_utils::Device::new(&instance, &raw));

        let device_name = unsafe {
            CStr::from_ptr(properties.device_name.as_ptr())
                .to_str()
                .unwrap_or("unknown")
                .to_owned()
        };
        log::info!("Physical device name: {}", device_name);

        let info = DeviceInfo {
            name: init.name,
            ty: device_type_from_vk(properties.device_type),
            vendor_id: properties.vendor_id,
            device_id: properties.device_id,
            device_name,
            api_version: Version::new(
                vk::api_version_major(properties.api_version),
                vk::api_version_minor(properties.api_version),
                vk::api_version_patch(properties.api_version),
            ),
            driver_version: Version::new(
                vk::api_version_major(properties.driver_version),
                vk::api_version_minor(properties.driver_version),
                vk::api_version_patch(properties.driver_version),
            ),
        };

        let shared = Arc::new(DeviceShared {
            submit_lock: Mutex::new(()),
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            descriptor_cache: ManuallyDrop::new(descriptor_cache),
            resources: ResourcePools::default(),
            zombies: Mutex::new(VecDeque::new()),
            cpu_timeline: AtomicU64::new(0),
            gpu_timeline_semaphore,
            main_queue,
            transfer_queue,
            compute_queue,
            raw,
            debug_utils_device,
            gpu,
            _properties: properties,
            info,
            config,
            debug,
            instance,
            entry,
        });

        Ok(Self { shared })
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.shared.info
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.shared.config
    }

    pub fn wait_idle(&self) {
        unsafe {
            if let Err(error) = self.shared.raw.device_wait_idle() {
                log::error!("vkDeviceWaitIdle failed: {}", error);
            }
        }
    }

    /// Value of the host-side timeline. Advances on every command buffer
    /// `begin`.
    pub fn cpu_timeline(&self) -> u64 {
        self.shared.cpu_timeline.load(Ordering::Acquire)
    }

    /// Value of the device-owned timeline fence. Lags [`Self::cpu_timeline`]
    /// by however much work the GPU has not retired yet.
    pub fn gpu_timeline(&self) -> u64 {
        self.shared.gpu_timeline()
    }

    /// Submits command buffers with their wait/signal semaphores and
    /// timeline fence values in one batch. Returns `false` when the queue is
    /// invalid, a command buffer is not executable, or the device was lost.
    pub fn submit(&self, info: &SubmitInfo) -> bool {
        let shared = &self.shared;

        let Some(queue) = shared.queue(info.queue) else {
            log::error!("Submission rejected: no such device queue {:?}", info.queue);
            return false;
        };

        for command_buffer in info.command_buffers {
            if !command_buffer.valid()
                || command_buffer.state() != CommandBufferState::Executable
            {
                log::error!("Submission rejected: command buffer is not executable");
                return false;
            }
        }

        let mut wait_infos = Vec::with_capacity(info.wait_semaphores.len() + info.wait_fences.len());
        for semaphore in info.wait_semaphores {
            let Some(raw) = semaphore.get().map(|s| s.raw) else {
                continue;
            };
            wait_infos.push(
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(raw)
                    .stage_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT),
            );
        }
        for (fence, value) in info.wait_fences {
            let Some(raw) = fence.get().map(|f| f.raw) else {
                continue;
            };
            wait_infos.push(
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(raw)
                    .value(*value)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
            );
        }

        let mut signal_infos =
            Vec::with_capacity(info.signal_semaphores.len() + info.signal_fences.len() + 1);
        for semaphore in info.signal_semaphores {
            let Some(raw) = semaphore.get().map(|s| s.raw) else {
                continue;
            };
            signal_infos.push(
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(raw)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
            );
        }
        for (fence, value) in info.signal_fences {
            let Some(raw) = fence.get().map(|f| f.raw) else {
                continue;
            };
            signal_infos.push(
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(raw)
                    .value(*value)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
            );
        }
        // The device timeline trails every submission; zombie reclamation and
        // command buffer reuse key off this value.
        signal_infos.push(
            vk::SemaphoreSubmitInfo::default()
                .semaphore(shared.gpu_timeline_semaphore)
                .value(shared.cpu_timeline.load(Ordering::Acquire))
                .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS),
        );

        let command_buffer_infos = info
            .command_buffers
            .iter()
            .filter_map(|command_buffer| command_buffer.get())
            .map(|command_buffer| {
                vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer.raw)
            })
            .collect::<Vec<_>>();

        let submit_info = vk::SubmitInfo2::default()
            .wait_semaphore_infos(&wait_infos)
            .signal_semaphore_infos(&signal_infos)
            .command_buffer_infos(&command_buffer_infos);

        let result = {
            let _queue_guard = shared.submit_lock.lock();
            unsafe {
                shared.raw.queue_submit2(
                    queue.raw,
                    std::slice::from_ref(&submit_info),
                    vk::Fence::null(),
                )
            }
        };
        if let Err(error) = result {
            log::error!("vkQueueSubmit2 failed: {}", error);
            return false;
        }
        true
    }

    /// Presents each swapchain on the main queue. Returns `false` when any
    /// swapchain came back suboptimal or in error; the caller decides whether
    /// to recreate.
    pub fn present(&self, info: &PresentInfo) -> bool {
        let mut all_ok = true;
        for swapchain in info.swapchains {
            all_ok &= crate::swapchain::present(self, swapchain);
        }
        all_ok
    }

    /// Destroys every resource whose deferred-destruction timeline has been
    /// reached by the GPU. Should be called once per frame.
    pub fn clear_garbage(&self) {
        let gpu_timeline = self.gpu_timeline();

        let drained = {
            let mut zombies = self.shared.zombies.lock();
            let mut drained = Vec::new();
            // Zombies are pushed with monotonically non-decreasing timelines.
            while zombies
                .front()
                .map_or(false, |zombie| zombie.timeline <= gpu_timeline)
            {
                drained.push(zombies.pop_front().unwrap());
            }
            drained
        };

        for zombie in drained {
            self.shared.destroy_zombie(zombie);
        }
    }
}

impl DeviceShared {
    pub(crate) fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub(crate) fn queue(&self, queue: DeviceQueue) -> Option<&Queue> {
        match queue {
            DeviceQueue::None => None,
            DeviceQueue::Main => Some(&self.main_queue),
            DeviceQueue::Transfer => Some(&self.transfer_queue),
            DeviceQueue::Compute => Some(&self.compute_queue),
        }
    }

    pub(crate) fn queue_family_index(&self, queue: DeviceQueue) -> u32 {
        self.queue(queue)
            .map_or(vk::QUEUE_FAMILY_IGNORED, |queue| queue.family_index)
    }

    pub(crate) fn gpu_timeline(&self) -> u64 {
        unsafe {
            self.raw
                .get_semaphore_counter_value(self.gpu_timeline_semaphore)
                .unwrap_or(0)
        }
    }

    /// Queues a resource for destruction once the GPU timeline reaches the
    /// CPU timeline observed now.
    pub(crate) fn schedule_zombie(&self, id: u64, kind: ResourceKind) {
        let timeline = self.cpu_timeline.load(Ordering::Acquire);
        self.zombies.lock().push_back(Zombie {
            timeline,
            id,
            kind,
        });
    }

    pub(crate) fn set_debug_name<H: vk::Handle>(&self, object: H, name: &str) {
        let Some(debug_utils_device) = &self.debug_utils_device else {
            return;
        };
        if name.is_empty() {
            return;
        }
        let Ok(name) = CString::new(name) else {
            return;
        };
        let name_info = vk::DebugUtilsObjectNameInfoEXT::default()
            .object_handle(object)
            .object_name(&name);
        let _ = unsafe { debug_utils_device.set_debug_utils_object_name(&name_info) };
    }

    fn destroy_zombie(&self, zombie: Zombie) {
        let index = PoolIndex::from_u64(zombie.id);
        match zombie.kind {
            ResourceKind::Semaphore => {
                if let Some(semaphore) = self.resources.semaphores.remove(index) {
                    unsafe { self.raw.destroy_semaphore(semaphore.raw, None) };
                }
            }
            ResourceKind::Fence => {
                if let Some(fence) = self.resources.fences.remove(index) {
                    unsafe { self.raw.destroy_semaphore(fence.raw, None) };
                }
            }
            ResourceKind::Buffer => {
                if let Some(buffer) = self.resources.buffers.remove(index) {
                    self.destroy_buffer_resources(buffer);
                }
            }
            ResourceKind::Image => {
                if let Some(image) = self.resources.images.remove(index) {
                    self.destroy_image_resources(image);
                }
            }
            ResourceKind::Sampler => {
                // A cache hit may have revived the sampler after its last
                // handle dropped; the cache lock covers both the refcount
                // check and the removal so revival cannot race destruction.
                let mut cache = self.resources.sampler_cache.lock();
                let revived = self
                    .resources
                    .samplers
                    .get(index)
                    .map_or(false, |sampler| unsafe {
                        crate::handle::DeviceResource::refs(sampler.as_ref()).count() > 0
                    });
                if revived {
                    return;
                }
                if let Some(sampler) = self.resources.samplers.remove(index) {
                    cache.remove(&sampler.packed);
                    unsafe { self.raw.destroy_sampler(sampler.raw, None) };
                }
            }
            ResourceKind::Swapchain => {
                if let Some(swapchain) = self.resources.swapchains.remove(index) {
                    crate::swapchain::destroy_resources(self, swapchain);
                }
            }
            ResourceKind::Shader => {
                if let Some(shader) = self.resources.shaders.remove(index) {
                    unsafe { self.raw.destroy_shader_module(shader.raw, None) };
                }
            }
            ResourceKind::Pipeline => {
                if let Some(pipeline) = self.resources.pipelines.remove(index) {
                    unsafe { self.raw.destroy_pipeline(pipeline.raw, None) };
                }
            }
            ResourceKind::CommandPool => {
                if let Some(command_pool) = self.resources.command_pools.remove(index) {
                    unsafe { self.raw.destroy_command_pool(command_pool.raw, None) };
                }
            }
        }
    }

    pub(crate) fn destroy_buffer_resources(&self, mut buffer: Buffer) {
        unsafe { self.raw.destroy_buffer(buffer.raw, None) };
        if let Some(allocation) = buffer.allocation.take() {
            let _ = self.allocator.lock().free(allocation);
        }
    }

    pub(crate) fn destroy_image_resources(&self, mut image: Image) {
        unsafe {
            self.raw.destroy_image_view(image.view, None);
            // Swapchain images are owned by the driver; only the view is ours.
            if !image.swapchain_owned {
                self.raw.destroy_image(image.raw, None);
            }
        }
        if let Some(allocation) = image.allocation.take() {
            let _ = self.allocator.lock().free(allocation);
        }
    }
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        unsafe {
            let _ = self.raw.device_wait_idle();
        }

        // Flush every pending zombie, then whatever still lives in the pools.
        let zombies = std::mem::take(&mut *self.zombies.lock());
        for zombie in zombies {
            self.destroy_zombie(zombie);
        }

        for command_pool in self.resources.command_pools.drain() {
            unsafe { self.raw.destroy_command_pool(command_pool.raw, None) };
        }
        for pipeline in self.resources.pipelines.drain() {
            unsafe { self.raw.destroy_pipeline(pipeline.raw, None) };
        }
        for shader in self.resources.shaders.drain() {
            unsafe { self.raw.destroy_shader_module(shader.raw, None) };
        }
        for swapchain in self.resources.swapchains.drain() {
            crate::swapchain::destroy_resources(self, swapchain);
        }
        for sampler in self.resources.samplers.drain() {
            unsafe { self.raw.destroy_sampler(sampler.raw, None) };
        }
        for image in self.resources.images.drain() {
            self.destroy_image_resources(image);
        }
        for buffer in self.resources.buffers.drain() {
            self.destroy_buffer_resources(buffer);
        }
        for fence in self.resources.fences.drain() {
            unsafe { self.raw.destroy_semaphore(fence.raw, None) };
        }
        for semaphore in self.resources.semaphores.drain() {
            unsafe { self.raw.destroy_semaphore(semaphore.raw, None) };
        }

        unsafe {
            let mut descriptor_cache = ManuallyDrop::take(&mut self.descriptor_cache);
            descriptor_cache.destroy(&self.raw, &mut self.allocator.lock());

            self.raw.destroy_semaphore(self.gpu_timeline_semaphore, None);

            ManuallyDrop::drop(&mut self.allocator);
            self.raw.destroy_device(None);

            if let Some(debug) = self.debug.take() {
                debug
                    .instance
                    .destroy_debug_utils_messenger(debug.messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        log::trace!("Logical device dropped");
    }
}

pub(crate) fn downgrade(device: &Device) -> Weak<DeviceShared> {
    Arc::downgrade(&device.shared)
}

fn device_type_from_vk(ty: vk::PhysicalDeviceType) -> DeviceType {
    match ty {
        vk::PhysicalDeviceType::INTEGRATED_GPU => DeviceType::IntegratedGpu,
        vk::PhysicalDeviceType::DISCRETE_GPU => DeviceType::DiscreteGpu,
        vk::PhysicalDeviceType::VIRTUAL_GPU => DeviceType::VirtualGpu,
        vk::PhysicalDeviceType::CPU => DeviceType::Cpu,
        _ => DeviceType::Other,
    }
}

fn device_type_to_vk(ty: DeviceType) -> vk::PhysicalDeviceType {
    match ty {
        DeviceType::IntegratedGpu => vk::PhysicalDeviceType::INTEGRATED_GPU,
        DeviceType::DiscreteGpu => vk::PhysicalDeviceType::DISCRETE_GPU,
        DeviceType::VirtualGpu => vk::PhysicalDeviceType::VIRTUAL_GPU,
        DeviceType::Cpu => vk::PhysicalDeviceType::CPU,
        DeviceType::Other => vk::PhysicalDeviceType::OTHER,
    }
}

fn create_instance(entry: &ash::Entry, init: &DeviceInitInfo) -> Result<ash::Instance> {
    let app_name = CString::new(init.app_name.as_str())?;
    let engine_name = CString::new(init.engine_name.as_str())?;
    let app_info = vk::ApplicationInfo::default()
        .application_name(app_name.as_c_str())
        .application_version(vk::make_api_version(
            0,
            init.app_version.major,
            init.app_version.minor,
            init.app_version.patch,
        ))
        .engine_name(engine_name.as_c_str())
        .engine_version(vk::make_api_version(
            0,
            init.engine_version.major,
            init.engine_version.minor,
            init.engine_version.patch,
        ))
        .api_version(vk::API_VERSION_1_3);

    let available = unsafe { entry.enumerate_instance_extension_properties(None)? };
    let is_available = |name: &CStr| {
        available.iter().any(|properties| {
            unsafe { CStr::from_ptr(properties.extension_name.as_ptr()) == name }
        })
    };

    // Surface support for whichever window systems the loader knows about.
    let mut extension_names = vec![khr::surface::NAME.as_ptr()];
    for platform_extension in [
        khr::win32_surface::NAME,
        khr::xlib_surface::NAME,
        khr::xcb_surface::NAME,
        khr::wayland_surface::NAME,
        ash::ext::metal_surface::NAME,
    ] {
        if is_available(platform_extension) {
            extension_names.push(platform_extension.as_ptr());
        }
    }
    if init.validation {
        extension_names.push(debug_utils::NAME.as_ptr());
    }

    let layer_strings = if init.validation {
        vec![CString::new("VK_LAYER_KHRONOS_validation").unwrap()]
    } else {
        Vec::new()
    };
    let layer_names = layer_strings
        .iter()
        .map(|layer| layer.as_ptr())
        .collect::<Vec<_>>();

    let instance_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names);

    let instance = unsafe {
        entry
            .create_instance(&instance_info, None)
            .with_context(|| "Failed to create the Vulkan instance")?
    };
    Ok(instance)
}

unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    p_user_data: *mut c_void,
) -> vk::Bool32 {
    let types = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "[General]",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "[Performance]",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "[Validation]",
        _ => "[Unknown]",
    };
    let message = CStr::from_ptr((*p_callback_data).p_message)
        .to_str()
        .unwrap_or("<invalid utf8>");

    let severity = match message_severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => ErrorSeverity::Warning,
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => ErrorSeverity::Error,
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => ErrorSeverity::Info,
        _ => ErrorSeverity::Verbose,
    };
    match severity {
        ErrorSeverity::Error => log::error!("[VK]{} {}", types, message),
        ErrorSeverity::Warning => log::warn!("[VK]{} {}", types, message),
        ErrorSeverity::Info => log::info!("[VK]{} {}", types, message),
        ErrorSeverity::Verbose => log::debug!("[VK]{} {}", types, message),
    }

    if !p_user_data.is_null() {
        let user_data = &*(p_user_data as *const DebugUserData);
        if let Some(callback) = &user_data.callback {
            callback(severity, message);
        }
    }

    vk::FALSE
}

fn create_debug_messenger(
    entry: &ash::Entry,
    instance: &ash::Instance,
    callback: Option<Box<DebugCallback>>,
) -> Result<DebugMessenger> {
    let user_data = Box::new(DebugUserData { callback });

    let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_utils_callback))
        .user_data(&*user_data as *const DebugUserData as *mut c_void);

    let debug_instance = debug_utils::Instance::new(entry, instance);
    let messenger = unsafe { debug_instance.create_debug_utils_messenger(&debug_info, None)? };

    Ok(DebugMessenger {
        instance: debug_instance,
        messenger,
        _user_data: user_data,
    })
}

fn choose_physical_device(
    instance: &ash::Instance,
    preferred: DeviceType,
) -> Result<(vk::PhysicalDevice, vk::PhysicalDeviceProperties)> {
    let devices = unsafe { instance.enumerate_physical_devices()? };
    if devices.is_empty() {
        return Err(anyhow::anyhow!("No Vulkan capable device found"));
    }

    let with_properties = devices
        .into_iter()
        .map(|device| {
            let properties = unsafe { instance.get_physical_device_properties(device) };
            (device, properties)
        })
        .collect::<Vec<_>>();

    let preferred_vk = device_type_to_vk(preferred);
    let chosen = with_properties
        .iter()
        .find(|(_, properties)| properties.device_type == preferred_vk)
        .or_else(|| {
            with_properties
                .iter()
                .find(|(_, properties)| {
                    properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU
                })
        })
        .unwrap_or(&with_properties[0]);

    Ok(*chosen)
}

struct QueueFamilyIndices {
    main: u32,
    transfer: u32,
    compute: u32,
}

impl QueueFamilyIndices {
    fn unique(&self) -> Vec<u32> {
        let mut indices = vec![self.main, self.transfer, self.compute];
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Prefers a dedicated transfer family and a compute family distinct from
/// graphics; both fall back to sharing the main family.
fn select_queue_family_indices(
    instance: &ash::Instance,
    gpu: vk::PhysicalDevice,
) -> QueueFamilyIndices {
    let families = unsafe { instance.get_physical_device_queue_family_properties(gpu) };

    let mut main = None;
    let mut transfer = None;
    let mut compute = None;

    for (index, family) in families.iter().enumerate() {
        if family.queue_count == 0 {
            continue;
        }
        let index = index as u32;
        let flags = family.queue_flags;

        if flags.contains(vk::QueueFlags::GRAPHICS) && main.is_none() {
            main = Some(index);
        } else if flags.contains(vk::QueueFlags::COMPUTE) && compute.is_none() {
            compute = Some(index);
        } else if flags.contains(vk::QueueFlags::TRANSFER)
            && !flags.contains(vk::QueueFlags::COMPUTE)
            && transfer.is_none()
        {
            transfer = Some(index);
        }
    }

    let main = main.unwrap_or(0);
    QueueFamilyIndices {
        main,
        transfer: transfer.unwrap_or(main),
        compute: compute.unwrap_or(main),
    }
}

fn create_logical_device(
    instance: &ash::Instance,
    gpu: vk::PhysicalDevice,
    family_indices: &QueueFamilyIndices,
) -> Result<ash::Device> {
    // Verify the capability set this crate is built around before enabling
    // it wholesale.
    let mut supported12 = vk::PhysicalDeviceVulkan12Features::default();
    let mut supported13 = vk::PhysicalDeviceVulkan13Features::default();
    let mut supported = vk::PhysicalDeviceFeatures2::default()
        .push_next(&mut supported12)
        .push_next(&mut supported13);
    unsafe { instance.get_physical_device_features2(gpu, &mut supported) };

    let required = [
        (supported12.timeline_semaphore, "timelineSemaphore"),
        (supported12.buffer_device_address, "bufferDeviceAddress"),
        (supported12.descriptor_indexing, "descriptorIndexing"),
        (supported12.runtime_descriptor_array, "runtimeDescriptorArray"),
        (
            supported12.descriptor_binding_partially_bound,
            "descriptorBindingPartiallyBound",
        ),
        (
            supported12.descriptor_binding_sampled_image_update_after_bind,
            "descriptorBindingSampledImageUpdateAfterBind",
        ),
        (
            supported12.descriptor_binding_storage_image_update_after_bind,
            "descriptorBindingStorageImageUpdateAfterBind",
        ),
        (
            supported12.descriptor_binding_storage_buffer_update_after_bind,
            "descriptorBindingStorageBufferUpdateAfterBind",
        ),
        (supported13.dynamic_rendering, "dynamicRendering"),
        (supported13.synchronization2, "synchronization2"),
    ];
    for (supported, name) in required {
        if supported == vk::FALSE {
            return Err(anyhow::anyhow!(
                "Unsupported device: required feature {} is missing",
                name
            ));
        }
    }

    let queue_priorities = [1.0f32];
    let queue_create_infos = family_indices
        .unique()
        .into_iter()
        .map(|index| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(index)
                .queue_priorities(&queue_priorities)
        })
        .collect::<Vec<_>>();

    let extension_names = [khr::swapchain::NAME.as_ptr()];

    let mut vulkan12_features = vk::PhysicalDeviceVulkan12Features::default()
        .timeline_semaphore(true)
        .buffer_device_address(true)
        .descriptor_indexing(true)
        .runtime_descriptor_array(true)
        .descriptor_binding_partially_bound(true)
        .descriptor_binding_sampled_image_update_after_bind(true)
        .descriptor_binding_storage_image_update_after_bind(true)
        .descriptor_binding_storage_buffer_update_after_bind(true)
        .shader_sampled_image_array_non_uniform_indexing(
            supported12.shader_sampled_image_array_non_uniform_indexing == vk::TRUE,
        );
    let mut vulkan13_features = vk::PhysicalDeviceVulkan13Features::default()
        .dynamic_rendering(true)
        .synchronization2(true);

    let mut features2 = vk::PhysicalDeviceFeatures2::default()
        .push_next(&mut vulkan12_features)
        .push_next(&mut vulkan13_features);

    let device_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .push_next(&mut features2);

    let device = unsafe {
        instance
            .create_device(gpu, &device_info, None)
            .with_context(|| "Failed to create the logical device")?
    };
    Ok(device)
}
