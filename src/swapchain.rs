/*! Surface and swapchain.
 *
 * The swapchain owns its surface, per-image acquire/present semaphores and a
 * GPU-elapsed timeline fence. Frame pacing: `acquire_next_image` blocks on
 * the fence for the frame slot it is about to reuse, then acquires with that
 * slot's semaphore. Failures surface as a [`SwapchainState`], never as an
 * error; the caller recreates on `Suboptimal`/`Error`.
 */

use std::sync::{
    atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering},
    Weak,
};

use anyhow::{Context, Result};
use ash::{khr, vk};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::{
    device::{self, Device, DeviceShared, ResourceKind},
    handle::{DeviceResource, Handle, RefCount},
    image::Image,
    sync::{Fence, FenceInfo, Semaphore, SemaphoreInfo},
    translate,
    types::{ColorSpace, Extent2D, Format, ImageUsage, SwapchainPresentMode, SwapchainState},
    MAX_FRAMES_IN_FLIGHT,
};

#[derive(Clone, Debug)]
pub struct SurfaceInfo {
    pub name: String,
    pub preferred_surface_formats: Vec<Format>,
    pub display: RawDisplayHandle,
    pub window: RawWindowHandle,
}

#[derive(Clone, Debug)]
pub struct SwapchainInfo {
    pub name: String,
    pub surface_info: SurfaceInfo,
    pub dimension: Extent2D,
    pub image_count: u32,
    pub image_usage: ImageUsage,
    pub present_mode: SwapchainPresentMode,
}

struct Surface {
    loader: khr::surface::Instance,
    raw: vk::SurfaceKHR,
}

fn state_to_u8(state: SwapchainState) -> u8 {
    match state {
        SwapchainState::Ok => 0,
        SwapchainState::TimedOut => 1,
        SwapchainState::NotReady => 2,
        SwapchainState::Suboptimal => 3,
        SwapchainState::Error => 4,
    }
}

fn state_from_u8(state: u8) -> SwapchainState {
    match state {
        0 => SwapchainState::Ok,
        1 => SwapchainState::TimedOut,
        2 => SwapchainState::NotReady,
        3 => SwapchainState::Suboptimal,
        _ => SwapchainState::Error,
    }
}

/// Slot of the frame about to be recorded, given the total frames elapsed on
/// the CPU side.
pub(crate) fn frame_slot(cpu_elapsed: u64, image_count: usize) -> usize {
    (cpu_elapsed % image_count.max(1) as u64) as usize
}

pub(crate) fn clamp_image_count(requested: u32, min: u32, max: u32) -> u32 {
    let cap = if max == 0 {
        MAX_FRAMES_IN_FLIGHT as u32
    } else {
        max.min(MAX_FRAMES_IN_FLIGHT as u32)
    };
    requested.max(min).min(cap.max(min))
}

pub struct Swapchain {
    surface: Surface,
    loader: khr::swapchain::Device,
    pub(crate) raw: vk::SwapchainKHR,
    format: Format,
    color_space: ColorSpace,
    images: Vec<Handle<Image>>,
    acquire_semaphores: Vec<Handle<Semaphore>>,
    present_semaphores: Vec<Handle<Semaphore>>,
    gpu_elapsed: Handle<Fence>,
    cpu_elapsed: AtomicU64,
    current_frame_index: AtomicU32,
    next_image_index: AtomicU32,
    state: AtomicU8,
    info: SwapchainInfo,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

// The surface/swapchain loaders carry function tables plus raw handles;
// acquire and present are serialized by the frame driver and the device's
// submit lock.
unsafe impl Send for Swapchain {}
unsafe impl Sync for Swapchain {}

impl DeviceResource for Swapchain {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::SwapchainKHR::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    fn destroy(&self, id: u64) {
        if let Some(device) = self.device.upgrade() {
            device.schedule_zombie(id, ResourceKind::Swapchain);
        }
    }
}

impl Swapchain {
    /// Creates a swapchain over the window surface described by
    /// `info.surface_info`. When `previous` is given, its Vulkan handle seeds
    /// the new swapchain and the old resource is left to deferred
    /// destruction as the handle drops.
    pub fn from(
        device: &Device,
        info: SwapchainInfo,
        previous: Option<Handle<Swapchain>>,
    ) -> Result<Handle<Swapchain>> {
        let shared = &device.shared;

        let surface_loader = khr::surface::Instance::new(&shared.entry, &shared.instance);
        let surface_raw = unsafe {
            ash_window::create_surface(
                &shared.entry,
                &shared.instance,
                info.surface_info.display,
                info.surface_info.window,
                None,
            )
            .with_context(|| "Failed to create the window surface")?
        };
        let surface = Surface {
            loader: surface_loader,
            raw: surface_raw,
        };

        let supported_formats = unsafe {
            surface
                .loader
                .get_physical_device_surface_formats(shared.gpu, surface.raw)?
        };
        let supported_present_modes = unsafe {
            surface
                .loader
                .get_physical_device_surface_present_modes(shared.gpu, surface.raw)?
        };
        let capabilities = unsafe {
            surface
                .loader
                .get_physical_device_surface_capabilities(shared.gpu, surface.raw)?
        };

        let surface_format = info
            .surface_info
            .preferred_surface_formats
            .iter()
            .find_map(|&preferred| {
                let vk_format = translate::translate_format(preferred);
                supported_formats
                    .iter()
                    .find(|supported| supported.format == vk_format)
                    .copied()
            })
            .or_else(|| supported_formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("Surface reports no color formats"))?;

        let requested_present_mode =
            translate::translate_swapchain_presentation_mode(info.present_mode);
        let present_mode = if supported_present_modes.contains(&requested_present_mode) {
            requested_present_mode
        } else {
            vk::PresentModeKHR::FIFO
        };

        let image_count = clamp_image_count(
            info.image_count,
            capabilities.min_image_count,
            capabilities.max_image_count,
        );

        let extent = if capabilities.current_extent.width != u32::MAX {
            capabilities.current_extent
        } else {
            vk::Extent2D {
                width: info.dimension.width.clamp(
                    capabilities.min_image_extent.width,
                    capabilities.max_image_extent.width,
                ),
                height: info.dimension.height.clamp(
                    capabilities.min_image_extent.height,
                    capabilities.max_image_extent.height,
                ),
            }
        };
        log::debug!("Swapchain extent: {} x {}", extent.width, extent.height);

        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface.raw)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(translate::translate_image_usage_flags(info.image_usage))
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .present_mode(present_mode);
        if let Some(previous) = &previous {
            if let Some(old) = previous.get() {
                create_info = create_info.old_swapchain(old.raw);
            }
        }

        let loader = khr::swapchain::Device::new(&shared.instance, &shared.raw);
        let raw = unsafe {
            loader
                .create_swapchain(&create_info, None)
                .with_context(|| "Failed to create the swapchain")?
        };
        shared.set_debug_name(raw, &info.name);

        // The driver may hand back more images than the clamped request;
        // frame pacing adapts to whatever count it returns.
        let raw_images = unsafe { loader.get_swapchain_images(raw)? };

        let format = translate::format_from_vk(surface_format.format);
        let color_space = translate::color_space_from_vk(surface_format.color_space);

        let images = Image::wrap_swapchain_images(
            device,
            &raw_images,
            format,
            crate::types::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            },
            info.image_usage,
            &info.name,
        )?;

        let mut acquire_semaphores = Vec::with_capacity(raw_images.len());
        let mut present_semaphores = Vec::with_capacity(raw_images.len());
        for index in 0..raw_images.len() {
            acquire_semaphores.push(Semaphore::from(
                device,
                SemaphoreInfo {
                    name: format!("{}_acquire_{}", info.name, index),
                },
            )?);
            present_semaphores.push(Semaphore::from(
                device,
                SemaphoreInfo {
                    name: format!("{}_present_{}", info.name, index),
                },
            )?);
        }

        let gpu_elapsed = Fence::from(
            device,
            FenceInfo {
                name: format!("{}_gpu_elapsed", info.name),
                initial_value: 0,
            },
        )?;

        let mut info = info;
        info.dimension = Extent2D {
            width: extent.width,
            height: extent.height,
        };

        let (index, ptr) = shared.resources.swapchains.insert(Self {
            surface,
            loader,
            raw,
            format,
            color_space,
            images,
            acquire_semaphores,
            present_semaphores,
            gpu_elapsed,
            cpu_elapsed: AtomicU64::new(0),
            current_frame_index: AtomicU32::new(0),
            next_image_index: AtomicU32::new(0),
            state: AtomicU8::new(state_to_u8(SwapchainState::Ok)),
            info,
            refs: RefCount::default(),
            device: device::downgrade(device),
        });

        // The replaced swapchain rides the zombie queue once this handle
        // drops.
        drop(previous);

        Ok(Handle::from_raw(index.to_u64(), ptr))
    }
}

impl Handle<Swapchain> {
    pub fn info(&self) -> Option<&SwapchainInfo> {
        self.get().map(|swapchain| &swapchain.info)
    }

    pub fn state(&self) -> SwapchainState {
        self.get().map_or(SwapchainState::Error, |swapchain| {
            state_from_u8(swapchain.state.load(Ordering::Acquire))
        })
    }

    pub fn num_images(&self) -> u32 {
        self.get().map_or(0, |swapchain| swapchain.images.len() as u32)
    }

    /// Shared handles to every image in the swapchain.
    pub fn images(&self) -> Vec<Handle<Image>> {
        self.get()
            .map_or_else(Vec::new, |swapchain| swapchain.images.clone())
    }

    pub fn image_format(&self) -> Format {
        self.get().map_or(Format::Undefined, |swapchain| swapchain.format)
    }

    pub fn color_space(&self) -> ColorSpace {
        self.get()
            .map_or(ColorSpace::SrgbNonLinear, |swapchain| swapchain.color_space)
    }

    /// Waits for the GPU to release the frame slot being reused, then
    /// acquires the next image with that slot's semaphore. Returns a null
    /// handle when the swapchain needs attention; inspect [`Self::state`].
    pub fn acquire_next_image(&self) -> Handle<Image> {
        let Some(swapchain) = self.get() else {
            return Handle::null();
        };

        let image_count = swapchain.images.len();
        let cpu_elapsed = swapchain.cpu_elapsed.load(Ordering::Acquire);
        let frame = frame_slot(cpu_elapsed, image_count);

        // The fence value for a frame is its cpu_elapsed count at submit
        // time; slot reuse must wait image_count-1 frames behind.
        if cpu_elapsed >= image_count as u64 {
            let wait_value = cpu_elapsed - (image_count as u64 - 1);
            swapchain.gpu_elapsed.wait_for_value(wait_value, u64::MAX);
        }

        let semaphore_raw = swapchain.acquire_semaphores[frame]
            .get()
            .map(|semaphore| semaphore.raw)
            .unwrap_or_default();

        let result = unsafe {
            swapchain.loader.acquire_next_image(
                swapchain.raw,
                u64::MAX,
                semaphore_raw,
                vk::Fence::null(),
            )
        };

        let (image_index, state) = match result {
            Ok((image_index, false)) => (Some(image_index), SwapchainState::Ok),
            Ok((image_index, true)) => (Some(image_index), SwapchainState::Suboptimal),
            Err(vk::Result::TIMEOUT) => (None, SwapchainState::TimedOut),
            Err(vk::Result::NOT_READY) => (None, SwapchainState::NotReady),
            Err(error) => {
                log::debug!("vkAcquireNextImageKHR failed: {}", error);
                (None, SwapchainState::Error)
            }
        };
        swapchain.state.store(state_to_u8(state), Ordering::Release);

        let Some(image_index) = image_index else {
            return Handle::null();
        };

        swapchain
            .next_image_index
            .store(image_index, Ordering::Release);
        swapchain
            .current_frame_index
            .store(frame as u32, Ordering::Release);
        swapchain.cpu_elapsed.fetch_add(1, Ordering::AcqRel);

        swapchain.images[image_index as usize].clone()
    }

    /// Image acquired by the last [`Self::acquire_next_image`].
    pub fn current_image(&self) -> Handle<Image> {
        self.get().map_or_else(Handle::null, |swapchain| {
            swapchain.images[swapchain.next_image_index.load(Ordering::Acquire) as usize].clone()
        })
    }

    pub fn current_image_index(&self) -> u32 {
        self.get()
            .map_or(0, |swapchain| swapchain.next_image_index.load(Ordering::Acquire))
    }

    pub fn current_acquire_semaphore(&self) -> Handle<Semaphore> {
        self.get().map_or_else(Handle::null, |swapchain| {
            swapchain.acquire_semaphores
                [swapchain.current_frame_index.load(Ordering::Acquire) as usize]
                .clone()
        })
    }

    pub fn current_present_semaphore(&self) -> Handle<Semaphore> {
        self.get().map_or_else(Handle::null, |swapchain| {
            swapchain.present_semaphores
                [swapchain.current_frame_index.load(Ordering::Acquire) as usize]
                .clone()
        })
    }

    /// Timeline fence the caller signals with the frame count on the frame's
    /// last submission; acquire waits on it to pace frame slot reuse.
    pub fn get_gpu_fence(&self) -> Handle<Fence> {
        self.get()
            .map_or_else(Handle::null, |swapchain| swapchain.gpu_elapsed.clone())
    }

    /// Frames begun on the host.
    pub fn cpu_frame_count(&self) -> u64 {
        self.get()
            .map_or(0, |swapchain| swapchain.cpu_elapsed.load(Ordering::Acquire))
    }

    /// Frames fully retired by the GPU.
    pub fn gpu_frame_count(&self) -> u64 {
        self.get().map_or(0, |swapchain| swapchain.gpu_elapsed.value())
    }
}

/// Presents the swapchain's acquired image on the main queue, waiting on the
/// in-flight frame's present semaphore.
pub(crate) fn present(device: &Device, handle: &Handle<Swapchain>) -> bool {
    let Some(swapchain) = handle.get() else {
        return false;
    };
    let shared = &device.shared;

    let frame = swapchain.current_frame_index.load(Ordering::Acquire) as usize;
    let wait_semaphores = [swapchain.present_semaphores[frame]
        .get()
        .map(|semaphore| semaphore.raw)
        .unwrap_or_default()];
    let swapchains = [swapchain.raw];
    let image_indices = [swapchain.next_image_index.load(Ordering::Acquire)];

    let present_info = vk::PresentInfoKHR::default()
        .wait_semaphores(&wait_semaphores)
        .swapchains(&swapchains)
        .image_indices(&image_indices);

    let result = {
        let _queue_guard = shared.submit_lock.lock();
        unsafe {
            swapchain
                .loader
                .queue_present(shared.main_queue.raw, &present_info)
        }
    };
    let state = match result {
        Ok(false) => SwapchainState::Ok,
        Ok(true) => SwapchainState::Suboptimal,
        Err(error) => {
            log::debug!("vkQueuePresentKHR failed: {}", error);
            SwapchainState::Error
        }
    };
    swapchain.state.store(state_to_u8(state), Ordering::Release);

    state == SwapchainState::Ok
}

/// Destroys the swapchain's Vulkan objects. Its images cannot outlive the
/// swapchain handle, so views of fully released images are destroyed here
/// rather than left to their own zombies.
pub(crate) fn destroy_resources(shared: &DeviceShared, mut swapchain: Swapchain) {
    for image in swapchain.images.drain(..) {
        let id = image.id();
        drop(image);

        let index = crate::pool::PoolIndex::from_u64(id);
        let fully_released = shared
            .resources
            .images
            .get(index)
            .map_or(false, |ptr| unsafe {
                crate::handle::DeviceResource::refs(ptr.as_ref()).count() == 0
            });
        if fully_released {
            if let Some(entry) = shared.resources.images.remove(index) {
                shared.destroy_image_resources(entry);
            }
        }
    }

    // Semaphores and the fence are regular pooled resources; their handles
    // ride the zombie queue.
    swapchain.acquire_semaphores.clear();
    swapchain.present_semaphores.clear();

    unsafe {
        swapchain.loader.destroy_swapchain(swapchain.raw, None);
        swapchain
            .surface
            .loader
            .destroy_surface(swapchain.surface.raw, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_slots_cycle_modulo_image_count() {
        assert_eq!(frame_slot(0, 3), 0);
        assert_eq!(frame_slot(1, 3), 1);
        assert_eq!(frame_slot(2, 3), 2);
        assert_eq!(frame_slot(3, 3), 0);
        assert_eq!(frame_slot(7, 3), 1);
        // Degenerate image count never divides by zero.
        assert_eq!(frame_slot(5, 0), 0);
    }

    #[test]
    fn image_count_clamps_to_caps_and_frame_limit() {
        // Unlimited max (0) caps at MAX_FRAMES_IN_FLIGHT.
        assert_eq!(clamp_image_count(8, 2, 0), MAX_FRAMES_IN_FLIGHT as u32);
        // Bounded by the surface maximum.
        assert_eq!(clamp_image_count(3, 2, 3), 3);
        // Raised to the surface minimum.
        assert_eq!(clamp_image_count(1, 2, 8), 2);
        // The minimum wins even above the frame limit.
        assert_eq!(clamp_image_count(1, 5, 8), 5);
    }

    #[test]
    fn state_encoding_round_trips() {
        for state in [
            SwapchainState::Ok,
            SwapchainState::TimedOut,
            SwapchainState::NotReady,
            SwapchainState::Suboptimal,
            SwapchainState::Error,
        ] {
            assert_eq!(state_from_u8(state_to_u8(state)), state);
        }
    }
}
