/*! Content-addressed samplers.
 *
 * Sampler state packs into a 64-bit key; creating a sampler whose key is
 * already cached returns the existing one with its reference count bumped.
 * The cache entry is evicted when the sampler's deferred destruction
 * actually runs.
 */

use std::{
    hash::{Hash, Hasher},
    sync::Weak,
};

use anyhow::Result;
use ash::vk;

use crate::{
    device::{self, Device, DeviceShared, ResourceKind},
    handle::{DeviceResource, Handle, RefCount},
    translate,
    types::{BorderColor, CompareOp, MipmapMode, SamplerAddress, TexelFilter},
    SAMPLER_BINDING,
};

#[derive(Clone, Debug)]
pub struct SamplerInfo {
    pub name: String,
    pub min_filter: TexelFilter,
    pub mag_filter: TexelFilter,
    pub mipmap_mode: MipmapMode,
    pub address_mode_u: SamplerAddress,
    pub address_mode_v: SamplerAddress,
    pub address_mode_w: SamplerAddress,
    pub mip_lod_bias: f32,
    pub max_anisotropy: f32,
    pub compare_op: CompareOp,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: BorderColor,
    pub unnormalized_coordinates: bool,
}

impl Default for SamplerInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            min_filter: TexelFilter::Linear,
            mag_filter: TexelFilter::Linear,
            mipmap_mode: MipmapMode::Linear,
            address_mode_u: SamplerAddress::ClampToEdge,
            address_mode_v: SamplerAddress::ClampToEdge,
            address_mode_w: SamplerAddress::ClampToEdge,
            mip_lod_bias: 0.0,
            max_anisotropy: 0.0,
            compare_op: CompareOp::Less,
            min_lod: 0.0,
            max_lod: 1.0,
            border_color: BorderColor::FloatOpaqueBlack,
            unnormalized_coordinates: false,
        }
    }
}

/// Slot assignment for binding a bare sampler into the bindless set.
#[derive(Clone, Copy, Debug, Default)]
pub struct SamplerBindInfo {
    pub index: u32,
}

/// Packs every sampler field (name excluded) into a 64-bit cache key. Two
/// infos with equal keys produce the same underlying sampler.
pub fn sampler_info_packed_u64(info: &SamplerInfo) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    (info.min_filter as u32).hash(&mut hasher);
    (info.mag_filter as u32).hash(&mut hasher);
    (info.mipmap_mode as u32).hash(&mut hasher);
    (info.address_mode_u as u32).hash(&mut hasher);
    (info.address_mode_v as u32).hash(&mut hasher);
    (info.address_mode_w as u32).hash(&mut hasher);
    info.mip_lod_bias.to_bits().hash(&mut hasher);
    info.max_anisotropy.to_bits().hash(&mut hasher);
    (info.compare_op as u32).hash(&mut hasher);
    info.min_lod.to_bits().hash(&mut hasher);
    info.max_lod.to_bits().hash(&mut hasher);
    (info.border_color as u32).hash(&mut hasher);
    info.unnormalized_coordinates.hash(&mut hasher);
    hasher.finish()
}

pub struct Sampler {
    pub(crate) raw: vk::Sampler,
    pub(crate) packed: u64,
    info: SamplerInfo,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

impl DeviceResource for Sampler {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::Sampler::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    fn destroy(&self, id: u64) {
        if let Some(device) = self.device.upgrade() {
            device.schedule_zombie(id, ResourceKind::Sampler);
        }
    }
}

impl Sampler {
    pub fn from(device: &Device, info: SamplerInfo) -> Result<Handle<Sampler>> {
        let shared = &device.shared;
        let packed = sampler_info_packed_u64(&info);

        // Hold the cache lock across the miss path so an identical sampler
        // created concurrently cannot race in a duplicate.
        let mut cache = shared.resources.sampler_cache.lock();
        if let Some(&id) = cache.get(&packed) {
            if let Some(ptr) = shared
                .resources
                .samplers
                .get(crate::pool::PoolIndex::from_u64(id))
            {
                return Ok(Handle::from_raw(id, ptr));
            }
        }

        let create_info = vk::SamplerCreateInfo::default()
            .min_filter(translate::translate_texel_filter(info.min_filter))
            .mag_filter(translate::translate_texel_filter(info.mag_filter))
            .mipmap_mode(translate::translate_mipmap_mode(info.mipmap_mode))
            .address_mode_u(translate::translate_sampler_address_mode(info.address_mode_u))
            .address_mode_v(translate::translate_sampler_address_mode(info.address_mode_v))
            .address_mode_w(translate::translate_sampler_address_mode(info.address_mode_w))
            .mip_lod_bias(info.mip_lod_bias)
            .anisotropy_enable(info.max_anisotropy > 0.0)
            .max_anisotropy(info.max_anisotropy)
            .compare_enable(false)
            .compare_op(translate::translate_compare_op(info.compare_op))
            .min_lod(info.min_lod)
            .max_lod(info.max_lod)
            .border_color(translate::translate_border_color(info.border_color))
            .unnormalized_coordinates(info.unnormalized_coordinates);

        let raw = unsafe { shared.raw.create_sampler(&create_info, None)? };
        shared.set_debug_name(raw, &info.name);

        let (index, ptr) = shared.resources.samplers.insert(Self {
            raw,
            packed,
            info,
            refs: RefCount::default(),
            device: device::downgrade(device),
        });
        cache.insert(packed, index.to_u64());
        Ok(Handle::from_raw(index.to_u64(), ptr))
    }
}

impl Handle<Sampler> {
    pub fn info(&self) -> Option<&SamplerInfo> {
        self.get().map(|sampler| &sampler.info)
    }

    pub fn info_packed(&self) -> u64 {
        self.get().map_or(0, |sampler| sampler.packed)
    }

    /// Writes the sampler into the bindless sampler binding.
    pub fn bind(&self, info: SamplerBindInfo) -> SamplerBindInfo {
        let Some(sampler) = self.get() else {
            return info;
        };
        let Some(device) = sampler.device.upgrade() else {
            return info;
        };

        let index = info.index % device.config().max_samplers;
        let sampler_infos = [vk::DescriptorImageInfo::default().sampler(sampler.raw)];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(device.descriptor_cache.descriptor_set)
            .dst_binding(SAMPLER_BINDING)
            .dst_array_element(index)
            .descriptor_type(vk::DescriptorType::SAMPLER)
            .image_info(&sampler_infos);
        unsafe {
            device.raw.update_descriptor_sets(std::slice::from_ref(&write), &[]);
        }

        SamplerBindInfo { index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_infos_pack_to_equal_keys() {
        let a = SamplerInfo::default();
        let mut b = SamplerInfo::default();
        b.name = String::from("the name does not participate");
        assert_eq!(sampler_info_packed_u64(&a), sampler_info_packed_u64(&b));
    }

    #[test]
    fn every_field_perturbs_the_key() {
        let base = sampler_info_packed_u64(&SamplerInfo::default());

        let variants = [
            SamplerInfo {
                min_filter: TexelFilter::Nearest,
                ..Default::default()
            },
            SamplerInfo {
                mag_filter: TexelFilter::Nearest,
                ..Default::default()
            },
            SamplerInfo {
                mipmap_mode: MipmapMode::Nearest,
                ..Default::default()
            },
            SamplerInfo {
                address_mode_u: SamplerAddress::Repeat,
                ..Default::default()
            },
            SamplerInfo {
                mip_lod_bias: 0.5,
                ..Default::default()
            },
            SamplerInfo {
                max_anisotropy: 16.0,
                ..Default::default()
            },
            SamplerInfo {
                compare_op: CompareOp::Always,
                ..Default::default()
            },
            SamplerInfo {
                max_lod: 8.0,
                ..Default::default()
            },
            SamplerInfo {
                border_color: BorderColor::IntOpaqueWhite,
                ..Default::default()
            },
            SamplerInfo {
                unnormalized_coordinates: true,
                ..Default::default()
            },
        ];
        for variant in variants {
            assert_ne!(base, sampler_info_packed_u64(&variant));
        }
    }
}
