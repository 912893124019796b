/*! Shader modules.
 *
 * Compilation happens outside of this crate; a [`CompiledShaderInfo`]
 * carries the SPIR-V words and the reflected vertex input attributes, and
 * the binary is consumed verbatim.
 */

use std::sync::Weak;

use anyhow::Result;
use ash::vk;

use crate::{
    device::{self, Device, DeviceShared, ResourceKind},
    handle::{DeviceResource, Handle, RefCount},
    translate,
    types::{Format, ShaderType},
};

/// A vertex input attribute reflected from a compiled vertex shader.
#[derive(Clone, Debug)]
pub struct ShaderAttribute {
    pub name: String,
    pub location: u32,
    pub format: Format,
}

/// Produced by the external shader compiler; not meant to be filled by hand.
pub struct CompiledShaderInfo<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub ty: ShaderType,
    pub entry_point: &'a str,
    pub binaries: &'a [u32],
    pub vertex_input_attributes: &'a [ShaderAttribute],
}

#[derive(Clone, Debug, Default)]
pub struct ShaderInfo {
    pub name: String,
    pub ty: ShaderType,
    pub entry_point: String,
}

pub struct Shader {
    pub(crate) raw: vk::ShaderModule,
    pub(crate) stage: vk::ShaderStageFlags,
    info: ShaderInfo,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

impl DeviceResource for Shader {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::ShaderModule::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    fn destroy(&self, id: u64) {
        if let Some(device) = self.device.upgrade() {
            device.schedule_zombie(id, ResourceKind::Shader);
        }
    }
}

impl Shader {
    pub fn from(device: &Device, compiled: &CompiledShaderInfo) -> Result<Handle<Shader>> {
        if compiled.binaries.is_empty() {
            return Err(anyhow::anyhow!("Compiled shader binary is empty"));
        }

        let shared = &device.shared;

        let create_info = vk::ShaderModuleCreateInfo::default().code(compiled.binaries);
        let raw = unsafe { shared.raw.create_shader_module(&create_info, None)? };

        shared.set_debug_name(raw, compiled.name);

        let (index, ptr) = shared.resources.shaders.insert(Self {
            raw,
            stage: translate::translate_shader_stage(compiled.ty),
            info: ShaderInfo {
                name: compiled.name.to_owned(),
                ty: compiled.ty,
                entry_point: compiled.entry_point.to_owned(),
            },
            refs: RefCount::default(),
            device: device::downgrade(device),
        });
        Ok(Handle::from_raw(index.to_u64(), ptr))
    }
}

impl Handle<Shader> {
    pub fn info(&self) -> Option<&ShaderInfo> {
        self.get().map(|shader| &shader.info)
    }
}
