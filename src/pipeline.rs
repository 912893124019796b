/*! Pipelines.
 *
 * Only the rasterization variant is constructible. The pipeline layout comes
 * from the device's per-push-constant-size layout cache, rendering state is
 * dynamic-rendering based, and viewport/scissor are dynamic states so a
 * pipeline never bakes in an extent.
 */

use std::{ffi::CString, sync::Weak};

use anyhow::Result;
use ash::vk;

use crate::{
    device::{self, Device, DeviceShared, ResourceKind},
    handle::{DeviceResource, Handle, RefCount},
    shader::{Shader, ShaderAttribute},
    translate,
    types::{
        BlendFactor, BlendOp, CompareOp, CullingMode, Format, FrontFace, PipelineType, PolygonMode,
        TopologyType,
    },
};

#[derive(Clone, Copy, Debug)]
pub struct ColorBlendInfo {
    pub enable: bool,
    pub src_color_blend_factor: BlendFactor,
    pub dst_color_blend_factor: BlendFactor,
    pub color_blend_op: BlendOp,
    pub src_alpha_blend_factor: BlendFactor,
    pub dst_alpha_blend_factor: BlendFactor,
    pub alpha_blend_op: BlendOp,
}

impl Default for ColorBlendInfo {
    fn default() -> Self {
        Self {
            enable: true,
            src_color_blend_factor: BlendFactor::One,
            dst_color_blend_factor: BlendFactor::Zero,
            color_blend_op: BlendOp::Add,
            src_alpha_blend_factor: BlendFactor::One,
            dst_alpha_blend_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ColorAttachment {
    pub format: Format,
    pub blend_info: ColorBlendInfo,
}

/// Range `[from, to]` of reflected vertex attributes sourced from one
/// vertex buffer binding.
#[derive(Clone, Copy, Debug, Default)]
pub struct VertexInputBinding {
    pub binding: u32,
    pub from: u32,
    pub to: u32,
    pub stride: u32,
    pub instanced: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct DepthTestInfo {
    pub depth_test_compare_op: CompareOp,
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,
    pub enable_depth_bounds_test: bool,
    pub enable_depth_test: bool,
    pub enable_depth_write: bool,
}

impl Default for DepthTestInfo {
    fn default() -> Self {
        Self {
            depth_test_compare_op: CompareOp::Less,
            min_depth_bounds: 0.0,
            max_depth_bounds: 1.0,
            enable_depth_bounds_test: false,
            enable_depth_test: false,
            enable_depth_write: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RasterizationStateInfo {
    pub polygonal_mode: PolygonMode,
    pub cull_mode: CullingMode,
    pub front_face: FrontFace,
    pub line_width: f32,
    pub enable_depth_clamp: bool,
}

impl Default for RasterizationStateInfo {
    fn default() -> Self {
        Self {
            polygonal_mode: PolygonMode::Fill,
            cull_mode: CullingMode::Back,
            front_face: FrontFace::CounterClockwise,
            line_width: 1.0,
            enable_depth_clamp: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RasterPipelineInfo {
    pub name: String,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_attachment_format: Format,
    pub stencil_attachment_format: Format,
    pub vertex_input_bindings: Vec<VertexInputBinding>,
    pub rasterization: RasterizationStateInfo,
    pub depth_test: DepthTestInfo,
    pub topology: TopologyType,
    pub push_constant_size: u32,
}

impl Default for RasterPipelineInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            color_attachments: Vec::new(),
            depth_attachment_format: Format::Undefined,
            stencil_attachment_format: Format::Undefined,
            vertex_input_bindings: Vec::new(),
            rasterization: RasterizationStateInfo::default(),
            depth_test: DepthTestInfo::default(),
            topology: TopologyType::Triangle,
            push_constant_size: 128,
        }
    }
}

/// Shader set a raster pipeline is built from, with the vertex attributes
/// reflected by the compiler.
#[derive(Clone, Default)]
pub struct PipelineShaderInfo {
    pub vertex_shader: Handle<Shader>,
    pub pixel_shader: Handle<Shader>,
    pub vertex_input_attributes: Vec<ShaderAttribute>,
}

pub(crate) enum PipelineVariant {
    Rasterization(RasterPipelineInfo),
}

pub struct Pipeline {
    pub(crate) raw: vk::Pipeline,
    pub(crate) layout: vk::PipelineLayout,
    variant: PipelineVariant,
    refs: RefCount,
    device: Weak<DeviceShared>,
}

impl DeviceResource for Pipeline {
    fn valid(&self) -> bool {
        self.device.strong_count() > 0 && self.raw != vk::Pipeline::null()
    }

    fn refs(&self) -> &RefCount {
        &self.refs
    }

    fn destroy(&self, id: u64) {
        if let Some(device) = self.device.upgrade() {
            device.schedule_zombie(id, ResourceKind::Pipeline);
        }
    }
}

impl Pipeline {
    pub fn from(
        device: &Device,
        shader_info: &PipelineShaderInfo,
        info: RasterPipelineInfo,
    ) -> Result<Handle<Pipeline>> {
        // A raster pipeline needs both a vertex and a pixel shader.
        if !shader_info.vertex_shader.valid() || !shader_info.pixel_shader.valid() {
            return Err(anyhow::anyhow!(
                "Raster pipeline requires a valid vertex and pixel shader"
            ));
        }

        let shared = &device.shared;
        let vertex_shader = shader_info.vertex_shader.get().unwrap();
        let pixel_shader = shader_info.pixel_shader.get().unwrap();

        let vertex_entry = CString::new(
            shader_info
                .vertex_shader
                .info()
                .map(|info| info.entry_point.clone())
                .unwrap_or_default(),
        )?;
        let pixel_entry = CString::new(
            shader_info
                .pixel_shader
                .info()
                .map(|info| info.entry_point.clone())
                .unwrap_or_default(),
        )?;

        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vertex_shader.stage)
                .module(vertex_shader.raw)
                .name(vertex_entry.as_c_str()),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(pixel_shader.stage)
                .module(pixel_shader.raw)
                .name(pixel_entry.as_c_str()),
        ];

        // Interleaved attribute layout per binding, offsets accumulated from
        // the reflected attribute formats.
        let mut input_bindings = Vec::with_capacity(info.vertex_input_bindings.len());
        let mut attribute_descriptions = Vec::new();
        for binding in &info.vertex_input_bindings {
            let mut stride = 0u32;
            for attribute_index in binding.from..=binding.to {
                let Some(attribute) = shader_info
                    .vertex_input_attributes
                    .get(attribute_index as usize)
                else {
                    break;
                };
                attribute_descriptions.push(
                    vk::VertexInputAttributeDescription::default()
                        .location(attribute.location)
                        .binding(binding.binding)
                        .format(translate::translate_shader_attrib_format(attribute.format))
                        .offset(stride),
                );
                stride += translate::stride_for_shader_attrib_format(attribute.format);
            }
            input_bindings.push(
                vk::VertexInputBindingDescription::default()
                    .binding(binding.binding)
                    .stride(if binding.stride != 0 {
                        binding.stride
                    } else {
                        stride
                    })
                    .input_rate(if binding.instanced {
                        vk::VertexInputRate::INSTANCE
                    } else {
                        vk::VertexInputRate::VERTEX
                    }),
            );
        }

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&input_bindings)
            .vertex_attribute_descriptions(&attribute_descriptions);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(translate::translate_topology(info.topology))
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic; one viewport slot each.
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(info.rasterization.enable_depth_clamp)
            .rasterizer_discard_enable(false)
            .polygon_mode(translate::translate_polygon_mode(info.rasterization.polygonal_mode))
            .cull_mode(translate::translate_cull_mode(info.rasterization.cull_mode))
            .front_face(translate::translate_front_face_dir(info.rasterization.front_face))
            .line_width(info.rasterization.line_width);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .min_sample_shading(1.0);

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(info.depth_test.enable_depth_test)
            .depth_write_enable(info.depth_test.enable_depth_write)
            .depth_compare_op(translate::translate_compare_op(
                info.depth_test.depth_test_compare_op,
            ))
            .depth_bounds_test_enable(info.depth_test.enable_depth_bounds_test)
            .min_depth_bounds(info.depth_test.min_depth_bounds)
            .max_depth_bounds(info.depth_test.max_depth_bounds);

        let blend_attachments = info
            .color_attachments
            .iter()
            .map(|attachment| {
                vk::PipelineColorBlendAttachmentState::default()
                    .blend_enable(attachment.blend_info.enable)
                    .src_color_blend_factor(translate::translate_blend_factor(
                        attachment.blend_info.src_color_blend_factor,
                    ))
                    .dst_color_blend_factor(translate::translate_blend_factor(
                        attachment.blend_info.dst_color_blend_factor,
                    ))
                    .color_blend_op(translate::translate_blend_op(
                        attachment.blend_info.color_blend_op,
                    ))
                    .src_alpha_blend_factor(translate::translate_blend_factor(
                        attachment.blend_info.src_alpha_blend_factor,
                    ))
                    .dst_alpha_blend_factor(translate::translate_blend_factor(
                        attachment.blend_info.dst_alpha_blend_factor,
                    ))
                    .alpha_blend_op(translate::translate_blend_op(
                        attachment.blend_info.alpha_blend_op,
                    ))
                    .color_write_mask(vk::ColorComponentFlags::RGBA)
            })
            .collect::<Vec<_>>();
        let color_blend_state =
            vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let color_attachment_formats = info
            .color_attachments
            .iter()
            .map(|attachment| translate::translate_format(attachment.format))
            .collect::<Vec<_>>();
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_attachment_formats)
            .depth_attachment_format(translate::translate_format(info.depth_attachment_format))
            .stencil_attachment_format(translate::translate_format(info.stencil_attachment_format));

        let layout = shared.descriptor_cache.pipeline_layout(info.push_constant_size);

        let create_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .multisample_state(&multisample_state)
            .depth_stencil_state(&depth_stencil_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);

        let raw = unsafe {
            shared
                .raw
                .create_graphics_pipelines(
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&create_info),
                    None,
                )
                .map_err(|(_, error)| error)?[0]
        };

        shared.set_debug_name(raw, &info.name);

        let (index, ptr) = shared.resources.pipelines.insert(Self {
            raw,
            layout,
            variant: PipelineVariant::Rasterization(info),
            refs: RefCount::default(),
            device: device::downgrade(device),
        });
        Ok(Handle::from_raw(index.to_u64(), ptr))
    }

    pub(crate) fn bind_point(&self) -> vk::PipelineBindPoint {
        match self.variant {
            PipelineVariant::Rasterization(_) => vk::PipelineBindPoint::GRAPHICS,
        }
    }
}

impl Handle<Pipeline> {
    pub fn ty(&self) -> PipelineType {
        match self.get().map(|pipeline| &pipeline.variant) {
            Some(PipelineVariant::Rasterization(_)) => PipelineType::Rasterization,
            None => PipelineType::None,
        }
    }

    /// The frozen creation state of a raster pipeline.
    pub fn raster_info(&self) -> Option<&RasterPipelineInfo> {
        self.get().map(|pipeline| match &pipeline.variant {
            PipelineVariant::Rasterization(info) => info,
        })
    }
}
