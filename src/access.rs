/*! Pre-composed pipeline barrier accesses.
 *
 * Only coarse read/write accesses are exposed. Finer-grained Vulkan access
 * bits are old API bloat; a barrier needs to know the stage and whether
 * memory is read, written or both.
 */

use crate::types::{Access, MemoryAccessType, PipelineStage};

const fn compose(stages: PipelineStage, ty: MemoryAccessType) -> Access {
    Access { stages, ty }
}

// read.
pub const TOP_OF_PIPE_READ: Access = compose(PipelineStage::TOP_OF_PIPE, MemoryAccessType::MEMORY_READ);
pub const DRAW_INDIRECT_READ: Access = compose(PipelineStage::DRAW_INDIRECT, MemoryAccessType::MEMORY_READ);
pub const VERTEX_INPUT_READ: Access = compose(PipelineStage::VERTEX_INPUT, MemoryAccessType::MEMORY_READ);
pub const VERTEX_SHADER_READ: Access = compose(PipelineStage::VERTEX_SHADER, MemoryAccessType::MEMORY_READ);
pub const TESSELATION_CONTROL_READ: Access = compose(PipelineStage::TESSELATION_CONTROL, MemoryAccessType::MEMORY_READ);
pub const TESSELATION_EVALUATION_READ: Access = compose(PipelineStage::TESSELATION_EVALUATION, MemoryAccessType::MEMORY_READ);
pub const GEOMETRY_SHADER_READ: Access = compose(PipelineStage::GEOMETRY_SHADER, MemoryAccessType::MEMORY_READ);
pub const FRAGMENT_SHADER_READ: Access = compose(PipelineStage::FRAGMENT_SHADER, MemoryAccessType::MEMORY_READ);
pub const PIXEL_SHADER_READ: Access = FRAGMENT_SHADER_READ;
pub const EARLY_FRAGMENT_TEST_READ: Access = compose(PipelineStage::EARLY_FRAGMENT_TEST, MemoryAccessType::MEMORY_READ);
pub const LATE_FRAGMENT_TEST_READ: Access = compose(PipelineStage::LATE_FRAGMENT_TEST, MemoryAccessType::MEMORY_READ);
pub const COLOR_ATTACHMENT_OUTPUT_READ: Access = compose(PipelineStage::COLOR_ATTACHMENT_OUTPUT, MemoryAccessType::MEMORY_READ);
pub const COMPUTE_SHADER_READ: Access = compose(PipelineStage::COMPUTE_SHADER, MemoryAccessType::MEMORY_READ);
pub const TRANSFER_READ: Access = compose(PipelineStage::TRANSFER, MemoryAccessType::MEMORY_READ);
pub const BOTTOM_OF_PIPE_READ: Access = compose(PipelineStage::BOTTOM_OF_PIPE, MemoryAccessType::MEMORY_READ);
pub const HOST_READ: Access = compose(PipelineStage::HOST, MemoryAccessType::MEMORY_READ);
pub const ALL_GRAPHICS_READ: Access = compose(PipelineStage::ALL_GRAPHICS, MemoryAccessType::MEMORY_READ);
pub const ALL_COMMANDS_READ: Access = compose(PipelineStage::ALL_COMMANDS, MemoryAccessType::MEMORY_READ);
pub const COPY_READ: Access = compose(PipelineStage::COPY, MemoryAccessType::MEMORY_READ);
pub const RESOLVE_READ: Access = compose(PipelineStage::RESOLVE, MemoryAccessType::MEMORY_READ);
pub const BLIT_READ: Access = compose(PipelineStage::BLIT, MemoryAccessType::MEMORY_READ);
pub const CLEAR_READ: Access = compose(PipelineStage::CLEAR, MemoryAccessType::MEMORY_READ);
pub const INDEX_INPUT_READ: Access = compose(PipelineStage::INDEX_INPUT, MemoryAccessType::MEMORY_READ);
pub const VERTEX_ATTRIBUTE_INPUT_READ: Access = compose(PipelineStage::VERTEX_ATTRIBUTE_INPUT, MemoryAccessType::MEMORY_READ);
pub const PRE_RASTERIZATION_SHADERS_READ: Access = compose(PipelineStage::PRE_RASTERIZATION_SHADERS, MemoryAccessType::MEMORY_READ);
pub const ACCELERATION_STRUCTURE_BUILD_READ: Access = compose(PipelineStage::ACCELERATION_STRUCTURE_BUILD, MemoryAccessType::MEMORY_READ);
pub const RAY_TRACING_SHADER_READ: Access = compose(PipelineStage::RAY_TRACING_SHADER, MemoryAccessType::MEMORY_READ);
pub const TASK_SHADER_READ: Access = compose(PipelineStage::TASK_SHADER, MemoryAccessType::MEMORY_READ);
pub const MESH_SHADER_READ: Access = compose(PipelineStage::MESH_SHADER, MemoryAccessType::MEMORY_READ);
pub const ACCELERATION_STRUCTURE_COPY_READ: Access = compose(PipelineStage::ACCELERATION_STRUCTURE_COPY, MemoryAccessType::MEMORY_READ);
// write.
pub const TOP_OF_PIPE_WRITE: Access = compose(PipelineStage::TOP_OF_PIPE, MemoryAccessType::MEMORY_WRITE);
pub const DRAW_INDIRECT_WRITE: Access = compose(PipelineStage::DRAW_INDIRECT, MemoryAccessType::MEMORY_WRITE);
pub const VERTEX_INPUT_WRITE: Access = compose(PipelineStage::VERTEX_INPUT, MemoryAccessType::MEMORY_WRITE);
pub const VERTEX_SHADER_WRITE: Access = compose(PipelineStage::VERTEX_SHADER, MemoryAccessType::MEMORY_WRITE);
pub const TESSELATION_CONTROL_WRITE: Access = compose(PipelineStage::TESSELATION_CONTROL, MemoryAccessType::MEMORY_WRITE);
pub const TESSELATION_EVALUATION_WRITE: Access = compose(PipelineStage::TESSELATION_EVALUATION, MemoryAccessType::MEMORY_WRITE);
pub const GEOMETRY_SHADER_WRITE: Access = compose(PipelineStage::GEOMETRY_SHADER, MemoryAccessType::MEMORY_WRITE);
pub const FRAGMENT_SHADER_WRITE: Access = compose(PipelineStage::FRAGMENT_SHADER, MemoryAccessType::MEMORY_WRITE);
pub const PIXEL_SHADER_WRITE: Access = FRAGMENT_SHADER_WRITE;
pub const EARLY_FRAGMENT_TEST_WRITE: Access = compose(PipelineStage::EARLY_FRAGMENT_TEST, MemoryAccessType::MEMORY_WRITE);
pub const LATE_FRAGMENT_TEST_WRITE: Access = compose(PipelineStage::LATE_FRAGMENT_TEST, MemoryAccessType::MEMORY_WRITE);
pub const COLOR_ATTACHMENT_OUTPUT_WRITE: Access = compose(PipelineStage::COLOR_ATTACHMENT_OUTPUT, MemoryAccessType::MEMORY_WRITE);
pub const COMPUTE_SHADER_WRITE: Access = compose(PipelineStage::COMPUTE_SHADER, MemoryAccessType::MEMORY_WRITE);
pub const TRANSFER_WRITE: Access = compose(PipelineStage::TRANSFER, MemoryAccessType::MEMORY_WRITE);
pub const BOTTOM_OF_PIPE_WRITE: Access = compose(PipelineStage::BOTTOM_OF_PIPE, MemoryAccessType::MEMORY_WRITE);
pub const HOST_WRITE: Access = compose(PipelineStage::HOST, MemoryAccessType::MEMORY_WRITE);
pub const ALL_GRAPHICS_WRITE: Access = compose(PipelineStage::ALL_GRAPHICS, MemoryAccessType::MEMORY_WRITE);
pub const ALL_COMMANDS_WRITE: Access = compose(PipelineStage::ALL_COMMANDS, MemoryAccessType::MEMORY_WRITE);
pub const COPY_WRITE: Access = compose(PipelineStage::COPY, MemoryAccessType::MEMORY_WRITE);
pub const RESOLVE_WRITE: Access = compose(PipelineStage::RESOLVE, MemoryAccessType::MEMORY_WRITE);
pub const BLIT_WRITE: Access = compose(PipelineStage::BLIT, MemoryAccessType::MEMORY_WRITE);
pub const CLEAR_WRITE: Access = compose(PipelineStage::CLEAR, MemoryAccessType::MEMORY_WRITE);
pub const INDEX_INPUT_WRITE: Access = compose(PipelineStage::INDEX_INPUT, MemoryAccessType::MEMORY_WRITE);
pub const VERTEX_ATTRIBUTE_INPUT_WRITE: Access = compose(PipelineStage::VERTEX_ATTRIBUTE_INPUT, MemoryAccessType::MEMORY_WRITE);
pub const PRE_RASTERIZATION_SHADERS_WRITE: Access = compose(PipelineStage::PRE_RASTERIZATION_SHADERS, MemoryAccessType::MEMORY_WRITE);
pub const ACCELERATION_STRUCTURE_BUILD_WRITE: Access = compose(PipelineStage::ACCELERATION_STRUCTURE_BUILD, MemoryAccessType::MEMORY_WRITE);
pub const RAY_TRACING_SHADER_WRITE: Access = compose(PipelineStage::RAY_TRACING_SHADER, MemoryAccessType::MEMORY_WRITE);
pub const TASK_SHADER_WRITE: Access = compose(PipelineStage::TASK_SHADER, MemoryAccessType::MEMORY_WRITE);
pub const MESH_SHADER_WRITE: Access = compose(PipelineStage::MESH_SHADER, MemoryAccessType::MEMORY_WRITE);
pub const ACCELERATION_STRUCTURE_COPY_WRITE: Access = compose(PipelineStage::ACCELERATION_STRUCTURE_COPY, MemoryAccessType::MEMORY_WRITE);
// read write.
pub const TOP_OF_PIPE_READ_WRITE: Access = compose(PipelineStage::TOP_OF_PIPE, MemoryAccessType::MEMORY_READ_WRITE);
pub const DRAW_INDIRECT_READ_WRITE: Access = compose(PipelineStage::DRAW_INDIRECT, MemoryAccessType::MEMORY_READ_WRITE);
pub const VERTEX_INPUT_READ_WRITE: Access = compose(PipelineStage::VERTEX_INPUT, MemoryAccessType::MEMORY_READ_WRITE);
pub const VERTEX_SHADER_READ_WRITE: Access = compose(PipelineStage::VERTEX_SHADER, MemoryAccessType::MEMORY_READ_WRITE);
pub const TESSELATION_CONTROL_READ_WRITE: Access = compose(PipelineStage::TESSELATION_CONTROL, MemoryAccessType::MEMORY_READ_WRITE);
pub const TESSELATION_EVALUATION_READ_WRITE: Access = compose(PipelineStage::TESSELATION_EVALUATION, MemoryAccessType::MEMORY_READ_WRITE);
pub const GEOMETRY_SHADER_READ_WRITE: Access = compose(PipelineStage::GEOMETRY_SHADER, MemoryAccessType::MEMORY_READ_WRITE);
pub const FRAGMENT_SHADER_READ_WRITE: Access = compose(PipelineStage::FRAGMENT_SHADER, MemoryAccessType::MEMORY_READ_WRITE);
pub const PIXEL_SHADER_READ_WRITE: Access = FRAGMENT_SHADER_READ_WRITE;
pub const EARLY_FRAGMENT_TEST_READ_WRITE: Access = compose(PipelineStage::EARLY_FRAGMENT_TEST, MemoryAccessType::MEMORY_READ_WRITE);
pub const LATE_FRAGMENT_TEST_READ_WRITE: Access = compose(PipelineStage::LATE_FRAGMENT_TEST, MemoryAccessType::MEMORY_READ_WRITE);
pub const COLOR_ATTACHMENT_OUTPUT_READ_WRITE: Access = compose(PipelineStage::COLOR_ATTACHMENT_OUTPUT, MemoryAccessType::MEMORY_READ_WRITE);
pub const COMPUTE_SHADER_READ_WRITE: Access = compose(PipelineStage::COMPUTE_SHADER, MemoryAccessType::MEMORY_READ_WRITE);
pub const TRANSFER_READ_WRITE: Access = compose(PipelineStage::TRANSFER, MemoryAccessType::MEMORY_READ_WRITE);
pub const BOTTOM_OF_PIPE_READ_WRITE: Access = compose(PipelineStage::BOTTOM_OF_PIPE, MemoryAccessType::MEMORY_READ_WRITE);
pub const HOST_READ_WRITE: Access = compose(PipelineStage::HOST, MemoryAccessType::MEMORY_READ_WRITE);
pub const ALL_GRAPHICS_READ_WRITE: Access = compose(PipelineStage::ALL_GRAPHICS, MemoryAccessType::MEMORY_READ_WRITE);
pub const ALL_COMMANDS_READ_WRITE: Access = compose(PipelineStage::ALL_COMMANDS, MemoryAccessType::MEMORY_READ_WRITE);
pub const COPY_READ_WRITE: Access = compose(PipelineStage::COPY, MemoryAccessType::MEMORY_READ_WRITE);
pub const RESOLVE_READ_WRITE: Access = compose(PipelineStage::RESOLVE, MemoryAccessType::MEMORY_READ_WRITE);
pub const BLIT_READ_WRITE: Access = compose(PipelineStage::BLIT, MemoryAccessType::MEMORY_READ_WRITE);
pub const CLEAR_READ_WRITE: Access = compose(PipelineStage::CLEAR, MemoryAccessType::MEMORY_READ_WRITE);
pub const INDEX_INPUT_READ_WRITE: Access = compose(PipelineStage::INDEX_INPUT, MemoryAccessType::MEMORY_READ_WRITE);
pub const VERTEX_ATTRIBUTE_INPUT_READ_WRITE: Access = compose(PipelineStage::VERTEX_ATTRIBUTE_INPUT, MemoryAccessType::MEMORY_READ_WRITE);
pub const PRE_RASTERIZATION_SHADERS_READ_WRITE: Access = compose(PipelineStage::PRE_RASTERIZATION_SHADERS, MemoryAccessType::MEMORY_READ_WRITE);
pub const ACCELERATION_STRUCTURE_BUILD_READ_WRITE: Access = compose(PipelineStage::ACCELERATION_STRUCTURE_BUILD, MemoryAccessType::MEMORY_READ_WRITE);
pub const RAY_TRACING_SHADER_READ_WRITE: Access = compose(PipelineStage::RAY_TRACING_SHADER, MemoryAccessType::MEMORY_READ_WRITE);
pub const TASK_SHADER_READ_WRITE: Access = compose(PipelineStage::TASK_SHADER, MemoryAccessType::MEMORY_READ_WRITE);
pub const MESH_SHADER_READ_WRITE: Access = compose(PipelineStage::MESH_SHADER, MemoryAccessType::MEMORY_READ_WRITE);
pub const ACCELERATION_STRUCTURE_COPY_READ_WRITE: Access = compose(PipelineStage::ACCELERATION_STRUCTURE_COPY, MemoryAccessType::MEMORY_READ_WRITE);
// ownership transfers.
pub const TOP_OF_PIPE_NONE: Access = compose(PipelineStage::TOP_OF_PIPE, MemoryAccessType::empty());
pub const BOTTOM_OF_PIPE_NONE: Access = compose(PipelineStage::BOTTOM_OF_PIPE, MemoryAccessType::empty());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composed_accesses() {
        assert_eq!(TRANSFER_WRITE.stages, PipelineStage::TRANSFER);
        assert_eq!(TRANSFER_WRITE.ty, MemoryAccessType::MEMORY_WRITE);
        assert_eq!(
            COLOR_ATTACHMENT_OUTPUT_READ_WRITE.ty,
            MemoryAccessType::MEMORY_READ_WRITE
        );
        assert!(TOP_OF_PIPE_NONE.ty.is_empty());
        assert_eq!(PIXEL_SHADER_READ, FRAGMENT_SHADER_READ);
    }
}
