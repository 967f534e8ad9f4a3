//! Per-instance records consumed by the scene shader.
//!
//! Every instance of the render cache owns one [`TransformRaw`] in the
//! transform storage buffer and one [`AssignRaw`] in the instance-rate vertex
//! buffer. The assign record tells the vertex shader which transform slot and
//! which material the instance uses.

use crate::data_structures::model;

/// A world matrix as stored on the GPU (column-major).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
}

impl From<cgmath::Matrix4<f32>> for TransformRaw {
    fn from(matrix: cgmath::Matrix4<f32>) -> Self {
        Self {
            model: matrix.into(),
        }
    }
}

impl TransformRaw {
    /// Translation column of the matrix.
    pub fn translation(&self) -> [f32; 3] {
        let [x, y, z, _] = self.model[3];
        [x, y, z]
    }
}

/**
 * Material and transform slot of one instance.
 *
 * Read per instance (step mode Instance) at shader location 5. With
 * `base_instance` set per draw command the hardware starts each command at
 * its own range of this buffer.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AssignRaw {
    pub material: u32,
    pub transform: u32,
}

impl model::Vertex for AssignRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<AssignRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                shader_location: 5,
                format: wgpu::VertexFormat::Uint32x2,
            }],
        }
    }
}
