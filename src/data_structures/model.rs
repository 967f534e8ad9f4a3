//! Vertex layout and CPU-side mesh data produced by the importers.

/// Describes how a `#[repr(C)]` record maps onto shader locations.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Tangent and bitangent
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 8]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 11]>() as wgpu::BufferAddress,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// One imported mesh: triangle list indices into its own vertex list.
///
/// `material` indexes the materials of the same import, not the scene table.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

impl MeshData {
    /// Bitwise key of a vertex, used to merge duplicates.
    fn vertex_key(v: &ModelVertex) -> [u32; 14] {
        let mut key = [0u32; 14];
        key.copy_from_slice(bytemuck::cast_slice(std::slice::from_ref(v)));
        key
    }

    /// Merge bitwise identical vertices and remap the index list.
    pub fn join_identical_vertices(&mut self) {
        let mut seen = std::collections::HashMap::with_capacity(self.vertices.len());
        let mut remap = Vec::with_capacity(self.vertices.len());
        let mut unique = Vec::with_capacity(self.vertices.len());
        for v in &self.vertices {
            let next = unique.len() as u32;
            let index = *seen.entry(Self::vertex_key(v)).or_insert_with(|| {
                unique.push(*v);
                next
            });
            remap.push(index);
        }
        for i in self.indices.iter_mut() {
            *i = remap[*i as usize];
        }
        self.vertices = unique;
    }

    /// Accumulate per-triangle tangents and bitangents and average them per vertex.
    ///
    /// Triangles with degenerate texture coordinates are skipped.
    pub fn compute_tangents(&mut self) {
        let vertices = &mut self.vertices;
        for v in vertices.iter_mut() {
            v.tangent = [0.0; 3];
            v.bitangent = [0.0; 3];
        }
        let mut triangles_included = vec![0u32; vertices.len()];

        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            let v0 = vertices[i0];
            let v1 = vertices[i1];
            let v2 = vertices[i2];

            let pos0: cgmath::Vector3<f32> = v0.position.into();
            let pos1: cgmath::Vector3<f32> = v1.position.into();
            let pos2: cgmath::Vector3<f32> = v2.position.into();

            let uv0: cgmath::Vector2<f32> = v0.tex_coords.into();
            let uv1: cgmath::Vector2<f32> = v1.tex_coords.into();
            let uv2: cgmath::Vector2<f32> = v2.tex_coords.into();

            let delta_pos1 = pos1 - pos0;
            let delta_pos2 = pos2 - pos0;
            let delta_uv1 = uv1 - uv0;
            let delta_uv2 = uv2 - uv0;

            //     delta_pos1 = delta_uv1.x * T + delta_uv1.y * B
            //     delta_pos2 = delta_uv2.x * T + delta_uv2.y * B
            let det = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let tangent = (delta_pos1 * delta_uv2.y - delta_pos2 * delta_uv1.y) * r;
            // Flipped for right-handed normal maps in wgpu texture space
            let bitangent = (delta_pos2 * delta_uv1.x - delta_pos1 * delta_uv2.x) * -r;

            for i in [i0, i1, i2] {
                vertices[i].tangent = (tangent + cgmath::Vector3::from(vertices[i].tangent)).into();
                vertices[i].bitangent =
                    (bitangent + cgmath::Vector3::from(vertices[i].bitangent)).into();
                triangles_included[i] += 1;
            }
        }

        for (v, n) in vertices.iter_mut().zip(triangles_included) {
            if n == 0 {
                continue;
            }
            let denom = 1.0 / n as f32;
            v.tangent = (cgmath::Vector3::from(v.tangent) * denom).into();
            v.bitangent = (cgmath::Vector3::from(v.bitangent) * denom).into();
        }
    }
}
