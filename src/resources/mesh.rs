use anyhow::Context;

use crate::{data_structures::model::{MeshData, ModelVertex}, resources::ImportOptions};

/**
 * Convert one tobj model into a triangle mesh.
 *
 * OBJ puts the texture origin at the bottom left, so `v` is flipped into wgpu's
 * convention here. Returns `None` for meshes that are skipped because they
 * contain non-triangle faces and `sort_by_primitive_type` is set.
 */
pub fn obj_mesh(model: &tobj::Model, options: &ImportOptions) -> anyhow::Result<Option<MeshData>> {
    let m = &model.mesh;
    if m.face_arities.iter().any(|&arity| arity != 3) {
        if options.sort_by_primitive_type {
            log::warn!("Skipping mesh {}: it contains non-triangle faces", model.name);
            return Ok(None);
        }
        anyhow::bail!("Mesh {} contains non-triangle faces", model.name);
    }

    let vertices = (0..m.positions.len() / 3)
        .map(|i| ModelVertex {
            position: [
                m.positions[i * 3],
                m.positions[i * 3 + 1],
                m.positions[i * 3 + 2],
            ],
            tex_coords: [
                m.texcoords.get(i * 2).map_or(0.0, |f| *f),
                1.0 - m.texcoords.get(i * 2 + 1).map_or(0.0, |f| *f),
            ],
            normal: [
                m.normals.get(i * 3).map_or(0.0, |f| *f),
                m.normals.get(i * 3 + 1).map_or(0.0, |f| *f),
                m.normals.get(i * 3 + 2).map_or(0.0, |f| *f),
            ],
            // Filled in by post processing
            tangent: [0.0; 3],
            bitangent: [0.0; 3],
        })
        .collect::<Vec<_>>();

    if let Some(bad) = m.indices.iter().find(|&&i| i as usize >= vertices.len()) {
        anyhow::bail!("Mesh {} references vertex {} of {}", model.name, bad, vertices.len());
    }

    Ok(Some(MeshData {
        name: model.name.clone(),
        vertices,
        indices: m.indices.clone(),
        material: m.material_id,
    }))
}

/// Convert one glTF primitive. Strips and fans become lists when `triangulate` is set.
pub fn gltf_mesh(
    mesh: &gltf::Mesh,
    primitive: &gltf::Primitive,
    buffers: &[Vec<u8>],
    options: &ImportOptions,
) -> anyhow::Result<Option<MeshData>> {
    let name = format!("{}#{}", mesh.name().unwrap_or("mesh"), primitive.index());
    let mode = primitive.mode();
    let triangles = match mode {
        gltf::mesh::Mode::Triangles => true,
        gltf::mesh::Mode::TriangleStrip | gltf::mesh::Mode::TriangleFan => options.triangulate,
        _ => false,
    };
    if !triangles {
        if options.sort_by_primitive_type {
            log::warn!("Skipping primitive {name}: mode {mode:?} is not a triangle list");
            return Ok(None);
        }
        anyhow::bail!("Primitive {name} has mode {mode:?}, expected triangles");
    }

    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
    let mut vertices: Vec<ModelVertex> = reader
        .read_positions()
        .with_context(|| format!("Primitive {name} has no positions"))?
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();
    if let Some(normals) = reader.read_normals() {
        for (vertex, normal) in vertices.iter_mut().zip(normals) {
            vertex.normal = normal;
        }
    }
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        for (vertex, tex_coord) in vertices.iter_mut().zip(tex_coords) {
            vertex.tex_coords = tex_coord;
        }
    }
    if let Some(tangents) = reader.read_tangents() {
        for (vertex, tangent) in vertices.iter_mut().zip(tangents) {
            // glTF stores the bitangent sign in w
            let tangent: cgmath::Vector4<f32> = tangent.into();
            let normal: cgmath::Vector3<f32> = vertex.normal.into();
            vertex.tangent = tangent.truncate().into();
            vertex.bitangent = (normal.cross(tangent.truncate()) * tangent.w).into();
        }
    }

    let raw: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    let indices = match mode {
        gltf::mesh::Mode::TriangleStrip => strip_to_list(&raw),
        gltf::mesh::Mode::TriangleFan => fan_to_list(&raw),
        _ => raw,
    };
    if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
        anyhow::bail!("Primitive {name} references vertex {} of {}", bad, vertices.len());
    }

    Ok(Some(MeshData {
        name,
        vertices,
        indices,
        material: primitive.material().index(),
    }))
}

fn strip_to_list(strip: &[u32]) -> Vec<u32> {
    strip
        .windows(3)
        .enumerate()
        .flat_map(|(i, w)| {
            // Every other triangle is wound the other way round
            if i % 2 == 0 {
                [w[0], w[1], w[2]]
            } else {
                [w[1], w[0], w[2]]
            }
        })
        .collect()
}

fn fan_to_list(fan: &[u32]) -> Vec<u32> {
    match fan.split_first() {
        Some((&center, rest)) => rest
            .windows(2)
            .flat_map(|w| [center, w[0], w[1]])
            .collect(),
        None => Vec::new(),
    }
}

/// Apply the requested post processing steps in place.
pub fn post_process(mesh: &mut MeshData, options: &ImportOptions) {
    if options.flip_uvs {
        for v in mesh.vertices.iter_mut() {
            v.tex_coords[1] = 1.0 - v.tex_coords[1];
        }
    }
    if options.join_identical_vertices {
        mesh.join_identical_vertices();
    }
    let has_tangents = mesh.vertices.iter().any(|v| v.tangent != [0.0; 3]);
    if options.generate_tangents && !has_tangents {
        mesh.compute_tangents();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_alternate_winding() {
        assert_eq!(strip_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 2, 1, 3]);
    }

    #[test]
    fn fans_share_the_first_vertex() {
        assert_eq!(fan_to_list(&[0, 1, 2, 3]), vec![0, 1, 2, 0, 2, 3]);
        assert!(fan_to_list(&[]).is_empty());
    }
}
