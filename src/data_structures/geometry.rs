//! Geometry store: shared vertex/index buffers and the parts cut from them.
//!
//! - [`Part`] is an index range of one geometry plus a material index
//! - [`Geometry`] owns the cumulative vertex/index data of one slot
//! - [`GeometryStore`] holds all slots and enforces the configured limits
//!
//! Geometries are append-only. Loading more meshes into an occupied slot
//! appends their data; the GPU buffers are regrown on the next
//! [`Geometry::write_to_buffers`] by allocating `old + new`, copying the old
//! contents and writing the new ones behind them.

use std::ops::Range;

use wgpu::util::DeviceExt;

use crate::{
    config::SceneLimits,
    data_structures::{cache::DrawIndirectCommand, model::{MeshData, ModelVertex}},
    error::SceneError,
};

/// Identity of a part for instancing purposes. Material is deliberately absent:
/// equal ranges with different materials still share one draw command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartKey {
    pub n_index: u32,
    pub base_index: u32,
    pub base_vertex: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    pub n_index: u32,
    pub base_index: u32,
    pub base_vertex: u32,
    pub material: u32,
}

impl Part {
    pub fn key(&self) -> PartKey {
        PartKey {
            n_index: self.n_index,
            base_index: self.base_index,
            base_vertex: self.base_vertex,
        }
    }

    /// Same index range, different material.
    pub fn with_material(&self, material: u32) -> Self {
        Self { material, ..*self }
    }
}

#[derive(Debug)]
pub struct GeometryBuffers {
    pub vertex: wgpu::Buffer,
    pub index: wgpu::Buffer,
    pub indirect: Option<wgpu::Buffer>,
    pub indirect_count: u32,
}

#[derive(Debug, Default)]
pub struct Geometry {
    parts: Vec<Part>,
    n_vertices: u32,
    n_indices: u32,
    pending_vertices: Vec<ModelVertex>,
    pending_indices: Vec<u32>,
    buffers: Option<GeometryBuffers>,
}

impl Geometry {
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn n_vertices(&self) -> u32 {
        self.n_vertices
    }

    pub fn n_indices(&self) -> u32 {
        self.n_indices
    }

    pub fn buffers(&self) -> Option<&GeometryBuffers> {
        self.buffers.as_ref()
    }

    /// Whether CPU data is waiting for the next upload.
    pub fn is_dirty(&self) -> bool {
        !self.pending_vertices.is_empty() || !self.pending_indices.is_empty()
    }

    /// Flush pending vertex/index data to the GPU, regrowing the buffers if needed.
    pub fn write_to_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, slot: usize) {
        if !self.is_dirty() {
            return;
        }
        let vertices = std::mem::take(&mut self.pending_vertices);
        let indices = std::mem::take(&mut self.pending_indices);
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&indices);

        let (vertex, index, indirect, indirect_count) = match self.buffers.take() {
            None => {
                log::info!(
                    "Creating buffers for geometry {slot}: {} vertices, {} indices",
                    vertices.len(),
                    indices.len()
                );
                let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Geometry {slot} Vertex Buffer")),
                    contents: vertex_bytes,
                    usage: wgpu::BufferUsages::VERTEX
                        | wgpu::BufferUsages::COPY_DST
                        | wgpu::BufferUsages::COPY_SRC,
                });
                let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("Geometry {slot} Index Buffer")),
                    contents: index_bytes,
                    usage: wgpu::BufferUsages::INDEX
                        | wgpu::BufferUsages::COPY_DST
                        | wgpu::BufferUsages::COPY_SRC,
                });
                (vertex, index, None, 0)
            }
            Some(GeometryBuffers {
                vertex: old_vertex,
                index: old_index,
                indirect,
                indirect_count,
            }) => {
                log::info!(
                    "Growing buffers of geometry {slot} to {} vertices, {} indices",
                    self.n_vertices,
                    self.n_indices
                );
                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Geometry Growth Encoder"),
                });
                let vertex = grow_buffer(
                    device,
                    queue,
                    &mut encoder,
                    &old_vertex,
                    vertex_bytes,
                    wgpu::BufferUsages::VERTEX,
                    &format!("Geometry {slot} Vertex Buffer"),
                );
                let index = grow_buffer(
                    device,
                    queue,
                    &mut encoder,
                    &old_index,
                    index_bytes,
                    wgpu::BufferUsages::INDEX,
                    &format!("Geometry {slot} Index Buffer"),
                );
                queue.submit(std::iter::once(encoder.finish()));
                // The old buffers are released once the copy has executed.
                drop((old_vertex, old_index));
                (vertex, index, indirect, indirect_count)
            }
        };
        self.buffers = Some(GeometryBuffers {
            vertex,
            index,
            indirect,
            indirect_count,
        });
    }

    /// Upload this geometry's draw commands, recreating the buffer only when it is too small.
    pub(crate) fn write_commands(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: usize,
        commands: &[DrawIndirectCommand],
    ) {
        let Some(buffers) = self.buffers.as_mut() else {
            log::warn!("Geometry {slot} has commands but was never uploaded");
            return;
        };
        let contents: &[u8] = bytemuck::cast_slice(commands);
        let buffer_size_needs_change = buffers
            .indirect
            .as_ref()
            .is_none_or(|buffer| buffer.size() < contents.len() as wgpu::BufferAddress);
        if buffer_size_needs_change {
            buffers.indirect = Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Geometry {slot} Indirect Buffer")),
                contents,
                usage: wgpu::BufferUsages::INDIRECT | wgpu::BufferUsages::COPY_DST,
            }));
        } else if let Some(buffer) = &buffers.indirect {
            queue.write_buffer(buffer, 0, contents);
        }
        buffers.indirect_count = commands.len() as u32;
    }

    pub(crate) fn clear_commands(&mut self) {
        if let Some(buffers) = self.buffers.as_mut() {
            buffers.indirect_count = 0;
        }
    }
}

fn grow_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    encoder: &mut wgpu::CommandEncoder,
    old: &wgpu::Buffer,
    appended: &[u8],
    usage: wgpu::BufferUsages,
    label: &str,
) -> wgpu::Buffer {
    let old_size = old.size();
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: old_size + appended.len() as wgpu::BufferAddress,
        usage: usage | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: false,
    });
    encoder.copy_buffer_to_buffer(old, 0, &buffer, 0, old_size);
    if !appended.is_empty() {
        queue.write_buffer(&buffer, old_size, appended);
    }
    buffer
}

/// All geometry slots of a scene.
#[derive(Debug)]
pub struct GeometryStore {
    geometries: Vec<Geometry>,
    limits: SceneLimits,
}

impl GeometryStore {
    pub fn new(limits: SceneLimits) -> Self {
        Self {
            geometries: Vec::new(),
            limits,
        }
    }

    pub fn limits(&self) -> &SceneLimits {
        &self.limits
    }

    pub fn geometry(&self, slot: usize) -> Option<&Geometry> {
        self.geometries.get(slot)
    }

    pub fn part(&self, slot: usize, part: usize) -> Result<&Part, SceneError> {
        self.geometries
            .get(slot)
            .ok_or(SceneError::UnknownGeometry(slot))?
            .parts
            .get(part)
            .ok_or(SceneError::UnknownPart {
                geometry: slot,
                part,
            })
    }

    /// Occupied slots in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Geometry)> {
        self.geometries.iter().enumerate()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Geometry)> {
        self.geometries.iter_mut().enumerate()
    }

    fn check_slot(&self, slot: usize) -> Result<(), SceneError> {
        if slot >= self.limits.geometry_max {
            return Err(SceneError::GeometrySlot {
                slot,
                limit: self.limits.geometry_max,
            });
        }
        Ok(())
    }

    fn check_part_capacity(&self, slot: usize, added: usize) -> Result<(), SceneError> {
        let existing = self.geometries.get(slot).map_or(0, |g| g.parts.len());
        let requested = existing + added;
        if requested > self.limits.part_max {
            return Err(SceneError::PartCapacity {
                slot,
                requested,
                limit: self.limits.part_max,
            });
        }
        Ok(())
    }

    /// Whether `added` more parts fit into `slot`.
    pub fn can_load(&self, slot: usize, added: usize) -> Result<(), SceneError> {
        self.check_slot(slot)?;
        self.check_part_capacity(slot, added)
    }

    /// Whether `meshes` can be appended to `slot` without exceeding any limit.
    pub fn can_load_meshes(&self, slot: usize, meshes: &[MeshData]) -> Result<(), SceneError> {
        self.can_load(slot, meshes.len())?;
        let (base_vertices, base_indices) = self
            .geometries
            .get(slot)
            .map_or((0, 0), |g| (g.n_vertices, g.n_indices));
        let added_vertices: u64 = meshes.iter().map(|m| m.vertices.len() as u64).sum();
        let added_indices: u64 = meshes.iter().map(|m| m.indices.len() as u64).sum();
        // base_vertex ends up in a signed command field
        if base_vertices as u64 + added_vertices > i32::MAX as u64
            || base_indices as u64 + added_indices > u32::MAX as u64
        {
            return Err(SceneError::IndexOverflow { slot });
        }
        Ok(())
    }

    /// Append one part per mesh to `slot` and return the indices of the new parts.
    ///
    /// Each part's material is `material_offset` plus the mesh's own material
    /// index. All checks run before anything is written, so a failed load
    /// leaves the store unchanged.
    pub fn load(
        &mut self,
        slot: usize,
        meshes: &[MeshData],
        material_offset: u32,
    ) -> Result<Range<usize>, SceneError> {
        self.can_load_meshes(slot, meshes)?;

        if self.geometries.len() <= slot {
            self.geometries.resize_with(slot + 1, Geometry::default);
        }
        let geometry = &mut self.geometries[slot];
        let first = geometry.parts.len();
        for mesh in meshes {
            geometry.parts.push(Part {
                n_index: mesh.indices.len() as u32,
                base_index: geometry.n_indices,
                base_vertex: geometry.n_vertices,
                material: material_offset + mesh.material.unwrap_or(0) as u32,
            });
            geometry.n_vertices += mesh.vertices.len() as u32;
            geometry.n_indices += mesh.indices.len() as u32;
            geometry.pending_vertices.extend_from_slice(&mesh.vertices);
            geometry.pending_indices.extend_from_slice(&mesh.indices);
        }
        log::info!(
            "Loaded {} parts into geometry {slot} ({} vertices, {} indices total)",
            meshes.len(),
            geometry.n_vertices,
            geometry.n_indices
        );
        Ok(first..geometry.parts.len())
    }

    /// Append a hand-made part referencing data already in `slot`.
    pub fn add_part(&mut self, slot: usize, part: Part) -> Result<usize, SceneError> {
        self.check_slot(slot)?;
        let geometry = self
            .geometries
            .get(slot)
            .ok_or(SceneError::UnknownGeometry(slot))?;
        let end = part.base_index as u64 + part.n_index as u64;
        if end > geometry.n_indices as u64 {
            return Err(SceneError::PartRange {
                slot,
                start: part.base_index,
                end,
                n_indices: geometry.n_indices,
            });
        }
        self.check_part_capacity(slot, 1)?;
        let geometry = &mut self.geometries[slot];
        geometry.parts.push(part);
        Ok(geometry.parts.len() - 1)
    }

    pub fn write_to_buffers(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        for (slot, geometry) in self.geometries.iter_mut().enumerate() {
            geometry.write_to_buffers(device, queue, slot);
        }
    }
}
