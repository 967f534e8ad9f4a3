//! Render cache: instances grouped into indirect draw commands.
//!
//! [`RenderCache::build`] flattens every `(node, part)` pair of the scene
//! graph, sorts the pairs by `(geometry, part key)` and walks them once:
//!
//! - a new [`CacheObject`] starts whenever the geometry changes
//! - a new [`DrawIndirectCommand`] starts whenever the part key changes, with
//!   `base_instance` set to the number of instances emitted so far
//! - every pair adds one instance: its world matrix goes to the next transform
//!   slot and a `(material, slot)` record to the parallel assign table
//!
//! The instance ranges of all commands therefore partition
//! `0..instance_count()` exactly. The cache is derived state and is rebuilt
//! from scratch whenever the graph changes.

use cgmath::Matrix4;

use crate::{
    data_structures::{
        geometry::{GeometryStore, PartKey},
        instance::{AssignRaw, TransformRaw},
        scene_graph::SceneGraph,
    },
    error::SceneError,
};

/// Indexed indirect draw arguments, laid out as the GPU reads them.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawIndirectCommand {
    pub n_index: u32,
    pub n_instance: u32,
    pub base_index: u32,
    pub base_vertex: i32,
    pub base_instance: u32,
}

impl DrawIndirectCommand {
    pub fn key(&self) -> PartKey {
        PartKey {
            n_index: self.n_index,
            base_index: self.base_index,
            base_vertex: self.base_vertex as u32,
        }
    }

    pub fn instances(&self) -> std::ops::Range<u32> {
        self.base_instance..self.base_instance + self.n_instance
    }
}

/// The draw commands of one geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheObject {
    pub geometry: usize,
    pub commands: Vec<DrawIndirectCommand>,
}

#[derive(Debug, Clone, Default)]
pub struct RenderCache {
    objects: Vec<CacheObject>,
    transforms: Vec<TransformRaw>,
    assigns: Vec<AssignRaw>,
}

struct Pending {
    geometry: usize,
    key: PartKey,
    material: u32,
    world: Matrix4<f32>,
}

impl RenderCache {
    pub fn build(graph: &SceneGraph, store: &GeometryStore) -> Result<Self, SceneError> {
        let mut pending = Vec::new();
        for (_, node, world) in graph.traverse() {
            for &part_index in node.parts() {
                let part = store.part(node.geometry(), part_index)?;
                pending.push(Pending {
                    geometry: node.geometry(),
                    key: part.key(),
                    material: part.material,
                    world,
                });
            }
        }

        let limit = store.limits().transform_max;
        if pending.len() > limit {
            return Err(SceneError::TransformCapacity {
                requested: pending.len(),
                limit,
            });
        }

        // stable, so instances of one command keep traversal order
        pending.sort_by_key(|p| (p.geometry, p.key));

        let mut objects: Vec<CacheObject> = Vec::new();
        let mut transforms = Vec::with_capacity(pending.len());
        let mut assigns = Vec::with_capacity(pending.len());
        for instance in pending {
            let slot = transforms.len() as u32;
            if objects.last().is_none_or(|o| o.geometry != instance.geometry) {
                objects.push(CacheObject {
                    geometry: instance.geometry,
                    commands: Vec::new(),
                });
            }
            let current = objects.len() - 1;
            let commands = &mut objects[current].commands;
            match commands.last_mut() {
                Some(command) if command.key() == instance.key => command.n_instance += 1,
                _ => commands.push(DrawIndirectCommand {
                    n_index: instance.key.n_index,
                    n_instance: 1,
                    base_index: instance.key.base_index,
                    base_vertex: instance.key.base_vertex as i32,
                    base_instance: slot,
                }),
            }
            transforms.push(TransformRaw::from(instance.world));
            assigns.push(AssignRaw {
                material: instance.material,
                transform: slot,
            });
        }

        Ok(Self {
            objects,
            transforms,
            assigns,
        })
    }

    pub fn objects(&self) -> &[CacheObject] {
        &self.objects
    }

    pub fn transforms(&self) -> &[TransformRaw] {
        &self.transforms
    }

    pub fn assigns(&self) -> &[AssignRaw] {
        &self.assigns
    }

    pub fn instance_count(&self) -> usize {
        self.transforms.len()
    }

    pub fn command_count(&self) -> usize {
        self.objects.iter().map(|o| o.commands.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
