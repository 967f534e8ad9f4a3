//! Scene graph: a forest of transform nodes stored in an arena.
//!
//! Nodes are addressed by [`NodeId`], an index plus a generation counter.
//! Deleting a node frees its slot for reuse and bumps the generation, so stale
//! ids are rejected instead of aliasing a new node. Sibling ids are never
//! invalidated by a deletion.
//!
//! World transforms compose with column vectors: `world = parent_world * local`,
//! so the root's transform is the left-most factor.

use cgmath::{Matrix4, SquareMatrix};

use crate::error::SceneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// An instance placement: a local transform plus parts of one geometry.
#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    pub transform: Matrix4<f32>,
    geometry: usize,
    parts: Vec<usize>,
    children: Vec<NodeId>,
    part_capacity: usize,
    child_capacity: usize,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn geometry(&self) -> usize {
        self.geometry
    }

    /// Part indices into the node's geometry.
    pub fn parts(&self) -> &[usize] {
        &self.parts
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn part_capacity(&self) -> usize {
        self.part_capacity
    }

    pub fn child_capacity(&self) -> usize {
        self.child_capacity
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Root nodes in creation order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_ok()
    }

    pub fn get(&self, id: NodeId) -> Result<&Node, SceneError> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(SceneError::UnknownNode(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, SceneError> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(SceneError::UnknownNode(id))
    }

    /// Create a root node with room for `n_parts` parts and `n_children` children.
    pub fn new_node(&mut self, geometry: usize, n_parts: usize, n_children: usize) -> NodeId {
        let node = Node {
            parent: None,
            transform: Matrix4::identity(),
            geometry,
            parts: Vec::with_capacity(n_parts),
            children: Vec::with_capacity(n_children),
            part_capacity: n_parts,
            child_capacity: n_children,
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        };
        self.roots.push(id);
        id
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Matrix4<f32>) -> Result<(), SceneError> {
        self.get_mut(id)?.transform = transform;
        Ok(())
    }

    /// Reference part `part` of the node's geometry.
    pub fn add_part(&mut self, id: NodeId, part: usize) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        if node.parts.len() >= node.part_capacity {
            return Err(SceneError::NodeFull {
                node: id,
                what: "part",
                capacity: node.part_capacity,
            });
        }
        node.parts.push(part);
        Ok(())
    }

    /// Attach the root `child` below `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        let child_node = self.get(child)?;
        if child_node.parent.is_some() {
            return Err(SceneError::AlreadyParented(child));
        }
        let parent_node = self.get(parent)?;
        if parent_node.children.len() >= parent_node.child_capacity {
            return Err(SceneError::NodeFull {
                node: parent,
                what: "child",
                capacity: parent_node.child_capacity,
            });
        }
        if self.ancestors(parent).any(|id| id == child) {
            return Err(SceneError::Cycle { parent, child });
        }

        self.get_mut(parent)?.children.push(child);
        self.get_mut(child)?.parent = Some(parent);
        self.roots.retain(|&root| root != child);
        Ok(())
    }

    /// `id` followed by its parent chain up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.contains(id).then_some(id), move |&current| {
            self.get(current).ok().and_then(|node| node.parent)
        })
    }

    /// Product of local transforms from the root down to `id`.
    pub fn world_transform(&self, id: NodeId) -> Result<Matrix4<f32>, SceneError> {
        let mut world = self.get(id)?.transform;
        let mut current = self.get(id)?.parent;
        while let Some(parent) = current {
            let node = self.get(parent)?;
            world = node.transform * world;
            current = node.parent;
        }
        Ok(world)
    }

    /// Delete `id` and its whole subtree.
    pub fn delete(&mut self, id: NodeId) -> Result<(), SceneError> {
        let parent = self.get(id)?.parent;
        match parent {
            Some(parent) => self.get_mut(parent)?.children.retain(|&c| c != id),
            None => self.roots.retain(|&root| root != id),
        }
        self.free_subtree(id);
        Ok(())
    }

    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let slot = &mut self.slots[current.index()];
            if slot.generation != current.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                stack.extend(node.children);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(current.index);
            }
        }
    }

    /// Change a node's capacities in place.
    ///
    /// Parts beyond the new part capacity are dropped; children beyond the new
    /// child capacity are deleted together with their subtrees.
    pub fn resize(&mut self, id: NodeId, n_parts: usize, n_children: usize) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        node.parts.truncate(n_parts);
        node.part_capacity = n_parts;
        node.child_capacity = n_children;
        let excess = if node.children.len() > n_children {
            node.children.split_off(n_children)
        } else {
            Vec::new()
        };
        for child in excess {
            self.free_subtree(child);
        }
        Ok(())
    }

    /// Depth-first walk over every root's subtree, visiting nodes in pre-order
    /// together with their world transform.
    ///
    /// Uses a growable stack, so depth is bounded by memory only.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse {
            graph: self,
            stack: self
                .roots
                .iter()
                .rev()
                .map(|&root| (root, Matrix4::identity()))
                .collect(),
        }
    }
}

pub struct Traverse<'a> {
    graph: &'a SceneGraph,
    stack: Vec<(NodeId, Matrix4<f32>)>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = (NodeId, &'a Node, Matrix4<f32>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (id, parent_world) = self.stack.pop()?;
            if let Ok(node) = self.graph.get(id) {
                let world = parent_world * node.transform;
                self.stack
                    .extend(node.children.iter().rev().map(|&child| (child, world)));
                return Some((id, node, world));
            }
        }
    }
}
