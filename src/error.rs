//! Error types for scene construction.
//!
//! Capacity and structural failures are reported as [`SceneError`]. Loaders and
//! GPU setup return `anyhow::Result` and carry a `SceneError` inside when the
//! root cause is one of these, so callers can `downcast_ref::<SceneError>()`.

use crate::data_structures::scene_graph::NodeId;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("geometry slot {slot} is out of range (limit {limit})")]
    GeometrySlot { slot: usize, limit: usize },
    #[error("geometry {slot} would hold {requested} parts, limit is {limit}")]
    PartCapacity {
        slot: usize,
        requested: usize,
        limit: usize,
    },
    #[error("scene would hold {requested} materials, limit is {limit}")]
    MaterialCapacity { requested: usize, limit: usize },
    #[error("scene needs {requested} instance transforms, limit is {limit}")]
    TransformCapacity { requested: usize, limit: usize },
    #[error("texture table is full ({capacity} slots)")]
    TextureTableFull { capacity: usize },
    #[error("texture key 0 is reserved for empty table slots")]
    ReservedTextureKey,
    #[error("scene would hold {requested} lights, limit is {limit}")]
    LightCapacity { requested: usize, limit: usize },
    #[error("node {0:?} does not exist or was deleted")]
    UnknownNode(NodeId),
    #[error("geometry {0} has never been loaded")]
    UnknownGeometry(usize),
    #[error("part {part} does not exist in geometry {geometry}")]
    UnknownPart { geometry: usize, part: usize },
    #[error("node {node:?} has no free {what} slot (capacity {capacity})")]
    NodeFull {
        node: NodeId,
        what: &'static str,
        capacity: usize,
    },
    #[error("attaching {child:?} below {parent:?} would create a cycle")]
    Cycle { parent: NodeId, child: NodeId },
    #[error("node {0:?} already has a parent")]
    AlreadyParented(NodeId),
    #[error("geometry {slot} would exceed the 32 bit index range")]
    IndexOverflow { slot: usize },
    #[error("part indices {start}..{end} lie outside the {n_indices} indices of geometry {slot}")]
    PartRange {
        slot: usize,
        start: u32,
        end: u64,
        n_indices: u32,
    },
}
