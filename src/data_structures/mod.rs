//! Engine data structures: geometry, scene graph, render cache and materials.
//!
//! - `model` holds the vertex layout and CPU-side imported meshes
//! - `geometry` stores shared vertex/index buffers and the parts cut from them
//! - `scene_graph` is the node arena with world transform composition
//! - `cache` groups instances into indirect draw commands
//! - `instance` holds the per-instance GPU records
//! - `material` and `texture_table` map materials to deduplicated textures
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod cache;
pub mod geometry;
pub mod instance;
pub mod material;
pub mod model;
pub mod scene_graph;
pub mod texture;
pub mod texture_table;
