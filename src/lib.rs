//! indirect-ngin
//!
//! A small real-time 3D renderer built around GPU-driven instancing. Models
//! are appended into a handful of shared geometry buffers, placed through a
//! node tree, and drawn with one multi-draw-indirect call per geometry: the
//! render cache groups every `(node, part)` pair by geometry and index range
//! so that identical parts become a single instanced draw command.
//!
//! High-level modules
//! - `camera`: first-person camera, projection and camera uniform
//! - `config`: window, camera and capacity settings
//! - `context`: window, surface, device and queue
//! - `data_structures`: geometry store, node tree, render cache, materials, texture table
//! - `error`: the error type of all capacity and structure checks
//! - `flow`: the event loop and the [`flow::GraphicsFlow`] trait
//! - `input`: bounded queue of input events
//! - `pipelines`: scene, skybox and light GPU resources and shaders
//! - `render`: frame composition
//! - `resources`: OBJ and glTF import, image decoding
//! - `scene`: the container tying everything together
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod input;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
pub use config::{Config, SceneLimits};
pub use error::SceneError;
pub use scene::Scene;
pub use winit::keyboard::KeyCode;
