//! Engine configuration.
//!
//! [`Config`] collects window, camera and scene capacity settings. All limits
//! are checked explicitly by the owning component; exceeding one yields a
//! [`crate::error::SceneError`] instead of silently truncating data.

use std::path::PathBuf;

/// Capacity limits for the scene containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneLimits {
    pub geometry_max: usize,
    pub part_max: usize,
    pub material_max: usize,
    pub transform_max: usize,
    pub texture_max: usize,
}

impl Default for SceneLimits {
    fn default() -> Self {
        Self {
            geometry_max: 8,
            part_max: 512,
            material_max: 8,
            transform_max: 512,
            texture_max: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    pub position: [f32; 3],
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub movement_speed: f32,
    pub rotation_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            fov: std::f32::consts::FRAC_PI_3,
            near: 0.1,
            far: 100.0,
            movement_speed: 5.0,
            rotation_speed: 0.1,
        }
    }
}

/// Six cube map faces in the order right, left, top, bottom, front, back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkyboxFaces(pub [PathBuf; 6]);

impl SkyboxFaces {
    /// `right.jpg`, `left.jpg`, ... inside `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>, extension: &str) -> Self {
        let dir = dir.into();
        let face = |name: &str| dir.join(format!("{name}.{extension}"));
        Self([
            face("right"),
            face("left"),
            face("top"),
            face("bottom"),
            face("front"),
            face("back"),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub camera: CameraConfig,
    pub limits: SceneLimits,
    pub event_queue_size: usize,
    pub clear_colour: wgpu::Color,
    pub skybox: Option<SkyboxFaces>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "indirect-ngin".to_string(),
            camera: CameraConfig::default(),
            limits: SceneLimits::default(),
            event_queue_size: 48,
            clear_colour: wgpu::Color::BLACK,
            skybox: None,
        }
    }
}
