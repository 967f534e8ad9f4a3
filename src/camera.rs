//! First-person camera, projection and the camera uniform.
//!
//! - [`Camera`] is a position plus an orientation quaternion
//! - [`Projection`] is a perspective projection that follows the surface size
//! - [`CameraController`] turns queued input into camera motion
//! - [`CameraResources`] owns the uniform buffer and only rewrites it when the
//!   view or the projection changed

use cgmath::{InnerSpace, Matrix4, Point3, Quaternion, Rad, Rotation, Rotation3, Vector3};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{event::MouseButton, keyboard::KeyCode};

use crate::{config::CameraConfig, input::InputEvent};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Pitch limit; `right()` is undefined when looking straight up or down.
pub const MAX_PITCH: Rad<f32> = Rad(std::f32::consts::FRAC_PI_2 - 0.01);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub rotation: Quaternion<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<P: Into<Point3<f32>>>(position: P) -> Self {
        Self {
            position: position.into(),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
        }
    }

    /// Viewing direction: the rotated `-z` axis.
    pub fn front(&self) -> Vector3<f32> {
        self.rotation.rotate_vector(-Vector3::unit_z())
    }

    pub fn right(&self) -> Vector3<f32> {
        self.front().cross(self.up).normalize()
    }

    /// Angle between the viewing direction and the horizon, positive upwards.
    pub fn pitch(&self) -> Rad<f32> {
        Rad(self.front().dot(self.up).clamp(-1.0, 1.0).asin())
    }

    /// Pitch about the camera's right axis, stopping at [`MAX_PITCH`].
    pub fn rotate_x<A: Into<Rad<f32>>>(&mut self, angle: A) {
        let angle: Rad<f32> = angle.into();
        let pitch = self.pitch();
        let target = (pitch + angle).0.clamp(-MAX_PITCH.0, MAX_PITCH.0);
        let angle = Rad(target) - pitch;
        if angle.0 == 0.0 {
            return;
        }
        let q = Quaternion::from_axis_angle(self.right(), angle);
        self.rotation = (q * self.rotation).normalize();
    }

    /// Yaw about the world up axis.
    pub fn rotate_y<A: Into<Rad<f32>>>(&mut self, angle: A) {
        let q = Quaternion::from_axis_angle(self.up, angle);
        self.rotation = (q * self.rotation).normalize();
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(self.position, self.front(), self.up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Projection, view and eye position: 144 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub projection: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub position: [f32; 4],
}

impl CameraUniform {
    pub fn new(camera: &Camera, projection: &Projection) -> Self {
        let mut uniform = Self {
            projection: projection.calc_matrix().into(),
            view: camera.view_matrix().into(),
            position: [0.0; 4],
        };
        uniform.update_view(camera);
        uniform
    }

    pub fn update_view(&mut self, camera: &Camera) {
        self.view = camera.view_matrix().into();
        self.position = camera.position.to_homogeneous().into();
    }

    pub fn update_projection(&mut self, projection: &Projection) {
        self.projection = projection.calc_matrix().into();
    }
}

/// Moves a [`Camera`] from WASD/Space/Shift and right-button mouse drags.
#[derive(Debug, Clone)]
pub struct CameraController {
    movement_speed: f32,
    rotation_speed: f32,
    forward: f32,
    backward: f32,
    left: f32,
    right: f32,
    up: f32,
    down: f32,
    looking: bool,
    cursor: Option<(f64, f64)>,
    mouse_delta: (f64, f64),
}

impl CameraController {
    pub fn new(movement_speed: f32, rotation_speed: f32) -> Self {
        Self {
            movement_speed,
            rotation_speed,
            forward: 0.0,
            backward: 0.0,
            left: 0.0,
            right: 0.0,
            up: 0.0,
            down: 0.0,
            looking: false,
            cursor: None,
            mouse_delta: (0.0, 0.0),
        }
    }

    /// Returns whether the event was relevant for the camera.
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        match *event {
            InputEvent::Keyboard { key, pressed } => {
                let amount = if pressed { 1.0 } else { 0.0 };
                match key {
                    KeyCode::KeyW | KeyCode::ArrowUp => self.forward = amount,
                    KeyCode::KeyS | KeyCode::ArrowDown => self.backward = amount,
                    KeyCode::KeyA | KeyCode::ArrowLeft => self.left = amount,
                    KeyCode::KeyD | KeyCode::ArrowRight => self.right = amount,
                    KeyCode::Space => self.up = amount,
                    KeyCode::ShiftLeft => self.down = amount,
                    _ => return false,
                }
                true
            }
            InputEvent::MouseButton {
                button: MouseButton::Right,
                pressed,
            } => {
                self.looking = pressed;
                true
            }
            InputEvent::MouseMove { x, y } => {
                if let Some((last_x, last_y)) = self.cursor
                    && self.looking
                {
                    self.mouse_delta.0 += x - last_x;
                    self.mouse_delta.1 += y - last_y;
                }
                self.cursor = Some((x, y));
                self.looking
            }
            _ => false,
        }
    }

    /// Apply the accumulated input; returns whether the camera moved.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) -> bool {
        let dt = dt.as_secs_f32();
        let step = self.movement_speed * dt;
        let front = camera.front();
        let right = camera.right();
        let up = camera.up;

        let moves = [
            (front, self.forward - self.backward),
            (right, self.right - self.left),
            (up, self.up - self.down),
        ];
        let mut changed = false;
        for (axis, amount) in moves {
            if amount != 0.0 {
                camera.position += axis * amount * step;
                changed = true;
            }
        }

        let (dx, dy) = std::mem::take(&mut self.mouse_delta);
        if dx != 0.0 {
            camera.rotate_y(Rad(-dx as f32 * dt * self.rotation_speed));
            changed = true;
        }
        if dy != 0.0 {
            camera.rotate_x(Rad(-dy as f32 * dt * self.rotation_speed));
            changed = true;
        }
        changed
    }
}

/// Camera state plus its uniform buffer and bind group (group 0).
#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub projection: Projection,
    pub controller: CameraController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    update_view: bool,
    update_projection: bool,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, config: &CameraConfig, width: u32, height: u32) -> Self {
        let camera = Camera::new(config.position);
        let projection = Projection::new(width, height, Rad(config.fov), config.near, config.far);
        let controller = CameraController::new(config.movement_speed, config.rotation_speed);
        let uniform = CameraUniform::new(&camera, &projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            projection,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
            update_view: false,
            update_projection: false,
        }
    }

    pub fn process_event(&mut self, event: &InputEvent) {
        match *event {
            InputEvent::Resize { width, height } if width > 0 && height > 0 => {
                self.resize(width, height)
            }
            _ => {
                self.controller.process_event(event);
            }
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.projection.resize(width, height);
        self.update_projection = true;
    }

    /// Mark the view as changed after moving `camera` directly.
    pub fn touch(&mut self) {
        self.update_view = true;
    }

    pub fn update(&mut self, dt: Duration) {
        if self.controller.update(&mut self.camera, dt) {
            self.update_view = true;
        }
    }

    /// Write the uniform if the view or the projection changed since the last call.
    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue) {
        if !(self.update_view || self.update_projection) {
            return;
        }
        if self.update_projection {
            self.uniform.update_projection(&self.projection);
            self.update_projection = false;
        }
        if self.update_view {
            self.uniform.update_view(&self.camera);
            self.update_view = false;
        }
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
