use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use crate::error::SceneError;

/// Number of light records in the light uniform.
pub const LIGHT_MAX: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightColor {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
}

/// Distance falloff `1 / (constant + linear * d + quadratic * d^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.09,
            quadratic: 0.032,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Directional {
        direction: [f32; 3],
        color: LightColor,
    },
    Point {
        position: [f32; 3],
        color: LightColor,
        attenuation: Attenuation,
    },
    Spot {
        position: [f32; 3],
        direction: [f32; 3],
        color: LightColor,
        attenuation: Attenuation,
        /// Inner and outer cone angles.
        cut_off: cgmath::Rad<f32>,
        outer_cut_off: cgmath::Rad<f32>,
    },
}

impl Light {
    pub fn to_raw(&self) -> LightRaw {
        let xyzw = |v: [f32; 3], w: f32| [v[0], v[1], v[2], w];
        match *self {
            Light::Directional { direction, color } => LightRaw {
                kind: 0,
                _padding: [0; 3],
                position_constant: [0.0; 4],
                direction_linear: xyzw(direction, 0.0),
                ambient_quadratic: xyzw(color.ambient, 0.0),
                diffuse_cut_off: xyzw(color.diffuse, 0.0),
                specular_outer_cut_off: xyzw(color.specular, 0.0),
            },
            Light::Point {
                position,
                color,
                attenuation,
            } => LightRaw {
                kind: 1,
                _padding: [0; 3],
                position_constant: xyzw(position, attenuation.constant),
                direction_linear: xyzw([0.0; 3], attenuation.linear),
                ambient_quadratic: xyzw(color.ambient, attenuation.quadratic),
                diffuse_cut_off: xyzw(color.diffuse, 0.0),
                specular_outer_cut_off: xyzw(color.specular, 0.0),
            },
            Light::Spot {
                position,
                direction,
                color,
                attenuation,
                cut_off,
                outer_cut_off,
            } => LightRaw {
                kind: 2,
                _padding: [0; 3],
                position_constant: xyzw(position, attenuation.constant),
                direction_linear: xyzw(direction, attenuation.linear),
                ambient_quadratic: xyzw(color.ambient, attenuation.quadratic),
                diffuse_cut_off: xyzw(color.diffuse, cut_off.0.cos()),
                specular_outer_cut_off: xyzw(color.specular, outer_cut_off.0.cos()),
            },
        }
    }
}

/// One light as the shader reads it: a kind tag and five vec4s (96 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightRaw {
    pub kind: u32,
    // Uniforms require 16 byte alignment for the following vec4s
    _padding: [u32; 3],
    pub position_constant: [f32; 4],
    pub direction_linear: [f32; 4],
    pub ambient_quadratic: [f32; 4],
    pub diffuse_cut_off: [f32; 4],
    pub specular_outer_cut_off: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub count: u32,
    _padding: [u32; 3],
    pub lights: [LightRaw; LIGHT_MAX],
}

impl LightUniform {
    pub fn new(lights: &[Light]) -> Result<Self, SceneError> {
        if lights.len() > LIGHT_MAX {
            return Err(SceneError::LightCapacity {
                requested: lights.len(),
                limit: LIGHT_MAX,
            });
        }
        let mut uniform = Self {
            count: lights.len() as u32,
            _padding: [0; 3],
            lights: [LightRaw::zeroed(); LIGHT_MAX],
        };
        for (raw, light) in uniform.lights.iter_mut().zip(lights) {
            *raw = light.to_raw();
        }
        Ok(uniform)
    }
}

/// The default scene light: white-ish directional light from above.
pub fn default_lights() -> Vec<Light> {
    vec![Light::Directional {
        direction: [0.6, -1.0, 0.3],
        color: LightColor {
            ambient: [0.3, 0.3, 0.3],
            diffuse: [0.8, 0.8, 0.8],
            specular: [1.0, 1.0, 1.0],
        },
    }]
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    dirty: bool,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, lights: &[Light]) -> Result<Self, SceneError> {
        let uniform = LightUniform::new(lights)?;
        let buffer = mk_buffer(device, &uniform);
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer);
        Ok(Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
            dirty: false,
        })
    }

    /// Replace all lights. Fails without changing anything when there are too many.
    pub fn set_lights(&mut self, lights: &[Light]) -> Result<(), SceneError> {
        self.uniform = LightUniform::new(lights)?;
        self.dirty = true;
        Ok(())
    }

    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue) {
        if self.dirty {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
            self.dirty = false;
        }
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: &LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[*light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}
