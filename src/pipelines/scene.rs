use std::num::NonZeroU32;

use crate::{
    data_structures::{
        instance::AssignRaw,
        material::Placeholders,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::{DepthTest, mk_render_pipeline},
};

/// Per-frame counters the scene shader uses to clamp its lookups.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SceneGlobals {
    pub n_instances: u32,
    pub n_materials: u32,
    pub n_textures: u32,
    pub _padding: u32,
}

/// Length of the texture binding array: every table slot plus the placeholders.
pub fn texture_array_len(texture_max: usize) -> u32 {
    texture_max as u32 + Placeholders::COUNT
}

/// Group 2: globals, transform table, material table, texture array and sampler.
pub fn mk_scene_bind_group_layout(device: &wgpu::Device, texture_max: usize) -> wgpu::BindGroupLayout {
    let storage = |binding, visibility| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            storage(1, wgpu::ShaderStages::VERTEX),
            storage(2, wgpu::ShaderStages::FRAGMENT),
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: NonZeroU32::new(texture_array_len(texture_max)),
            },
            wgpu::BindGroupLayoutEntry {
                binding: 4,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
        label: Some("scene_bind_group_layout"),
    })
}

pub fn mk_scene_pipeline(
    device: &wgpu::Device,
    color_format: wgpu::TextureFormat,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    light_bind_group_layout: &wgpu::BindGroupLayout,
    scene_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Scene Pipeline Layout"),
        bind_group_layouts: &[
            camera_bind_group_layout,
            light_bind_group_layout,
            scene_bind_group_layout,
        ],
        push_constant_ranges: &[],
    });

    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Scene Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("scene.wgsl").into()),
    };

    mk_render_pipeline(
        device,
        "Scene Pipeline",
        &layout,
        color_format,
        Some(wgpu::BlendState::REPLACE),
        Some(DepthTest::opaque(Texture::DEPTH_FORMAT)),
        Some(wgpu::Face::Back),
        &[ModelVertex::desc(), AssignRaw::desc()],
        shader,
    )
}
