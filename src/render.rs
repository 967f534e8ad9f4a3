//! Frame composition.
//!
//! [`Renderer`] owns everything a frame needs besides the scene itself: the
//! camera and light uniforms, the scene and skybox pipelines, the depth
//! buffer and the clear colour. It renders into any colour view of the
//! format it was created for, so the same code drives the window surface and
//! offscreen targets.

use instant::Duration;

use crate::{
    camera::CameraResources,
    config::Config,
    data_structures::texture::Texture,
    input::InputEvent,
    pipelines::{
        light::{LightResources, default_lights},
        scene::{mk_scene_bind_group_layout, mk_scene_pipeline},
        skybox::{DrawSkybox, Skybox, mk_skybox_bind_group_layout, mk_skybox_pipeline},
    },
    scene::{DrawScene, Scene},
};

#[derive(Debug)]
pub struct Renderer {
    pub camera: CameraResources,
    pub light: LightResources,
    pub clear_colour: wgpu::Color,
    pub skybox: Option<Skybox>,
    pub scene_bind_group_layout: wgpu::BindGroupLayout,
    pub skybox_bind_group_layout: wgpu::BindGroupLayout,
    scene_pipeline: wgpu::RenderPipeline,
    skybox_pipeline: wgpu::RenderPipeline,
    depth_texture: Texture,
    format: wgpu::TextureFormat,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        config: &Config,
    ) -> anyhow::Result<Self> {
        let camera = CameraResources::new(device, &config.camera, width, height);
        let light = LightResources::new(device, &default_lights())?;
        let scene_bind_group_layout = mk_scene_bind_group_layout(device, config.limits.texture_max);
        let skybox_bind_group_layout = mk_skybox_bind_group_layout(device);
        let scene_pipeline = mk_scene_pipeline(
            device,
            format,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            &scene_bind_group_layout,
        );
        let skybox_pipeline = mk_skybox_pipeline(
            device,
            format,
            &camera.bind_group_layout,
            &skybox_bind_group_layout,
        );
        let depth_texture = Texture::create_depth_texture(device, [width, height], "depth_texture");

        Ok(Self {
            camera,
            light,
            clear_colour: config.clear_colour,
            skybox: None,
            scene_bind_group_layout,
            skybox_bind_group_layout,
            scene_pipeline,
            skybox_pipeline,
            depth_texture,
            format,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.resize(width, height);
        self.depth_texture = Texture::create_depth_texture(device, [width, height], "depth_texture");
    }

    /// Decode the faces and use them as background; a failure leaves the old skybox in place.
    pub async fn load_skybox(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &crate::config::SkyboxFaces,
    ) -> anyhow::Result<()> {
        let skybox = Skybox::load(device, queue, &self.skybox_bind_group_layout, faces).await?;
        self.skybox = Some(skybox);
        Ok(())
    }

    pub fn process_event(&mut self, event: &InputEvent) {
        self.camera.process_event(event);
    }

    pub fn update(&mut self, dt: Duration) {
        self.camera.update(dt);
    }

    /// Upload the camera and light uniforms if they changed.
    pub fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.camera.write_to_buffer(queue);
        self.light.write_to_buffer(queue);
    }

    /// Record the scene pass into `encoder`, targeting `view`.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, scene: &Scene) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_colour),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_texture.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(&self.scene_pipeline);
        render_pass.set_bind_group(0, &self.camera.bind_group, &[]);
        render_pass.set_bind_group(1, &self.light.bind_group, &[]);
        render_pass.draw_scene(scene);

        if let Some(skybox) = &self.skybox {
            render_pass.set_pipeline(&self.skybox_pipeline);
            render_pass.draw_skybox(skybox, &self.camera.bind_group);
        }
    }
}
