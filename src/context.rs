use std::sync::Arc;

use anyhow::Context as _;
use winit::window::Window;

use crate::{
    config::{Config, SceneLimits},
    pipelines::scene::texture_array_len,
    render::Renderer,
    scene::Scene,
};

/// Device features the scene pipeline cannot run without.
pub fn required_features() -> wgpu::Features {
    wgpu::Features::INDIRECT_FIRST_INSTANCE
        | wgpu::Features::TEXTURE_BINDING_ARRAY
        | wgpu::Features::SAMPLED_TEXTURE_AND_STORAGE_BUFFER_ARRAY_NON_UNIFORM_INDEXING
}

pub fn required_limits(limits: &SceneLimits) -> wgpu::Limits {
    wgpu::Limits {
        max_binding_array_elements_per_shader_stage: texture_array_len(limits.texture_max),
        ..wgpu::Limits::default()
    }
}

/// Request a device with [`required_features`], failing with a readable error
/// when the adapter lacks any of them.
pub async fn request_device(
    adapter: &wgpu::Adapter,
    limits: &SceneLimits,
) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let missing = required_features().difference(adapter.features());
    if !missing.is_empty() {
        anyhow::bail!(
            "Adapter {} lacks required features {missing:?}",
            adapter.get_info().name
        );
    }
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: required_features(),
            required_limits: required_limits(limits),
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
        })
        .await
        .context("Cannot create the device")?;
    Ok((device, queue))
}

/// Window, surface, device and the renderer drawing into the surface.
#[derive(Debug)]
pub struct Context {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub renderer: Renderer,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>, engine_config: &Config) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;
        log::info!("Adapter: {:?}", adapter.get_info());
        let (device, queue) = request_device(&adapter, &engine_config.limits).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colour and rely on an sRGB surface for encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first().copied())
            .context("Surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let renderer = Renderer::new(
            &device,
            surface_format,
            config.width,
            config.height,
            engine_config,
        )?;

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            renderer,
            is_surface_configured: false,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.is_surface_configured = true;
            self.renderer.resize(&self.device, width, height);
        }
    }

    /// Reconfigure the surface with the window's current size.
    pub fn reconfigure(&mut self) {
        let size = self.window.inner_size();
        self.resize(size.width, size.height);
    }

    /// Draw `scene` into the next surface texture and present it.
    pub fn render(&mut self, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }
        self.renderer.write_to_buffers(&self.queue);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        self.renderer.render(&mut encoder, &view, scene);
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
