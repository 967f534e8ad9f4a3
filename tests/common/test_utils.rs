use indirect_ngin::{
    SceneLimits,
    data_structures::model::{MeshData, ModelVertex},
};

/// Unit cube centred on the origin, four vertices per face.
pub fn cube_mesh(material: Option<usize>) -> MeshData {
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for (n, u, v) in FACES {
        let base = vertices.len() as u32;
        for (s, t) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            vertices.push(ModelVertex {
                position: [0, 1, 2].map(|i| 0.5 * (n[i] + s * u[i] + t * v[i])),
                tex_coords: [(s + 1.0) / 2.0, (1.0 - t) / 2.0],
                normal: n,
                tangent: u,
                bitangent: v,
            });
        }
        indices.extend([0, 1, 2, 2, 3, 0].map(|i| base + i));
    }
    MeshData {
        name: "cube".to_string(),
        vertices,
        indices,
        material,
    }
}

/// A single triangle whose index list is repeated `repeat` times.
pub fn triangle_mesh(repeat: usize, material: Option<usize>) -> MeshData {
    let vertices = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]
        .map(|position| ModelVertex {
            position,
            normal: [0.0, 0.0, 1.0],
            ..Default::default()
        })
        .to_vec();
    MeshData {
        name: "triangle".to_string(),
        vertices,
        indices: [0, 1, 2].repeat(repeat),
        material,
    }
}

pub fn small_limits() -> SceneLimits {
    SceneLimits {
        geometry_max: 2,
        part_max: 4,
        material_max: 2,
        transform_max: 8,
        texture_max: 2,
    }
}

#[cfg(feature = "integration-tests")]
pub mod gpu {
    use indirect_ngin::{
        Config, Scene, SceneLimits, context::request_device, render::Renderer,
    };
    use instant::Duration;

    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
    // 4 bytes * 64 keeps rows 256 byte aligned for the copy
    pub const SIZE: u32 = 64;

    /// A device with the features the renderer needs, or `None` to skip the test.
    pub fn headless_device(limits: &SceneLimits) -> Option<(wgpu::Device, wgpu::Queue)> {
        futures::executor::block_on(async {
            let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
                backends: wgpu::Backends::PRIMARY,
                ..Default::default()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok()?;
            match request_device(&adapter, limits).await {
                Ok(device) => Some(device),
                Err(e) => {
                    eprintln!("Skipping GPU test: {e:#}");
                    None
                }
            }
        })
    }

    pub fn renderer(device: &wgpu::Device, config: &Config) -> Renderer {
        Renderer::new(device, FORMAT, SIZE, SIZE, config).expect("renderer")
    }

    /// Build, upload and draw `scene`, then read the frame back.
    pub fn render_to_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        renderer: &mut Renderer,
        scene: &mut Scene,
    ) -> image::RgbaImage {
        scene.build_cache().expect("cache");
        scene.write_to_buffers(device, queue, &renderer.scene_bind_group_layout);
        renderer.write_to_buffers(queue);

        let extent = wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        };
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Output Texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let output_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size: (4 * SIZE * SIZE) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Test Encoder"),
        });
        renderer.render(&mut encoder, &view, scene);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &output_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * SIZE),
                    rows_per_image: Some(SIZE),
                },
            },
            extent,
        );
        queue.submit(std::iter::once(encoder.finish()));

        futures::executor::block_on(async {
            let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
            let buffer_slice = output_buffer.slice(..);
            buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                tx.send(result).unwrap();
            });
            device
                .poll(wgpu::PollType::Wait {
                    submission_index: None,
                    timeout: Some(Duration::from_secs(3)),
                })
                .unwrap();
            rx.receive().await.unwrap().unwrap();
            let data = buffer_slice.get_mapped_range();
            image::RgbaImage::from_raw(SIZE, SIZE, data.to_vec()).unwrap()
        })
    }
}
