//! The scene: geometry, node tree, materials, textures and the render cache.
//!
//! [`Scene`] ties the CPU-side containers together and owns the GPU buffers
//! the scene shader reads (transform table, assign buffer, material table,
//! texture array). Everything except [`Scene::write_to_buffers`] and drawing
//! works without a device, so scenes can be assembled and inspected headless.
//!
//! Mutations mark the render cache dirty; [`Scene::build_cache`] rebuilds it
//! and [`Scene::write_to_buffers`] uploads whatever changed.

use std::{collections::HashMap, ops::Range, path::Path};

use image::RgbaImage;

use crate::{
    config::SceneLimits,
    data_structures::{
        cache::RenderCache,
        geometry::{GeometryStore, Part},
        instance::{AssignRaw, TransformRaw},
        material::{Material, MaterialRaw, MaterialTable, Placeholders},
        model::MeshData,
        scene_graph::{NodeId, SceneGraph},
        texture::{self, Texture},
        texture_table::{TextureKey, TextureSlot, TextureTable},
    },
    error::SceneError,
    pipelines::scene::{SceneGlobals, texture_array_len},
    resources::{self, ImportOptions, ImportedMaterial, ImportedNode, ImportedScene, TextureSource},
};

/// A texture table entry: the decoded image until upload, then the GPU texture.
#[derive(Debug)]
pub struct SceneTexture {
    image: Option<RgbaImage>,
    is_normal_map: bool,
    gpu: Option<Texture>,
}

impl SceneTexture {
    pub fn new(image: Option<RgbaImage>, is_normal_map: bool) -> Self {
        Self {
            image,
            is_normal_map,
            gpu: None,
        }
    }

    pub fn is_normal_map(&self) -> bool {
        self.is_normal_map
    }

    pub fn is_uploaded(&self) -> bool {
        self.gpu.is_some()
    }

    /// `true` when the image could not be decoded; materials use the
    /// placeholder of the matching role instead.
    pub fn is_missing(&self) -> bool {
        self.image.is_none() && self.gpu.is_none()
    }
}

#[derive(Debug)]
struct SceneBuffers {
    globals: wgpu::Buffer,
    transforms: wgpu::Buffer,
    assigns: wgpu::Buffer,
    materials: wgpu::Buffer,
    placeholders: [Texture; Placeholders::COUNT as usize],
    sampler: wgpu::Sampler,
    bind_group: Option<wgpu::BindGroup>,
}

impl SceneBuffers {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue, limits: &SceneLimits) -> Self {
        let mk_buffer = |label: &str, size: usize, usage: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: size.max(16) as wgpu::BufferAddress,
                usage: usage | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let storage = wgpu::BufferUsages::STORAGE;
        Self {
            globals: mk_buffer(
                "Scene Globals Buffer",
                std::mem::size_of::<SceneGlobals>(),
                wgpu::BufferUsages::UNIFORM,
            ),
            transforms: mk_buffer(
                "Transform Buffer",
                limits.transform_max * std::mem::size_of::<TransformRaw>(),
                storage,
            ),
            assigns: mk_buffer(
                "Assign Buffer",
                limits.transform_max * std::mem::size_of::<AssignRaw>(),
                wgpu::BufferUsages::VERTEX,
            ),
            materials: mk_buffer(
                "Material Buffer",
                limits.material_max * std::mem::size_of::<MaterialRaw>(),
                storage,
            ),
            placeholders: [
                Texture::from_color(device, queue, [255, 255, 255, 255], "placeholder_white", false),
                Texture::from_color(device, queue, [0, 0, 0, 255], "placeholder_black", false),
                Texture::from_color(device, queue, [128, 128, 255, 255], "placeholder_normal", true),
            ],
            sampler: texture::create_default_sampler(device),
            bind_group: None,
        }
    }
}

#[derive(Debug)]
pub struct Scene {
    limits: SceneLimits,
    store: GeometryStore,
    graph: SceneGraph,
    materials: MaterialTable,
    textures: TextureTable<SceneTexture>,
    cache: RenderCache,
    material_records: Vec<MaterialRaw>,
    cache_dirty: bool,
    upload_pending: bool,
    gpu: Option<SceneBuffers>,
}

impl Scene {
    pub fn new(limits: SceneLimits) -> Self {
        Self {
            limits,
            store: GeometryStore::new(limits),
            graph: SceneGraph::new(),
            materials: MaterialTable::new(limits.material_max),
            textures: TextureTable::new(limits.texture_max),
            cache: RenderCache::default(),
            material_records: Vec::new(),
            cache_dirty: false,
            upload_pending: false,
            gpu: None,
        }
    }

    pub fn limits(&self) -> &SceneLimits {
        &self.limits
    }

    pub fn store(&self) -> &GeometryStore {
        &self.store
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Mutable access to the node tree; the render cache is rebuilt on the next frame.
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        self.cache_dirty = true;
        &mut self.graph
    }

    pub fn materials(&self) -> &MaterialTable {
        &self.materials
    }

    pub fn textures(&self) -> &TextureTable<SceneTexture> {
        &self.textures
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Material records as last built, indexed like [`Scene::materials`].
    pub fn material_records(&self) -> &[MaterialRaw] {
        &self.material_records
    }

    pub fn is_cache_dirty(&self) -> bool {
        self.cache_dirty
    }

    pub fn mark_dirty(&mut self) {
        self.cache_dirty = true;
    }

    pub fn add_material(&mut self, material: Material) -> Result<u32, SceneError> {
        let index = self.materials.push(material)?;
        self.cache_dirty = true;
        Ok(index)
    }

    /// Append a part to `slot` that reuses index ranges already loaded there.
    pub fn add_part(&mut self, slot: usize, part: Part) -> Result<usize, SceneError> {
        let index = self.store.add_part(slot, part)?;
        self.cache_dirty = true;
        Ok(index)
    }

    /// Insert a decoded image under `key`, or return the slot already holding `key`.
    pub fn insert_texture(
        &mut self,
        key: TextureKey,
        image: RgbaImage,
        is_normal_map: bool,
    ) -> Result<TextureSlot, SceneError> {
        let slot = self
            .textures
            .insert_with(key, || SceneTexture::new(Some(image), is_normal_map))?;
        self.cache_dirty = true;
        Ok(slot)
    }

    /// Insert a 1x1 texture of one colour keyed by `name`.
    pub fn insert_texture_color(
        &mut self,
        name: &str,
        rgba: [u8; 4],
        is_normal_map: bool,
    ) -> Result<TextureSlot, SceneError> {
        let image = RgbaImage::from_pixel(1, 1, image::Rgba(rgba));
        self.insert_texture(TextureKey::from_name(name), image, is_normal_map)
    }

    /// Append meshes to geometry `slot` together with their materials.
    ///
    /// Mesh material indices refer to `materials`. Either everything is
    /// added or nothing is.
    pub fn load_meshes(
        &mut self,
        slot: usize,
        meshes: &[MeshData],
        materials: &[Material],
    ) -> Result<Range<usize>, SceneError> {
        self.store.can_load_meshes(slot, meshes)?;
        self.materials.can_add(materials.len())?;
        let offset = self.materials.len() as u32;
        let parts = self.store.load(slot, meshes, offset)?;
        self.materials.extend(materials)?;
        self.cache_dirty = true;
        Ok(parts)
    }

    /// Import a model file into geometry `slot` and instantiate its node tree.
    ///
    /// The returned root node carries `transform`; it is a new tree root.
    /// Capacity is checked before anything is inserted, so a failed load
    /// leaves the scene unchanged. Textures that cannot be read are logged
    /// and rendered with a placeholder.
    pub async fn load(
        &mut self,
        path: impl AsRef<Path>,
        slot: usize,
        transform: cgmath::Matrix4<f32>,
        options: &ImportOptions,
    ) -> anyhow::Result<NodeId> {
        let path = path.as_ref();
        let imported = resources::import_scene(path, options).await?;
        self.check_import(&imported, slot)?;

        let sources = self.new_texture_sources(&imported);
        let images = futures::future::join_all(sources.iter().map(|s| s.load())).await;
        let mut decoded = HashMap::new();
        for (source, image) in sources.iter().zip(images) {
            match image {
                Ok(image) => {
                    decoded.insert(source.key(), image);
                }
                Err(e) => log::error!("Cannot load texture {}: {e:#}", source.name()),
            }
        }

        let root = self.insert_imported(&imported, slot, transform, decoded)?;
        log::info!(
            "Loaded {} into geometry {slot}: {} meshes, {} materials, {} nodes",
            path.display(),
            imported.meshes.len(),
            imported.materials.len(),
            imported.root.count()
        );
        Ok(root)
    }

    fn check_import(&self, imported: &ImportedScene, slot: usize) -> Result<(), SceneError> {
        self.store.can_load_meshes(slot, &imported.meshes)?;
        self.materials.can_add(imported.materials.len())?;
        let needed = self.new_texture_sources(imported).len();
        if needed > self.textures.free_slots() {
            return Err(SceneError::TextureTableFull {
                capacity: self.textures.capacity(),
            });
        }
        Ok(())
    }

    /// Distinct texture sources of `imported` that are not in the table yet.
    fn new_texture_sources(&self, imported: &ImportedScene) -> Vec<TextureSource> {
        let mut sources: Vec<TextureSource> = Vec::new();
        let referenced = imported
            .materials
            .iter()
            .flat_map(|m| [&m.diffuse, &m.specular, &m.normal])
            .flatten();
        for source in referenced {
            let key = source.key();
            if self.textures.find(key).is_none() && sources.iter().all(|s| s.key() != key) {
                sources.push(source.clone());
            }
        }
        sources
    }

    /// Insert an already imported scene; `images` holds the decoded textures by key.
    pub fn insert_imported(
        &mut self,
        imported: &ImportedScene,
        slot: usize,
        transform: cgmath::Matrix4<f32>,
        mut images: HashMap<TextureKey, RgbaImage>,
    ) -> Result<NodeId, SceneError> {
        self.check_import(imported, slot)?;

        let materials = imported
            .materials
            .iter()
            .map(|m| self.imported_material(m, &mut images))
            .collect::<Result<Vec<_>, _>>()?;
        let parts = self.load_meshes(slot, &imported.meshes, &materials)?;

        let graph = &mut self.graph;
        let root = instantiate(graph, &imported.root, slot, parts.start)?;
        let local = graph.get(root)?.transform;
        graph.set_transform(root, transform * local)?;
        Ok(root)
    }

    fn imported_material(
        &mut self,
        material: &ImportedMaterial,
        images: &mut HashMap<TextureKey, RgbaImage>,
    ) -> Result<Material, SceneError> {
        let mut slot = |source: &Option<TextureSource>, is_normal_map: bool| {
            source
                .as_ref()
                .map(|source| {
                    let key = source.key();
                    self.textures.insert_with(key, || {
                        SceneTexture::new(images.remove(&key), is_normal_map)
                    })
                })
                .transpose()
        };
        Ok(Material {
            diffuse: slot(&material.diffuse, false)?,
            specular: slot(&material.specular, false)?,
            normal: slot(&material.normal, true)?,
            shininess: material.shininess,
        })
    }

    /// Rebuild the render cache and material records if anything changed.
    pub fn build_cache(&mut self) -> Result<(), SceneError> {
        if !self.cache_dirty {
            return Ok(());
        }
        self.cache = RenderCache::build(&self.graph, &self.store)?;
        self.material_records = self
            .materials
            .to_raw(&mut self.textures, |t| !t.is_missing());
        self.cache_dirty = false;
        self.upload_pending = true;
        log::debug!(
            "Render cache: {} objects, {} commands, {} instances",
            self.cache.objects().len(),
            self.cache.command_count(),
            self.cache.instance_count()
        );
        Ok(())
    }

    /// Upload new geometry, textures and the last built cache.
    pub fn write_to_buffers(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
    ) {
        self.store.write_to_buffers(device, queue);

        let mut textures_changed = false;
        for (slot, entry) in self.textures.iter_mut() {
            let texture = &mut entry.texture;
            if let Some(image) = texture.image.take() {
                let label = format!("scene_texture_{}", slot.index());
                texture.gpu = Some(Texture::from_rgba(
                    device,
                    queue,
                    &image,
                    Some(&label),
                    texture.is_normal_map,
                ));
                textures_changed = true;
            }
        }

        let gpu = self
            .gpu
            .get_or_insert_with(|| SceneBuffers::new(device, queue, &self.limits));
        if textures_changed || gpu.bind_group.is_none() {
            let bind_group = mk_bind_group(device, layout, gpu, &self.textures);
            gpu.bind_group = Some(bind_group);
        }

        if !self.upload_pending {
            return;
        }
        let globals = SceneGlobals {
            n_instances: self.cache.instance_count() as u32,
            n_materials: self.material_records.len() as u32,
            n_textures: self.textures.len() as u32,
            _padding: 0,
        };
        queue.write_buffer(&gpu.globals, 0, bytemuck::cast_slice(&[globals]));
        queue.write_buffer(&gpu.transforms, 0, bytemuck::cast_slice(self.cache.transforms()));
        queue.write_buffer(&gpu.assigns, 0, bytemuck::cast_slice(self.cache.assigns()));
        queue.write_buffer(&gpu.materials, 0, bytemuck::cast_slice(&self.material_records));

        for (slot, geometry) in self.store.iter_mut() {
            match self.cache.objects().iter().find(|o| o.geometry == slot) {
                Some(object) => geometry.write_commands(device, queue, slot, &object.commands),
                None => geometry.clear_commands(),
            }
        }
        self.upload_pending = false;
    }
}

/// Create the node tree for `node` and its children; returns the subtree root.
fn instantiate(
    graph: &mut SceneGraph,
    node: &ImportedNode,
    slot: usize,
    first_part: usize,
) -> Result<NodeId, SceneError> {
    let id = graph.new_node(slot, node.meshes.len(), node.children.len());
    graph.set_transform(id, node.transform)?;
    for &mesh in &node.meshes {
        graph.add_part(id, first_part + mesh)?;
    }
    for child in &node.children {
        let child = instantiate(graph, child, slot, first_part)?;
        graph.add_child(id, child)?;
    }
    Ok(id)
}

fn mk_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    gpu: &SceneBuffers,
    textures: &TextureTable<SceneTexture>,
) -> wgpu::BindGroup {
    let white = &gpu.placeholders[0].view;
    let mut views: Vec<&wgpu::TextureView> = vec![white; textures.capacity()];
    for (slot, entry) in textures.iter() {
        if let Some(texture) = &entry.texture.gpu {
            views[slot.index()] = &texture.view;
        }
    }
    views.extend(gpu.placeholders.iter().map(|p| &p.view));
    debug_assert_eq!(views.len() as u32, texture_array_len(textures.capacity()));

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: gpu.globals.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: gpu.transforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: gpu.materials.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureViewArray(&views),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(&gpu.sampler),
            },
        ],
        label: Some("scene_bind_group"),
    })
}

/// Draws every cached object with one multi-draw-indirect call per geometry.
///
/// Expects the camera and light bind groups (0 and 1) to be set already.
pub trait DrawScene<'a> {
    fn draw_scene(&mut self, scene: &'a Scene);
}

impl<'a, 'b> DrawScene<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_scene(&mut self, scene: &'b Scene) {
        let Some(gpu) = &scene.gpu else {
            return;
        };
        let Some(bind_group) = &gpu.bind_group else {
            return;
        };
        self.set_bind_group(2, bind_group, &[]);
        self.set_vertex_buffer(1, gpu.assigns.slice(..));

        for (slot, geometry) in scene.store.iter() {
            let Some(buffers) = geometry.buffers() else {
                continue;
            };
            let Some(indirect) = &buffers.indirect else {
                continue;
            };
            if buffers.indirect_count == 0 {
                continue;
            }
            if geometry.is_dirty() {
                log::warn!("Geometry {slot} has data that was not uploaded yet");
            }
            self.set_vertex_buffer(0, buffers.vertex.slice(..));
            self.set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint32);
            self.multi_draw_indexed_indirect(indirect, 0, buffers.indirect_count);
        }
    }
}
