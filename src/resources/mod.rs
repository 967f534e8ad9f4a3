//! Loading meshes, materials and images from external files.
//!
//! [`import_scene`] turns an OBJ or glTF file into an [`ImportedScene`]: CPU
//! side meshes, materials referencing texture sources, and the node hierarchy
//! with local transforms. Nothing here touches the GPU; the scene decides
//! what to upload and when.
//!
//! Texture coordinates are normalised to wgpu's top-left origin for every
//! format; [`ImportOptions::flip_uvs`] flips them once more on request.

use std::{
    io::{BufReader, Cursor},
    path::{Path, PathBuf},
};

use anyhow::Context;
use cgmath::SquareMatrix;

use crate::data_structures::model::MeshData;

pub mod mesh;
pub mod texture;

pub use texture::TextureSource;

/// Post-processing applied while importing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub flip_uvs: bool,
    pub generate_tangents: bool,
    pub triangulate: bool,
    pub join_identical_vertices: bool,
    /// Drop points and lines instead of failing the import.
    pub sort_by_primitive_type: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            flip_uvs: false,
            generate_tangents: true,
            triangulate: true,
            join_identical_vertices: true,
            sort_by_primitive_type: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    pub diffuse: Option<TextureSource>,
    pub specular: Option<TextureSource>,
    pub normal: Option<TextureSource>,
    pub shininess: f32,
}

impl Default for ImportedMaterial {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            diffuse: None,
            specular: None,
            normal: None,
            shininess: 32.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedNode {
    pub name: String,
    pub transform: cgmath::Matrix4<f32>,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<ImportedNode>,
}

impl ImportedNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: cgmath::Matrix4::identity(),
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(ImportedNode::count).sum::<usize>()
    }
}

#[derive(Debug, Clone)]
pub struct ImportedScene {
    pub meshes: Vec<MeshData>,
    pub materials: Vec<ImportedMaterial>,
    pub root: ImportedNode,
}

impl ImportedScene {
    /// Give material-less meshes a default material appended to `materials`.
    pub fn assign_default_material(&mut self) {
        if self.meshes.iter().all(|m| m.material.is_some()) {
            return;
        }
        let default = self.materials.len();
        self.materials.push(ImportedMaterial::default());
        for mesh in self.meshes.iter_mut().filter(|m| m.material.is_none()) {
            mesh.material = Some(default);
        }
    }
}

pub async fn load_string(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))
}

pub async fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Could not read {}", path.display()))
}

fn base_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Import an OBJ or glTF/GLB file, chosen by extension.
pub async fn import_scene(path: &Path, options: &ImportOptions) -> anyhow::Result<ImportedScene> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase());
    let mut scene = match extension.as_deref() {
        Some("obj") => import_obj(path, options).await?,
        Some("gltf") | Some("glb") => import_gltf(path, options).await?,
        other => anyhow::bail!("Unsupported model format {:?} for {}", other, path.display()),
    };
    for mesh in scene.meshes.iter_mut() {
        mesh::post_process(mesh, options);
    }
    log::info!(
        "Imported {}: {} meshes, {} materials, {} nodes",
        path.display(),
        scene.meshes.len(),
        scene.materials.len(),
        scene.root.count()
    );
    Ok(scene)
}

async fn import_obj(path: &Path, options: &ImportOptions) -> anyhow::Result<ImportedScene> {
    let dir = base_dir(path);
    let obj_text = load_string(path).await?;
    let mut obj_reader = BufReader::new(Cursor::new(obj_text));

    let (models, obj_materials) = tobj::load_obj_buf_async(
        &mut obj_reader,
        &tobj::LoadOptions {
            triangulate: options.triangulate,
            single_index: true,
            ..Default::default()
        },
        |p| {
            let mtl_path = dir.join(p);
            async move {
                match load_string(&mtl_path).await {
                    Ok(mat_text) => tobj::load_mtl_buf(&mut BufReader::new(Cursor::new(mat_text))),
                    Err(e) => {
                        log::error!("{e:#}");
                        Err(tobj::LoadError::OpenFileFailed)
                    }
                }
            }
        },
    )
    .await
    .with_context(|| format!("Could not parse {}", path.display()))?;

    let obj_materials = obj_materials.unwrap_or_else(|e| {
        log::error!("Materials of {} could not be loaded: {e}", path.display());
        Vec::new()
    });
    let materials = obj_materials
        .iter()
        .map(|m| texture::obj_material(m, &dir))
        .collect::<Vec<_>>();

    let mut root = ImportedNode::new(file_name(path));
    let mut meshes = Vec::new();
    for model in &models {
        let Some(mut mesh) = mesh::obj_mesh(model, options)? else {
            continue;
        };
        // Material ids that point past the MTL file fall back to the default material
        if mesh.material.is_some_and(|id| id >= materials.len()) {
            log::warn!("{}: mesh {} references a missing material", path.display(), model.name);
            mesh.material = None;
        }
        let mut node = ImportedNode::new(model.name.clone());
        node.meshes.push(meshes.len());
        meshes.push(mesh);
        root.children.push(node);
    }

    let mut scene = ImportedScene {
        meshes,
        materials,
        root,
    };
    scene.assign_default_material();
    Ok(scene)
}

async fn import_gltf(path: &Path, options: &ImportOptions) -> anyhow::Result<ImportedScene> {
    let dir = base_dir(path);
    let gltf_bytes = load_binary(path).await?;
    let gltf_reader = BufReader::new(Cursor::new(gltf_bytes));
    let gltf = gltf::Gltf::from_reader(gltf_reader)
        .with_context(|| format!("Could not parse {}", path.display()))?;

    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .context("glTF references a binary chunk it does not contain")?;
                buffer_data.push(blob.into());
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(&dir.join(uri)).await?);
            }
        }
    }

    let materials = gltf
        .materials()
        .map(|m| texture::gltf_material(&m, path, &dir, &buffer_data))
        .collect::<Vec<_>>();

    // Every glTF mesh becomes one MeshData per primitive; nodes sharing a mesh share its parts.
    let mut meshes = Vec::new();
    let mut mesh_parts: Vec<Vec<usize>> = Vec::new();
    for gltf_mesh in gltf.meshes() {
        let mut parts = Vec::new();
        for primitive in gltf_mesh.primitives() {
            if let Some(mesh) = mesh::gltf_mesh(&gltf_mesh, &primitive, &buffer_data, options)? {
                parts.push(meshes.len());
                meshes.push(mesh);
            }
        }
        mesh_parts.push(parts);
    }

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .context("glTF file contains no scene")?;
    let mut root = ImportedNode::new(file_name(path));
    root.children = scene
        .nodes()
        .map(|node| gltf_node(node, &mesh_parts))
        .collect();

    let mut scene = ImportedScene {
        meshes,
        materials,
        root,
    };
    scene.assign_default_material();
    Ok(scene)
}

fn gltf_node(node: gltf::Node, mesh_parts: &[Vec<usize>]) -> ImportedNode {
    let mut imported = ImportedNode::new(node.name().unwrap_or("node"));
    imported.transform = cgmath::Matrix4::from(node.transform().matrix());
    if let Some(gltf_mesh) = node.mesh() {
        imported.meshes = mesh_parts[gltf_mesh.index()].clone();
    }
    imported.children = node
        .children()
        .map(|child| gltf_node(child, mesh_parts))
        .collect();
    imported
}
