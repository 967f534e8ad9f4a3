//! Texture sources referenced by imported materials, and image decoding.

use std::path::{Path, PathBuf};

use anyhow::Context;
use image::RgbaImage;

use crate::{
    data_structures::texture_table::TextureKey,
    resources::{ImportedMaterial, load_binary},
};

/// Where a material texture comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    /// A file, already resolved against the model's directory.
    File(PathBuf),
    /// Image bytes embedded in a model file; `name` is `<model path>#<image index>`.
    Embedded { name: String, bytes: Vec<u8> },
}

impl TextureSource {
    /// Table key: the hash of the resolved path (or embedded name).
    pub fn key(&self) -> TextureKey {
        match self {
            TextureSource::File(path) => TextureKey::from_path(path),
            TextureSource::Embedded { name, .. } => TextureKey::from_name(name),
        }
    }

    pub fn name(&self) -> String {
        match self {
            TextureSource::File(path) => path.display().to_string(),
            TextureSource::Embedded { name, .. } => name.clone(),
        }
    }

    /// Read and decode the image to RGBA8.
    pub async fn load(&self) -> anyhow::Result<RgbaImage> {
        match self {
            TextureSource::File(path) => load_image(path).await,
            TextureSource::Embedded { name, bytes } => Ok(image::load_from_memory(bytes)
                .with_context(|| format!("Could not decode {name}"))?
                .to_rgba8()),
        }
    }
}

pub async fn load_image(path: &Path) -> anyhow::Result<RgbaImage> {
    let data = load_binary(path).await?;
    let img = image::load_from_memory(&data)
        .with_context(|| format!("Could not decode {}", path.display()))?;
    Ok(img.to_rgba8())
}

/// Decode the six skybox faces; unreadable faces are logged and left empty.
pub async fn load_cube_faces(paths: &[PathBuf; 6]) -> [Option<RgbaImage>; 6] {
    let faces = futures::future::join_all(paths.iter().map(|p| load_image(p))).await;
    let mut out: [Option<RgbaImage>; 6] = Default::default();
    for (slot, face) in out.iter_mut().zip(faces) {
        match face {
            Ok(img) => *slot = Some(img),
            Err(e) => log::error!("Cannot load skybox face: {e:#}"),
        }
    }
    out
}

pub(crate) fn obj_material(m: &tobj::Material, dir: &Path) -> ImportedMaterial {
    let file = |t: &Option<String>| t.as_ref().map(|t| TextureSource::File(dir.join(t)));
    ImportedMaterial {
        name: m.name.clone(),
        diffuse: file(&m.diffuse_texture),
        specular: file(&m.specular_texture),
        normal: file(&m.normal_texture),
        shininess: m.shininess.filter(|s| *s > 0.0).unwrap_or(32.0),
    }
}

fn gltf_texture(
    texture: gltf::Texture,
    model: &Path,
    dir: &Path,
    buffers: &[Vec<u8>],
) -> Option<TextureSource> {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::View { view, .. } => {
            let buffer = buffers.get(view.buffer().index())?;
            let bytes = buffer.get(view.offset()..view.offset() + view.length())?;
            Some(TextureSource::Embedded {
                name: format!("{}#{}", model.display(), image.index()),
                bytes: bytes.to_vec(),
            })
        }
        gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
            log::warn!("{}: data URI images are not supported", model.display());
            None
        }
        gltf::image::Source::Uri { uri, .. } => Some(TextureSource::File(dir.join(uri))),
    }
}

pub(crate) fn gltf_material(
    m: &gltf::Material,
    model: &Path,
    dir: &Path,
    buffers: &[Vec<u8>],
) -> ImportedMaterial {
    let pbr = m.pbr_metallic_roughness();
    ImportedMaterial {
        name: m.name().unwrap_or("material").to_string(),
        diffuse: pbr
            .base_color_texture()
            .and_then(|t| gltf_texture(t.texture(), model, dir, buffers)),
        specular: None,
        normal: m
            .normal_texture()
            .and_then(|t| gltf_texture(t.texture(), model, dir, buffers)),
        shininess: 32.0,
    }
}
