//! Materials and their GPU representation.
//!
//! Materials are append-only and addressed by the index assigned when they
//! were added. Their textures live in the scene's
//! [`TextureTable`](crate::data_structures::texture_table::TextureTable);
//! missing textures fall back to placeholder entries that sit right behind
//! the table inside the shader's texture array.

use crate::{
    data_structures::texture_table::{TextureSlot, TextureTable},
    error::SceneError,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub diffuse: Option<TextureSlot>,
    pub specular: Option<TextureSlot>,
    pub normal: Option<TextureSlot>,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: None,
            specular: None,
            normal: None,
            shininess: 32.0,
        }
    }
}

/// Texture array indices plus shininess, one record per material (16 byte stride).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialRaw {
    pub diffuse: u32,
    pub specular: u32,
    pub normal: u32,
    pub shininess: f32,
}

/// Array indices of the fallback textures, placed after `capacity` table slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholders {
    pub white: u32,
    pub black: u32,
    pub flat_normal: u32,
}

impl Placeholders {
    pub const COUNT: u32 = 3;

    pub fn after(capacity: usize) -> Self {
        let base = capacity as u32;
        Self {
            white: base,
            black: base + 1,
            flat_normal: base + 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaterialTable {
    materials: Vec<Material>,
    limit: usize,
}

impl MaterialTable {
    pub fn new(limit: usize) -> Self {
        Self {
            materials: Vec::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&Material> {
        self.materials.get(index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn can_add(&self, count: usize) -> Result<(), SceneError> {
        let requested = self.materials.len() + count;
        if requested > self.limit {
            return Err(SceneError::MaterialCapacity {
                requested,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Append a material and return its index.
    pub fn push(&mut self, material: Material) -> Result<u32, SceneError> {
        self.can_add(1)?;
        self.materials.push(material);
        Ok(self.materials.len() as u32 - 1)
    }

    /// Append all `materials` or none; returns the index of the first one.
    pub fn extend(&mut self, materials: &[Material]) -> Result<u32, SceneError> {
        self.can_add(materials.len())?;
        let offset = self.materials.len() as u32;
        self.materials.extend_from_slice(materials);
        Ok(offset)
    }

    /// Resolve every referenced texture handle and build the GPU records.
    ///
    /// Slots whose texture fails `is_present` get the placeholder of their
    /// role instead. Handle resolution is idempotent, so this can run after
    /// every cache build.
    pub fn to_raw<T>(
        &self,
        textures: &mut TextureTable<T>,
        is_present: impl Fn(&T) -> bool,
    ) -> Vec<MaterialRaw> {
        let placeholders = Placeholders::after(textures.capacity());
        let mut resolve = |slot: Option<TextureSlot>, fallback: u32| {
            slot.filter(|&slot| textures.get(slot).is_some_and(|e| is_present(&e.texture)))
                .and_then(|slot| textures.resolve(slot))
                .unwrap_or(fallback)
        };
        self.materials
            .iter()
            .map(|m| MaterialRaw {
                diffuse: resolve(m.diffuse, placeholders.white),
                specular: resolve(m.specular, placeholders.black),
                normal: resolve(m.normal, placeholders.flat_normal),
                shininess: m.shininess,
            })
            .collect()
    }
}
