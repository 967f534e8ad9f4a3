//! Fixed-capacity texture table keyed by path hash.
//!
//! Open addressing with linear probing: a key starts at `key % capacity` and
//! walks forward (wrapping) until it finds itself or an empty slot. A probe
//! that visits every slot without either reports the table as full; entries
//! are never overwritten. Key 0 marks empty slots and cannot be constructed.

use std::{num::NonZeroU64, path::Path};

use xxhash_rust::xxh3::xxh3_64;

use crate::error::SceneError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureKey(NonZeroU64);

impl TextureKey {
    pub fn new(key: u64) -> Result<Self, SceneError> {
        NonZeroU64::new(key)
            .map(Self)
            .ok_or(SceneError::ReservedTextureKey)
    }

    /// Hash of an arbitrary name. A hash of 0 is folded onto 1.
    pub fn from_name(name: &str) -> Self {
        Self(NonZeroU64::new(xxh3_64(name.as_bytes())).unwrap_or(NonZeroU64::MIN))
    }

    /// Hash of a resolved file path.
    pub fn from_path(path: &Path) -> Self {
        Self::from_name(&path.to_string_lossy())
    }

    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

/// Position of an entry inside a [`TextureTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSlot(usize);

impl TextureSlot {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct TextureEntry<T> {
    key: TextureKey,
    pub texture: T,
    handle: Option<u32>,
}

impl<T> TextureEntry<T> {
    pub fn key(&self) -> TextureKey {
        self.key
    }

    /// The shader-visible handle, once resolved.
    pub fn handle(&self) -> Option<u32> {
        self.handle
    }
}

enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

#[derive(Debug)]
pub struct TextureTable<T> {
    entries: Vec<Option<TextureEntry<T>>>,
    len: usize,
}

impl<T> TextureTable<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: (0..capacity).map(|_| None).collect(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn free_slots(&self) -> usize {
        self.capacity() - self.len
    }

    fn probe(&self, key: TextureKey) -> Probe {
        let capacity = self.capacity();
        if capacity == 0 {
            return Probe::Full;
        }
        let start = (key.get() % capacity as u64) as usize;
        for i in 0..capacity {
            let index = (start + i) % capacity;
            match &self.entries[index] {
                None => return Probe::Vacant(index),
                Some(entry) if entry.key == key => return Probe::Found(index),
                Some(_) => (),
            }
        }
        Probe::Full
    }

    pub fn find(&self, key: TextureKey) -> Option<TextureSlot> {
        match self.probe(key) {
            Probe::Found(index) => Some(TextureSlot(index)),
            _ => None,
        }
    }

    /// Insert `texture` under `key`, or return the slot already holding `key`.
    pub fn insert(&mut self, key: TextureKey, texture: T) -> Result<TextureSlot, SceneError> {
        self.insert_with(key, || texture)
    }

    /// Like [`insert`](Self::insert), but `make` only runs when `key` is absent.
    pub fn insert_with(
        &mut self,
        key: TextureKey,
        make: impl FnOnce() -> T,
    ) -> Result<TextureSlot, SceneError> {
        match self.probe(key) {
            Probe::Found(index) => Ok(TextureSlot(index)),
            Probe::Vacant(index) => {
                self.entries[index] = Some(TextureEntry {
                    key,
                    texture: make(),
                    handle: None,
                });
                self.len += 1;
                Ok(TextureSlot(index))
            }
            Probe::Full => Err(SceneError::TextureTableFull {
                capacity: self.capacity(),
            }),
        }
    }

    pub fn get(&self, slot: TextureSlot) -> Option<&TextureEntry<T>> {
        self.entries.get(slot.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, slot: TextureSlot) -> Option<&mut TextureEntry<T>> {
        self.entries.get_mut(slot.0).and_then(Option::as_mut)
    }

    /// Make the texture in `slot` shader-visible and return its handle.
    ///
    /// The handle is the slot index inside the scene's texture array.
    /// Resolving an already resolved entry returns the same handle.
    pub fn resolve(&mut self, slot: TextureSlot) -> Option<u32> {
        let entry = self.entries.get_mut(slot.0)?.as_mut()?;
        Some(*entry.handle.get_or_insert(slot.0 as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureSlot, &TextureEntry<T>)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (TextureSlot(i), e)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (TextureSlot, &mut TextureEntry<T>)> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(i, e)| e.as_mut().map(|e| (TextureSlot(i), e)))
    }
}
