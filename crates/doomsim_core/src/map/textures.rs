//! Per-level name tables for wall textures and flats.
//!
//! Names are interned in first-use order so sides and sectors can refer to
//! them by index. Index 0 of the wall table is `-`, "no texture".

use std::collections::HashMap;

use crate::math::Fixed;

/// Name used for "no texture" on a side.
pub const NO_TEXTURE: &str = "-";

/// Interned texture or flat names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl NameTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A wall texture table with `-` at index 0.
    #[must_use]
    pub fn walls() -> Self {
        let mut table = Self::new();
        table.intern(NO_TEXTURE);
        table
    }

    /// Index of `name`, adding it if new. Names compare case-insensitively.
    pub fn intern(&mut self, name: &str) -> usize {
        let key = name.to_ascii_uppercase();
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.names.len();
        self.names.push(key.clone());
        self.index.insert(key, i);
        i
    }

    /// Index of an existing name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_ascii_uppercase()).copied()
    }

    /// Name at `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `true` when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Wall textures plus the heights floors can be raised by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureSet {
    /// Wall texture names.
    pub walls: NameTable,
    /// Flat names.
    pub flats: NameTable,
    /// Height of each wall texture, when known.
    pub heights: Vec<Option<Fixed>>,
}

impl TextureSet {
    /// Height of a wall texture. Unknown textures and `-` have none.
    #[must_use]
    pub fn height(&self, texture: usize) -> Option<Fixed> {
        if texture == 0 {
            return None;
        }
        self.heights.get(texture).copied().flatten()
    }

    /// Intern a wall texture, keeping the height table in step.
    pub fn intern_wall(&mut self, name: &str) -> usize {
        let i = self.walls.intern(name);
        if self.heights.len() < self.walls.len() {
            self.heights.resize(self.walls.len(), None);
        }
        i
    }
}
