use std::ops::{Deref, DerefMut};

/// A fixed-size f32 scratch buffer resident in local memory.
///
/// A tile is deliberately not `Clone`: at any moment exactly one pipeline
/// stage owns it, and handing it to the next stage is a move.
#[derive(Debug)]
pub struct LocalTile {
    data: Vec<f32>,
}

impl LocalTile {
    /// Create a zero-filled tile of `len` elements.
    pub fn zeros(len: usize) -> Self {
        LocalTile {
            data: vec![0.0; len],
        }
    }

    /// Number of elements in this tile.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the tile holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the tile in local memory.
    pub fn size_in_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }

    /// Overwrite the whole tile from a bulk-memory span of equal length.
    ///
    /// # Panics
    /// Panics if `src.len() != self.len()`.
    pub fn load(&mut self, src: &[f32]) {
        self.data.copy_from_slice(src);
    }

    /// Write the whole tile into a bulk-memory span of equal length.
    ///
    /// # Panics
    /// Panics if `dst.len() != self.len()`.
    pub fn store(&self, dst: &mut [f32]) {
        dst.copy_from_slice(&self.data);
    }
}

impl Deref for LocalTile {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.data
    }
}

impl DerefMut for LocalTile {
    fn deref_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}
