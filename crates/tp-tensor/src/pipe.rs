use crate::error::{Result, TensorError};
use crate::tile::LocalTile;

/// Default local (unified buffer) capacity of one compute unit, in bytes.
pub const DEFAULT_LOCAL_CAPACITY: usize = 192 * 1024;

/// Local-memory budget of a single unit.
///
/// Every tile queue and scratch buffer a kernel needs is carved out of the
/// pipe once at setup. Nothing is ever returned to it; buffers are recycled
/// by the queues that own them instead.
#[derive(Debug)]
pub struct Pipe {
    capacity: usize,
    used: usize,
}

impl Pipe {
    pub fn new(capacity: usize) -> Self {
        Pipe { capacity, used: 0 }
    }

    /// Bytes still available.
    pub fn available(&self) -> usize {
        self.capacity - self.used
    }

    /// Bytes handed out so far.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Allocate `count` tiles of `len` f32 elements each, e.g. the slots of a
    /// double-buffered queue.
    pub fn init_tiles(&mut self, count: usize, len: usize) -> Result<Vec<LocalTile>> {
        self.reserve(count * len * std::mem::size_of::<f32>())?;
        Ok((0..count).map(|_| LocalTile::zeros(len)).collect())
    }

    /// Allocate a single scratch buffer of `len` f32 elements.
    pub fn init_buffer(&mut self, len: usize) -> Result<LocalTile> {
        self.reserve(len * std::mem::size_of::<f32>())?;
        Ok(LocalTile::zeros(len))
    }

    fn reserve(&mut self, requested: usize) -> Result<()> {
        if requested > self.available() {
            return Err(TensorError::LocalMemoryExhausted {
                requested,
                available: self.available(),
            });
        }
        self.used += requested;
        Ok(())
    }
}

impl Default for Pipe {
    fn default() -> Self {
        Pipe::new(DEFAULT_LOCAL_CAPACITY)
    }
}
