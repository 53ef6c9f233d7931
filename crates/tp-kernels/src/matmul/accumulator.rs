use tp_tensor::{LocalTile, Pipe, VectorBackend};

use crate::error::Result;

/// Running sum of the `[base_m x base_n]` tiles of one output row-block.
///
/// Tiles are added in place as they are produced. Once a full row-block has
/// been added, [`RowAccumulator::finalize`] folds each row to a scalar and
/// clears the buffer for the next row-block.
#[derive(Debug)]
pub struct RowAccumulator {
    acc: LocalTile,
    sums: LocalTile,
    base_n: usize,
    pending: usize,
}

impl RowAccumulator {
    pub fn new(pipe: &mut Pipe, base_m: usize, base_n: usize) -> Result<Self> {
        Ok(RowAccumulator {
            acc: pipe.init_buffer(base_m * base_n)?,
            sums: pipe.init_buffer(base_m)?,
            base_n,
            pending: 0,
        })
    }

    /// Add one produced tile.
    pub fn add(&mut self, backend: &dyn VectorBackend, tile: &[f32]) {
        backend.add_assign(&mut self.acc, tile);
        self.pending += 1;
    }

    /// Tiles added since the last reset.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Current accumulator contents, row-major `[base_m x base_n]`.
    pub fn values(&self) -> &[f32] {
        &self.acc
    }

    /// Reduce every row of the accumulator to its sum, then zero it.
    pub fn finalize(&mut self, backend: &dyn VectorBackend) -> Vec<f32> {
        backend.row_sum(&mut self.sums, &self.acc, self.base_n);
        backend.duplicate(&mut self.acc, 0.0);
        self.pending = 0;
        self.sums.to_vec()
    }
}
