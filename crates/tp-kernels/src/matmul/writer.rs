use tp_tensor::{data_copy, DType, DataCopyParams, StridedDest};

use crate::error::Result;
use crate::tiling::CubeTiling;

/// Scatters produced `[base_m x base_n]` tiles into a unit's block of C.
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    params: DataCopyParams,
    round_n: usize,
    base_m: usize,
    base_n: usize,
    n: usize,
}

impl OutputWriter {
    pub fn new(tiling: &CubeTiling) -> Result<Self> {
        let base_m = tiling.base_m as usize;
        let base_n = tiling.base_n as usize;
        let n = tiling.n as usize;
        Ok(OutputWriter {
            params: DataCopyParams::for_tile(base_m, base_n, n, DType::F32)?,
            round_n: tiling.round_n(),
            base_m,
            base_n,
            n,
        })
    }

    pub fn params(&self) -> &DataCopyParams {
        &self.params
    }

    /// Offset of the `count`-th produced tile from the unit's C origin.
    /// Tiles arrive row-block by row-block, `round_n` tiles per row-block.
    pub fn start_offset(&self, count: usize) -> usize {
        count / self.round_n * self.base_m * self.n + count % self.round_n * self.base_n
    }

    pub fn copy_out<D: StridedDest + ?Sized>(&self, dst: &mut D, tile: &[f32], count: usize) {
        data_copy(dst, self.start_offset(count), tile, &self.params);
    }
}
