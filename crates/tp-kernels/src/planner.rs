use std::ops::Range;

use tp_tensor::{Layout, RegionMut};

use crate::error::Result;
use crate::tiling::{CubeTiling, SoftmaxTiling};

/// Linear partition of a vector into equal, contiguous unit blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearPartition {
    block_length: usize,
}

impl LinearPartition {
    pub fn new(block_length: usize) -> Self {
        LinearPartition { block_length }
    }

    pub fn block_length(&self) -> usize {
        self.block_length
    }

    /// Element range owned by `unit`: `unit * block_length` onwards.
    pub fn unit_range(&self, unit: usize) -> Range<usize> {
        let offset = unit * self.block_length;
        offset..offset + self.block_length
    }

    /// Split a bulk buffer into per-unit read views, in unit order.
    pub fn split<'a, T>(&self, buf: &'a [T]) -> Vec<&'a [T]> {
        buf.chunks_exact(self.block_length).collect()
    }

    /// Split a bulk buffer into per-unit exclusive views, in unit order.
    pub fn split_mut<'a, T>(&self, buf: &'a mut [T]) -> Vec<&'a mut [T]> {
        buf.chunks_exact_mut(self.block_length).collect()
    }
}

impl From<&SoftmaxTiling> for LinearPartition {
    fn from(tiling: &SoftmaxTiling) -> Self {
        LinearPartition::new(tiling.block_length())
    }
}

/// Where one unit's share of the matmul operands and output starts.
///
/// Units are numbered down the M axis first: `row_idx = unit % row_blocks`,
/// `col_idx = unit / row_blocks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatmulPartition {
    pub row_idx: usize,
    pub col_idx: usize,
    /// Start of the unit's `single_core_m` rows of A.
    pub offset_a: usize,
    /// Start of the unit's `single_core_n` columns of B.
    pub offset_b: usize,
    /// Start of the unit's block of C.
    pub offset_c: usize,
    /// Start of the unit's slice of the bias row.
    pub offset_bias: usize,
}

impl MatmulPartition {
    pub fn for_unit(unit: usize, tiling: &CubeTiling) -> Self {
        let row_blocks = tiling.row_blocks();
        let row_idx = unit % row_blocks;
        let col_idx = unit / row_blocks;

        let ka = tiling.ka as usize;
        let n = tiling.n as usize;
        let single_m = tiling.single_core_m as usize;
        let single_n = tiling.single_core_n as usize;

        MatmulPartition {
            row_idx,
            col_idx,
            offset_a: row_idx * ka * single_m,
            offset_b: col_idx * single_n,
            offset_c: row_idx * n * single_m + col_idx * single_n,
            offset_bias: col_idx * single_n,
        }
    }
}

/// Split C into the per-unit output regions, indexed by unit.
///
/// Region `u` starts at `MatmulPartition::for_unit(u, tiling).offset_c`.
pub fn split_output<'a>(c: &'a mut [f32], tiling: &CubeTiling) -> Result<Vec<RegionMut<'a>>> {
    let grid = RegionMut::split_blocks(
        c,
        Layout::contiguous(tiling.m as usize, tiling.n as usize),
        tiling.single_core_m as usize,
        tiling.single_core_n as usize,
    )?;

    // grid is [row_block][col_block]; units run down M first.
    let col_blocks = grid.first().map_or(0, |row| row.len());
    let mut by_col: Vec<Vec<RegionMut<'a>>> = (0..col_blocks).map(|_| Vec::new()).collect();
    for row in grid {
        for (cb, region) in row.into_iter().enumerate() {
            by_col[cb].push(region);
        }
    }
    Ok(by_col.into_iter().flatten().collect())
}
