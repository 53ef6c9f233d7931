use crate::error::{Result, TensorError};
use crate::layout::Layout;

/// Read-only 2-D window into a bulk buffer.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a, T> {
    data: &'a [T],
    offset: usize,
    layout: Layout,
}

impl<'a, T: Copy> MatrixView<'a, T> {
    /// View `layout` starting at `offset` elements into `data`.
    ///
    /// Nothing is checked here; reading outside `data` panics.
    pub fn new(data: &'a [T], offset: usize, layout: Layout) -> Self {
        MatrixView {
            data,
            offset,
            layout,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn rows(&self) -> usize {
        self.layout.rows
    }

    pub fn cols(&self) -> usize {
        self.layout.cols
    }

    pub fn get(&self, row: usize, col: usize) -> T {
        self.data[self.offset + self.layout.offset(row, col)]
    }

    /// The `cols` elements of one row.
    pub fn row(&self, row: usize) -> &'a [T] {
        let start = self.offset + self.layout.offset(row, 0);
        &self.data[start..start + self.layout.cols]
    }

    /// A `rows x cols` sub-window whose origin is (`row`, `col`) of this view.
    pub fn window(&self, row: usize, col: usize, rows: usize, cols: usize) -> MatrixView<'a, T> {
        MatrixView {
            data: self.data,
            offset: self.offset + self.layout.offset(row, col),
            layout: Layout::strided(rows, cols, self.layout.pitch),
        }
    }
}

/// Exclusive, writable 2-D region of a row-major bulk matrix.
///
/// Regions produced by [`RegionMut::split_blocks`] never alias, so each can be
/// handed to a different unit. Offsets passed to [`RegionMut::segment_mut`] are
/// flat offsets relative to the region origin, measured with the parent
/// matrix's pitch, exactly as a device address would be.
#[derive(Debug)]
pub struct RegionMut<'a> {
    rows: Vec<&'a mut [f32]>,
    pitch: usize,
}

impl<'a> RegionMut<'a> {
    /// Split a `matrix.rows x matrix.cols` buffer into a grid of
    /// `block_rows x block_cols` regions, indexed `[row_block][col_block]`.
    ///
    /// Matrix dimensions are expected to be exact multiples of the block
    /// dimensions; trailing partial blocks are not produced.
    pub fn split_blocks(
        buf: &'a mut [f32],
        matrix: Layout,
        block_rows: usize,
        block_cols: usize,
    ) -> Result<Vec<Vec<RegionMut<'a>>>> {
        if buf.len() != matrix.numel() || !matrix.is_contiguous() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![matrix.rows, matrix.cols],
                got: vec![buf.len()],
            });
        }
        let row_blocks = matrix.rows / block_rows;
        let col_blocks = matrix.cols / block_cols;

        let mut grid: Vec<Vec<RegionMut<'a>>> = (0..row_blocks)
            .map(|_| {
                (0..col_blocks)
                    .map(|_| RegionMut {
                        rows: Vec::with_capacity(block_rows),
                        pitch: matrix.cols,
                    })
                    .collect()
            })
            .collect();

        for (r, row) in buf.chunks_exact_mut(matrix.cols).enumerate() {
            let rb = r / block_rows;
            if rb >= row_blocks {
                break;
            }
            for (cb, segment) in row.chunks_exact_mut(block_cols).enumerate().take(col_blocks) {
                grid[rb][cb].rows.push(segment);
            }
        }
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.rows[row][col]
    }

    /// `len` contiguous elements starting at flat `offset`. The span must not
    /// cross a row end of the region.
    pub fn segment_mut(&mut self, offset: usize, len: usize) -> &mut [f32] {
        let row = offset / self.pitch;
        let col = offset % self.pitch;
        &mut self.rows[row][col..col + len]
    }
}
