use std::fmt;

/// Row-major 2-D layout of a matrix or sub-matrix inside a flat buffer.
///
/// `pitch` is the distance in elements between the starts of two consecutive
/// rows. A sub-matrix of a wider matrix keeps the parent's pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    pub rows: usize,
    pub cols: usize,
    pub pitch: usize,
}

impl Layout {
    /// A densely packed `rows x cols` layout (`pitch == cols`).
    pub fn contiguous(rows: usize, cols: usize) -> Self {
        Layout {
            rows,
            cols,
            pitch: cols,
        }
    }

    /// A `rows x cols` window into rows that are `pitch` elements apart.
    pub fn strided(rows: usize, cols: usize, pitch: usize) -> Self {
        Layout { rows, cols, pitch }
    }

    /// Number of addressable elements.
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    /// Flat offset of element (`row`, `col`) relative to the layout origin.
    pub fn offset(&self, row: usize, col: usize) -> usize {
        row * self.pitch + col
    }

    /// Number of elements spanned from the first to one past the last
    /// element, gaps included.
    pub fn span(&self) -> usize {
        if self.rows == 0 {
            return 0;
        }
        (self.rows - 1) * self.pitch + self.cols
    }

    /// True when rows follow each other without gaps.
    pub fn is_contiguous(&self) -> bool {
        self.pitch == self.cols || self.rows <= 1
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.rows, self.cols)?;
        if self.pitch != self.cols {
            write!(f, " pitch {}", self.pitch)?;
        }
        Ok(())
    }
}
