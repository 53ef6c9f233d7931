use crate::error::{KernelError, Result};

/// Sizes for the block softmax kernel, computed once at setup.
///
/// The vector of `total_length` elements is split into `unit_count` blocks.
/// Each block is streamed as `tile_num * buffer_num` tiles, so with
/// `buffer_num == 2` every logical tile is processed as two halves that
/// alternate between the queue slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftmaxTiling {
    /// Total number of elements across all units.
    pub total_length: usize,
    /// Number of units the vector is partitioned over.
    pub unit_count: usize,
    /// Tiles per unit block, before the double-buffer split.
    pub tile_num: usize,
    /// Queue slots per stream (2 = double buffering).
    pub buffer_num: usize,
}

impl SoftmaxTiling {
    /// Build a tiling, checking that every level divides exactly.
    ///
    /// Remainders are not supported anywhere in the kernel. Fields can still
    /// be set directly; a non-dividing configuration then produces undefined
    /// (silently partial) results.
    pub fn new(
        total_length: usize,
        unit_count: usize,
        tile_num: usize,
        buffer_num: usize,
    ) -> Result<Self> {
        if unit_count == 0 || total_length % unit_count != 0 {
            return Err(KernelError::NotDivisible {
                what: "total_length",
                value: total_length,
                divisor: unit_count,
            });
        }
        let block_length = total_length / unit_count;
        let loop_count = tile_num * buffer_num;
        if loop_count == 0 || block_length % loop_count != 0 {
            return Err(KernelError::NotDivisible {
                what: "block_length",
                value: block_length,
                divisor: loop_count,
            });
        }
        Ok(SoftmaxTiling {
            total_length,
            unit_count,
            tile_num,
            buffer_num,
        })
    }

    /// Elements owned by one unit.
    pub fn block_length(&self) -> usize {
        self.total_length / self.unit_count
    }

    /// Tiles streamed per block and pass.
    pub fn loop_count(&self) -> usize {
        self.tile_num * self.buffer_num
    }

    /// Elements per tile.
    pub fn tile_length(&self) -> usize {
        self.block_length() / self.loop_count()
    }
}

impl Default for SoftmaxTiling {
    /// 8 units over 16384 elements, 8 tiles per block, double buffered:
    /// blocks of 2048 and tiles of 128 elements.
    fn default() -> Self {
        SoftmaxTiling {
            total_length: 8 * 2048,
            unit_count: 8,
            tile_num: 8,
            buffer_num: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sizes() {
        let t = SoftmaxTiling::default();
        assert_eq!(t.block_length(), 2048);
        assert_eq!(t.loop_count(), 16);
        assert_eq!(t.tile_length(), 128);
        assert_eq!(SoftmaxTiling::new(16384, 8, 8, 2).unwrap(), t);
    }

    #[test]
    fn test_units_must_divide_total() {
        let err = SoftmaxTiling::new(1000, 3, 1, 1).unwrap_err();
        assert!(matches!(
            err,
            KernelError::NotDivisible {
                what: "total_length",
                value: 1000,
                divisor: 3
            }
        ));
    }

    #[test]
    fn test_tiles_must_divide_block() {
        // 8 units of 125 elements cannot be cut into 16 tiles.
        let err = SoftmaxTiling::new(1000, 8, 8, 2).unwrap_err();
        assert!(matches!(
            err,
            KernelError::NotDivisible {
                what: "block_length",
                value: 125,
                divisor: 16
            }
        ));
    }

    #[test]
    fn test_zero_units_rejected() {
        assert!(SoftmaxTiling::new(1024, 0, 8, 2).is_err());
        assert!(SoftmaxTiling::new(1024, 8, 0, 2).is_err());
    }
}
