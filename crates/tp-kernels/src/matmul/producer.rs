use half::f16;
use tp_tensor::{Layout, MatrixView, VectorBackend};

use crate::planner::MatmulPartition;
use crate::tiling::CubeTiling;

/// Position of a produced tile inside the unit block, in base-tile units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCoord {
    pub m: usize,
    pub n: usize,
}

/// Blocked matmul over one unit's `[single_core_m x single_core_n]` block of
/// C, producing one `[base_m x base_n]` tile per [`BlockProducer::iterate`].
///
/// Tiles come out row-block by row-block (N varies fastest). Each tile is
/// accumulated over K in `base_k` steps, in f32, from f16 operands.
#[derive(Debug)]
pub struct BlockProducer<'a> {
    a: MatrixView<'a, f16>,
    b: MatrixView<'a, f16>,
    bias: Option<&'a [f32]>,
    base_m: usize,
    base_n: usize,
    base_k: usize,
    k_steps: usize,
    round_m: usize,
    round_n: usize,
    next: usize,
}

impl<'a> BlockProducer<'a> {
    /// Bind the producer to the unit described by `part`.
    ///
    /// `a` is the full `[M x Ka]` matrix, `b` the full `[Kb x N]` matrix and
    /// `bias` the full length-N bias row; the partition offsets select the
    /// unit's share. The bias is only read when the tiling enables it.
    pub fn new(
        tiling: &CubeTiling,
        part: &MatmulPartition,
        a: &'a [f16],
        b: &'a [f16],
        bias: Option<&'a [f32]>,
    ) -> Self {
        let single_m = tiling.single_core_m as usize;
        let single_n = tiling.single_core_n as usize;
        let single_k = tiling.single_core_k as usize;
        let base_k = tiling.base_k as usize;

        let bias = if tiling.has_bias() {
            bias.map(|row| &row[part.offset_bias..part.offset_bias + single_n])
        } else {
            None
        };

        BlockProducer {
            a: MatrixView::new(
                a,
                part.offset_a,
                Layout::strided(single_m, single_k, tiling.ka as usize),
            ),
            b: MatrixView::new(
                b,
                part.offset_b,
                Layout::strided(single_k, single_n, tiling.n as usize),
            ),
            bias,
            base_m: tiling.base_m as usize,
            base_n: tiling.base_n as usize,
            base_k,
            k_steps: single_k / base_k,
            round_m: tiling.round_m(),
            round_n: tiling.round_n(),
            next: 0,
        }
    }

    /// Compute the next output tile into `out` (`base_m * base_n` elements).
    ///
    /// Returns `None`, leaving `out` untouched, once the block is exhausted.
    pub fn iterate(&mut self, backend: &dyn VectorBackend, out: &mut [f32]) -> Option<TileCoord> {
        if self.next == self.round_m * self.round_n {
            return None;
        }
        let coord = TileCoord {
            m: self.next / self.round_n,
            n: self.next % self.round_n,
        };
        let row0 = coord.m * self.base_m;
        let col0 = coord.n * self.base_n;

        backend.duplicate(out, 0.0);
        for step in 0..self.k_steps {
            let k0 = step * self.base_k;
            backend.mmad(
                out,
                self.a.window(row0, k0, self.base_m, self.base_k),
                self.b.window(k0, col0, self.base_k, self.base_n),
            );
        }
        if let Some(bias) = self.bias {
            let bias = &bias[col0..col0 + self.base_n];
            for row in out.chunks_exact_mut(self.base_n) {
                backend.add_assign(row, bias);
            }
        }

        self.next += 1;
        Some(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tp_tensor::CpuBackend;

    fn halves(v: impl IntoIterator<Item = f32>) -> Vec<f16> {
        v.into_iter().map(f16::from_f32).collect()
    }

    #[test]
    fn test_emits_row_major_tiles_then_stops() {
        let backend = CpuBackend::new();
        let t = CubeTiling::new(4, 4, 2, 4, 4, 2, 2, 2);
        let a = halves(vec![1.0; 8]);
        let b = halves(vec![1.0; 8]);
        let part = MatmulPartition::for_unit(0, &t);
        let mut p = BlockProducer::new(&t, &part, &a, &b, None);

        let mut out = vec![0.0f32; 4];
        let mut coords = Vec::new();
        while let Some(c) = p.iterate(&backend, &mut out) {
            assert_eq!(out, vec![2.0; 4]);
            coords.push((c.m, c.n));
        }
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert!(p.iterate(&backend, &mut out).is_none());
    }

    #[test]
    fn test_k_steps_and_unit_offsets() {
        let backend = CpuBackend::new();
        // C[2 x 4] = A[2 x 4] @ B[4 x 4], two units split along N, base_k = 2
        let t = CubeTiling::new(2, 4, 4, 2, 2, 2, 2, 2);
        let a = halves((0..8).map(|v| v as f32));
        // identity
        let b = halves((0..16).map(|i| if i / 4 == i % 4 { 1.0 } else { 0.0 }));

        // unit 1 owns columns 2..4 of C, i.e. columns 2..4 of A
        let part = MatmulPartition::for_unit(1, &t);
        let mut p = BlockProducer::new(&t, &part, &a, &b, None);
        let mut out = vec![0.0f32; 4];
        assert_eq!(p.iterate(&backend, &mut out), Some(TileCoord { m: 0, n: 0 }));
        assert_eq!(out, vec![2.0, 3.0, 6.0, 7.0]);
        assert!(p.iterate(&backend, &mut out).is_none());
    }

    #[test]
    fn test_bias_only_when_enabled() {
        let backend = CpuBackend::new();
        let mut t = CubeTiling::new(2, 2, 2, 2, 2, 2, 2, 2);
        let a = halves(vec![0.0; 4]);
        let b = halves(vec![0.0; 4]);
        let bias = [1.5f32, -2.0];
        let part = MatmulPartition::for_unit(0, &t);

        let mut out = vec![9.0f32; 4];
        BlockProducer::new(&t, &part, &a, &b, Some(&bias)).iterate(&backend, &mut out);
        assert_eq!(out, vec![0.0; 4]);

        t.is_bias = 1;
        BlockProducer::new(&t, &part, &a, &b, Some(&bias)).iterate(&backend, &mut out);
        assert_eq!(out, vec![1.5, -2.0, 1.5, -2.0]);
    }
}
