pub mod accumulator;
pub mod producer;
pub mod writer;

pub use accumulator::RowAccumulator;
pub use producer::{BlockProducer, TileCoord};
pub use writer::OutputWriter;

use half::f16;
use tp_tensor::{DType, Pipe, RegionMut, VectorBackend, DEFAULT_C0_SIZE};
use tracing::{debug, trace};

use crate::error::{KernelError, Result};
use crate::planner::MatmulPartition;
use crate::stager::TileQueue;
use crate::tiling::CubeTiling;

/// Slope of the leaky rectifier for negative inputs.
pub const LEAKY_RELU_ALPHA: f32 = 0.001;

/// Per-tile transform applied to produced tiles before they are accumulated
/// and written out.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Activation {
    #[default]
    None,
    LeakyRelu { alpha: f32 },
}

impl Activation {
    /// Leaky rectifier with the standard 0.001 slope.
    pub fn leaky_relu() -> Self {
        Activation::LeakyRelu {
            alpha: LEAKY_RELU_ALPHA,
        }
    }

    fn apply(&self, backend: &dyn VectorBackend, tile: &mut [f32]) {
        if let Activation::LeakyRelu { alpha } = *self {
            backend.leaky_relu(tile, alpha);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatmulOptions {
    pub activation: Activation,
}

/// Fused matmul and row reduction of one unit.
///
/// The unit's block of `C = A @ B (+ bias)` is produced tile by tile. Every
/// tile is added into a row-block accumulator and scattered to C through a
/// single-slot output queue drained on a stage-out thread. After each full
/// row-block (`single_core_n / base_n` tiles) the accumulator is reduced to
/// one sum per output row and cleared.
///
/// The sums are returned to the caller; nothing in the kernel consumes them
/// yet.
#[derive(Debug)]
pub struct MatmulReduceKernel<'b> {
    tiling: CubeTiling,
    backend: &'b dyn VectorBackend,
    options: MatmulOptions,
    writer: OutputWriter,
    out_queue: TileQueue,
    acc: RowAccumulator,
}

impl<'b> MatmulReduceKernel<'b> {
    pub fn new(
        tiling: &CubeTiling,
        backend: &'b dyn VectorBackend,
        options: MatmulOptions,
    ) -> Result<Self> {
        // Output rows are scattered in whole transfer units.
        let unit = DType::F32.elements_in(DEFAULT_C0_SIZE);
        for (what, value) in [("base_n", tiling.base_n), ("n", tiling.n)] {
            if value as usize % unit != 0 {
                return Err(KernelError::NotDivisible {
                    what,
                    value: value as usize,
                    divisor: unit,
                });
            }
        }

        let writer = OutputWriter::new(tiling)?;

        let mut pipe = Pipe::default();
        let out_queue = TileQueue::new(&mut pipe, 1, tiling.base_tile_len())?;
        let acc = RowAccumulator::new(&mut pipe, tiling.base_m as usize, tiling.base_n as usize)?;
        Ok(MatmulReduceKernel {
            tiling: *tiling,
            backend,
            options,
            writer,
            out_queue,
            acc,
        })
    }

    /// Run `unit`'s share of the matmul.
    ///
    /// `a`, `b` and `bias` are the full operands; `c` is the unit's own
    /// region of the output (see [`crate::planner::split_output`]). Returns
    /// one `base_m`-long vector of row sums per completed row-block, in
    /// production order.
    pub fn process(
        &mut self,
        unit: usize,
        a: &[f16],
        b: &[f16],
        bias: Option<&[f32]>,
        c: &mut RegionMut<'_>,
    ) -> Result<Vec<Vec<f32>>> {
        let MatmulReduceKernel {
            tiling,
            backend,
            options,
            writer,
            out_queue,
            acc,
        } = self;
        let writer = *writer;
        let backend: &dyn VectorBackend = *backend;
        let activation = options.activation;

        let part = MatmulPartition::for_unit(unit, tiling);
        debug!(
            unit,
            row_idx = part.row_idx,
            col_idx = part.col_idx,
            offset_c = part.offset_c,
            "matmul unit start"
        );
        let mut producer = BlockProducer::new(tiling, &part, a, b, bias);
        let round_n = tiling.round_n();

        let mut row_sums = Vec::new();
        let mut round = 0usize;
        out_queue.emit(
            |tile| {
                if producer.iterate(backend, tile).is_none() {
                    return Ok(None);
                }
                activation.apply(backend, tile);
                acc.add(backend, tile);

                let count = round;
                round += 1;
                if round % round_n == 0 {
                    let sums = acc.finalize(backend);
                    trace!(unit, round = count, row_sum = sums[0], "row-block reduced");
                    row_sums.push(sums);
                }
                Ok(Some(count))
            },
            |tile, count| writer.copy_out(&mut *c, tile, count),
        )?;

        Ok(row_sums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::golden;
    use crate::planner::split_output;
    use tp_tensor::CpuBackend;

    fn operands(t: &CubeTiling) -> (Vec<f16>, Vec<f16>) {
        let a = (0..t.m * t.ka)
            .map(|i| f16::from_f32((i % 7) as f32 - 3.0))
            .collect();
        let b = (0..t.kb * t.n)
            .map(|i| f16::from_f32((i % 5) as f32 - 2.0))
            .collect();
        (a, b)
    }

    #[test]
    fn test_single_unit_matches_reference() {
        let backend = CpuBackend::new();
        let t = CubeTiling::new(16, 32, 16, 16, 32, 8, 16, 8);
        let (a, b) = operands(&t);
        let mut c = vec![0.0f32; 16 * 32];

        let row_sums = {
            let mut regions = split_output(&mut c, &t).unwrap();
            let mut k = MatmulReduceKernel::new(&t, &backend, MatmulOptions::default()).unwrap();
            k.process(0, &a, &b, None, &mut regions[0]).unwrap()
        };

        let expected = golden::matmul(&a, &b, None, 16, 16, 32);
        assert_eq!(c, expected);

        // two row-blocks of 8 rows, each reduced over the full 32 columns
        assert_eq!(row_sums.len(), 2);
        for (rb, sums) in row_sums.iter().enumerate() {
            for (r, s) in sums.iter().enumerate() {
                let row = rb * 8 + r;
                let exact: f32 = expected[row * 32..(row + 1) * 32].iter().sum();
                assert!((s - exact).abs() <= 1e-3 * exact.abs().max(1.0));
            }
        }
    }

    #[test]
    fn test_rejects_partial_transfer_units() {
        let backend = CpuBackend::new();
        let t = CubeTiling::new(4, 4, 2, 2, 2, 2, 2, 2);
        let err = MatmulReduceKernel::new(&t, &backend, MatmulOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            KernelError::NotDivisible {
                what: "base_n",
                value: 2,
                divisor: 8
            }
        ));
    }

    #[test]
    fn test_rejects_output_pitch_beyond_descriptor_range() {
        let backend = CpuBackend::new();
        // (N - base_n) / 8 = 65536 overflows the 16-bit destination stride
        let t = CubeTiling::new(8, 524_288 + 16, 8, 8, 16, 8, 16, 8);
        let err = MatmulReduceKernel::new(&t, &backend, MatmulOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            KernelError::Tensor(tp_tensor::TensorError::TransferOverflow {
                field: "dst_stride",
                ..
            })
        ));
    }

    #[test]
    fn test_leaky_relu_option() {
        let backend = CpuBackend::new();
        let t = CubeTiling::new(8, 16, 8, 8, 16, 8, 16, 8);
        let (a, b) = operands(&t);
        let mut c = vec![0.0f32; 8 * 16];
        let options = MatmulOptions {
            activation: Activation::leaky_relu(),
        };
        {
            let mut regions = split_output(&mut c, &t).unwrap();
            let mut k = MatmulReduceKernel::new(&t, &backend, options).unwrap();
            k.process(0, &a, &b, None, &mut regions[0]).unwrap();
        }
        let mut expected = golden::matmul(&a, &b, None, 8, 8, 16);
        backend.leaky_relu(&mut expected, LEAKY_RELU_ALPHA);
        assert_eq!(c, expected);
        assert!(expected.iter().any(|&v| v < 0.0));
    }
}
