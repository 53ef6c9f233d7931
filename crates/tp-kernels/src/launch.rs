//! Grid launchers: run every unit of a kernel in parallel over its own
//! partition of the bulk buffers.

use half::f16;
use rayon::prelude::*;
use tracing::{debug, info};

use tp_tensor::VectorBackend;

use crate::error::{KernelError, Result};
use crate::matmul::{MatmulOptions, MatmulReduceKernel};
use crate::planner::{split_output, LinearPartition};
use crate::softmax::SoftmaxKernel;
use crate::tiling::{CubeTiling, SoftmaxTiling};

/// What one matmul unit handed back.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    pub unit: usize,
    /// One `base_m`-long vector of row sums per completed row-block.
    pub row_sums: Vec<Vec<f32>>,
}

fn check_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(KernelError::BufferLength {
            what,
            expected,
            got,
        });
    }
    Ok(())
}

/// Softmax over `x` into `z`, one block per unit. Returns the per-unit
/// denominators in unit order.
pub fn launch_softmax(
    tiling: &SoftmaxTiling,
    backend: &dyn VectorBackend,
    x: &[f32],
    z: &mut [f32],
) -> Result<Vec<f32>> {
    launch_softmax_with_depth(tiling, backend, x, z, tiling.buffer_num)
}

/// As [`launch_softmax`], with every unit's queues `depth` slots deep.
pub fn launch_softmax_with_depth(
    tiling: &SoftmaxTiling,
    backend: &dyn VectorBackend,
    x: &[f32],
    z: &mut [f32],
    depth: usize,
) -> Result<Vec<f32>> {
    check_len("x", x.len(), tiling.total_length)?;
    check_len("z", z.len(), tiling.total_length)?;
    info!(
        total_length = tiling.total_length,
        units = tiling.unit_count,
        tile_length = tiling.tile_length(),
        depth,
        backend = backend.name(),
        "launching softmax"
    );

    let part = LinearPartition::from(tiling);
    let inputs = part.split(x);
    let outputs = part.split_mut(z);

    inputs
        .into_par_iter()
        .zip(outputs)
        .enumerate()
        .map(|(unit, (x_block, z_block))| {
            debug!(unit, offset = part.unit_range(unit).start, "softmax unit start");
            let mut kernel = SoftmaxKernel::with_queue_depth(*tiling, backend, depth)?;
            let denominator = kernel.process(x_block, z_block)?;
            debug!(unit, denominator, "softmax unit done");
            Ok(denominator)
        })
        .collect()
}

/// Fused matmul and row reduction over the whole grid.
///
/// `a` is `[M x Ka]`, `b` is `[Kb x N]`, `bias` (read only when the tiling
/// enables it) has N entries, and `c` receives the `[M x N]` product.
pub fn launch_matmul(
    tiling: &CubeTiling,
    backend: &dyn VectorBackend,
    options: MatmulOptions,
    a: &[f16],
    b: &[f16],
    bias: Option<&[f32]>,
    c: &mut [f32],
) -> Result<Vec<UnitReport>> {
    check_len("a", a.len(), (tiling.m * tiling.ka) as usize)?;
    check_len("b", b.len(), (tiling.kb * tiling.n) as usize)?;
    check_len("c", c.len(), (tiling.m * tiling.n) as usize)?;
    if let (true, Some(bias)) = (tiling.has_bias(), bias) {
        check_len("bias", bias.len(), tiling.n as usize)?;
    }
    info!(
        m = tiling.m,
        n = tiling.n,
        k = tiling.ka,
        units = tiling.unit_count(),
        bias = tiling.has_bias() && bias.is_some(),
        activation = ?options.activation,
        backend = backend.name(),
        "launching matmul"
    );

    let regions = split_output(c, tiling)?;
    regions
        .into_par_iter()
        .enumerate()
        .map(|(unit, mut region)| {
            let mut kernel = MatmulReduceKernel::new(tiling, backend, options)?;
            let row_sums = kernel.process(unit, a, b, bias, &mut region)?;
            debug!(unit, row_blocks = row_sums.len(), "matmul unit done");
            Ok(UnitReport { unit, row_sums })
        })
        .collect()
}

/// As [`launch_matmul`], with the tiling read from its packed byte form.
pub fn launch_matmul_from_bytes(
    tiling_bytes: &[u8],
    backend: &dyn VectorBackend,
    options: MatmulOptions,
    a: &[f16],
    b: &[f16],
    bias: Option<&[f32]>,
    c: &mut [f32],
) -> Result<Vec<UnitReport>> {
    let tiling = CubeTiling::from_bytes(tiling_bytes)?;
    launch_matmul(&tiling, backend, options, a, b, bias, c)
}
