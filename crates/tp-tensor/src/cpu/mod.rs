pub mod matmul;
pub mod reduce;
pub mod unary;

use half::f16;

use crate::backend::VectorBackend;
use crate::view::MatrixView;

/// Pure-Rust CPU compute backend.
///
/// Implements all operations with straightforward loops optimized for
/// correctness rather than peak performance. Intended as a reference
/// implementation and fallback.
#[derive(Debug, Clone)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        CpuBackend
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn exp(&self, dst: &mut [f32], src: &[f32]) {
        unary::exp(dst, src);
    }

    fn add_assign(&self, acc: &mut [f32], src: &[f32]) {
        for (a, &s) in acc.iter_mut().zip(src) {
            *a += s;
        }
    }

    fn div(&self, dst: &mut [f32], num: &[f32], den: &[f32]) {
        for ((d, &n), &q) in dst.iter_mut().zip(num).zip(den) {
            *d = n / q;
        }
    }

    fn duplicate(&self, dst: &mut [f32], value: f32) {
        dst.fill(value);
    }

    fn reduce_sum(&self, src: &[f32]) -> f32 {
        reduce::tree_sum(src)
    }

    fn row_sum(&self, dst: &mut [f32], src: &[f32], inner: usize) {
        reduce::row_sum(dst, src, inner);
    }

    fn leaky_relu(&self, x: &mut [f32], alpha: f32) {
        unary::leaky_relu(x, alpha);
    }

    fn mmad(&self, c: &mut [f32], a: MatrixView<'_, f16>, b: MatrixView<'_, f16>) {
        matmul::mmad(c, a, b);
    }
}
