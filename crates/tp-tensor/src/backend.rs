use std::fmt::Debug;

use half::f16;

use crate::view::MatrixView;

/// Trait for pluggable per-tile compute backends.
///
/// Operations work in place on local-memory slices, the way vector units
/// operate on tiles already resident in scratch memory. Operand lengths are a
/// caller precondition: no operation validates them, and mismatched lengths
/// either panic or leave trailing elements untouched.
pub trait VectorBackend: Send + Sync + Debug {
    /// Returns the name of this backend (e.g., "cpu").
    fn name(&self) -> &str;

    /// Element-wise exponential: dst[i] = exp(src[i]).
    ///
    /// No range reduction or max subtraction; large inputs overflow to `inf`.
    fn exp(&self, dst: &mut [f32], src: &[f32]);

    /// In-place accumulation: acc[i] += src[i].
    fn add_assign(&self, acc: &mut [f32], src: &[f32]);

    /// Element-wise division: dst[i] = num[i] / den[i].
    fn div(&self, dst: &mut [f32], num: &[f32], den: &[f32]);

    /// Broadcast a scalar: dst[i] = value.
    fn duplicate(&self, dst: &mut [f32], value: f32);

    /// Horizontal reduction of `src` to a single scalar using pairwise
    /// (tree) summation.
    fn reduce_sum(&self, src: &[f32]) -> f32;

    /// Per-row reduction of a row-major `[dst.len() x inner]` block:
    /// dst[r] = sum(src[r * inner..(r + 1) * inner]).
    fn row_sum(&self, dst: &mut [f32], src: &[f32], inner: usize);

    /// In-place leaky rectifier: x = x >= 0 ? x : alpha * x.
    fn leaky_relu(&self, x: &mut [f32], alpha: f32);

    /// Matrix multiply-accumulate: c += a @ b.
    ///
    /// - `c`: dense row-major `[a.rows() x b.cols()]` accumulator
    /// - `a`: half-precision view of shape [m, k]
    /// - `b`: half-precision view of shape [k, n]
    ///
    /// Products and sums are carried out in f32.
    fn mmad(&self, c: &mut [f32], a: MatrixView<'_, f16>, b: MatrixView<'_, f16>);
}
