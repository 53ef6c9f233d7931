//! Straightforward host-side references for checking kernel output.

use half::f16;

/// Block-local softmax, each `block_len` chunk normalized on its own.
///
/// Computed in f64 without max subtraction, matching the kernel's
/// overflow behaviour up to rounding.
pub fn block_softmax(x: &[f32], block_len: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(x.len());
    for block in x.chunks(block_len) {
        let den: f64 = block.iter().map(|&v| (v as f64).exp()).sum();
        out.extend(block.iter().map(|&v| ((v as f64).exp() / den) as f32));
    }
    out
}

/// `C[m x n] = A[m x k] @ B[k x n] (+ bias)`, row-major.
///
/// Accumulates in f32 in ascending k from zero and adds the bias last, the
/// same order the kernel uses, so results compare bit for bit.
pub fn matmul(
    a: &[f16],
    b: &[f16],
    bias: Option<&[f32]>,
    m: usize,
    k: usize,
    n: usize,
) -> Vec<f32> {
    let mut c = vec![0.0f32; m * n];
    for i in 0..m {
        let row = &mut c[i * n..(i + 1) * n];
        for p in 0..k {
            let av = a[i * k + p].to_f32();
            for (j, cv) in row.iter_mut().enumerate() {
                *cv += av * b[p * n + j].to_f32();
            }
        }
        if let Some(bias) = bias {
            for (cv, bv) in row.iter_mut().zip(bias) {
                *cv += bv;
            }
        }
    }
    c
}

/// Sum of each `width`-wide row segment of a row-major `[rows x cols]`
/// matrix, starting at column `col0`. Accumulated in f64.
pub fn row_sums(
    c: &[f32],
    cols: usize,
    rows: std::ops::Range<usize>,
    col0: usize,
    width: usize,
) -> Vec<f64> {
    rows.map(|r| {
        c[r * cols + col0..r * cols + col0 + width]
            .iter()
            .map(|&v| v as f64)
            .sum()
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_softmax_blocks_are_independent() {
        let z = block_softmax(&[0.0, 0.0, 1.0, 1.0], 2);
        assert_eq!(z, vec![0.5; 4]);
    }

    #[test]
    fn test_matmul_small() {
        let h = |v: &[f32]| v.iter().map(|&x| f16::from_f32(x)).collect::<Vec<_>>();
        let a = h(&[1.0, 2.0, 3.0, 4.0]);
        let b = h(&[5.0, 6.0, 7.0, 8.0]);
        assert_eq!(matmul(&a, &b, None, 2, 2, 2), vec![19.0, 22.0, 43.0, 50.0]);
        assert_eq!(
            matmul(&a, &b, Some(&[1.0, -1.0]), 2, 2, 2),
            vec![20.0, 21.0, 44.0, 49.0]
        );
    }

    #[test]
    fn test_row_sums() {
        let c = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(row_sums(&c, 3, 0..2, 1, 2), vec![5.0, 11.0]);
    }
}
