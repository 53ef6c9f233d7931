/// Pairwise summation: the slice is split in half recursively and the two
/// partial sums are added. Rounding therefore depends on the slice length,
/// not on how the data arrived.
pub(crate) fn tree_sum(src: &[f32]) -> f32 {
    match src.len() {
        0 => 0.0,
        1 => src[0],
        n => {
            let (lo, hi) = src.split_at(n / 2);
            tree_sum(lo) + tree_sum(hi)
        }
    }
}

pub(crate) fn row_sum(dst: &mut [f32], src: &[f32], inner: usize) {
    for (d, row) in dst.iter_mut().zip(src.chunks_exact(inner)) {
        *d = tree_sum(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_sum_small() {
        assert_eq!(tree_sum(&[]), 0.0);
        assert_eq!(tree_sum(&[3.0]), 3.0);
        assert_eq!(tree_sum(&[1.0, 2.0, 3.0]), 6.0);
    }

    #[test]
    fn test_tree_sum_pairing_order() {
        // ((a + b) + (c + d)) keeps the small terms together, a left fold
        // would absorb them into 1e8 one at a time.
        let v = [1e8f32, 4.0, 4.0, 4.0];
        let pairwise = (1e8f32 + 4.0) + (4.0f32 + 4.0);
        assert_eq!(tree_sum(&v), pairwise);
    }

    #[test]
    fn test_row_sum() {
        let src = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mut dst = [0.0f32; 2];
        row_sum(&mut dst, &src, 3);
        assert_eq!(dst, [6.0, 15.0]);
    }
}
