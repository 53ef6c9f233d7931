use half::f16;

use crate::view::MatrixView;

/// c[m x n] += a[m x k] @ b[k x n], accumulating in f32 in ascending k order.
pub(crate) fn mmad(c: &mut [f32], a: MatrixView<'_, f16>, b: MatrixView<'_, f16>) {
    let n = b.cols();
    for i in 0..a.rows() {
        let c_row = &mut c[i * n..(i + 1) * n];
        let a_row = a.row(i);
        for (p, av) in a_row.iter().enumerate() {
            let av = av.to_f32();
            for (cv, bv) in c_row.iter_mut().zip(b.row(p)) {
                *cv += av * bv.to_f32();
            }
        }
    }
}
