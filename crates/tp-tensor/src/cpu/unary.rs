// Element-wise transforms used by CpuBackend.

pub(crate) fn exp(dst: &mut [f32], src: &[f32]) {
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = s.exp();
    }
}

pub(crate) fn leaky_relu(x: &mut [f32], alpha: f32) {
    for v in x.iter_mut() {
        if *v < 0.0 {
            *v *= alpha;
        }
    }
}
