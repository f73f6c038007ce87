//! Temporal smoothing of per-time statistics.
//!
//! A finite kernel (e.g. a Hanning window) convolved along the time axis of
//! the MI sequence. Output length always equals input length ("same" mode);
//! at the borders the kernel is renormalized over the valid overlap instead
//! of zero-padding, so edge samples are unbiased averages of what is actually
//! there. The engine applies the identical treatment to the observed series
//! and to every permutation's null series, keeping the two comparable.

/// Convolve `x` with `kernel`, same-length output, renormalized edges.
///
/// The kernel is normalized to unit sum internally, so scaling it has no
/// effect on the result. A length-1 kernel reproduces `x` exactly. NaN cells
/// in `x` propagate to every output sample whose window covers them.
pub fn smooth_same(x: &[f64], kernel: &[f64]) -> Vec<f64> {
    debug_assert!(!kernel.is_empty());
    if kernel.len() == 1 || x.is_empty() {
        return x.to_vec();
    }

    let n = x.len();
    let k = kernel.len();
    // Center offset; for even kernels the extra tap trails, matching
    // convolve(..., mode="same").
    let half = (k - 1) / 2;

    let mut out = vec![0.0; n];
    for t in 0..n {
        let mut acc = 0.0;
        let mut weight = 0.0;
        for (j, &w) in kernel.iter().enumerate() {
            let idx = t as isize + j as isize - half as isize;
            if idx < 0 || idx >= n as isize {
                continue;
            }
            acc += w * x[idx as usize];
            weight += w;
        }
        out[t] = if weight != 0.0 { acc / weight } else { f64::NAN };
    }
    out
}
