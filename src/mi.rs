//! Mutual information estimation.
//!
//! The engine is estimator-agnostic: anything matching [`MiEstimator`] can be
//! plugged in. The built-in [`mi_binned`] is an equal-width histogram
//! estimator (√n bins, natural log) — crude but fast, monotone in dependence
//! strength, and entirely adequate under a permutation test where the same
//! estimator bias enters the observed statistic and every null draw alike.

/// A pluggable MI estimator: two aligned 1-D samples in, one scalar out.
///
/// Must return NaN (not panic) on input it cannot handle; the engine treats
/// non-finite output as a degenerate cell.
pub trait MiEstimator: Fn(&[f64], &[f64]) -> f64 + Sync {}

impl<F: Fn(&[f64], &[f64]) -> f64 + Sync> MiEstimator for F {}

/// Histogram MI estimate between two aligned samples, in nats.
///
/// Bin count is `max(4, ceil(sqrt(n)))` per axis, with equal-width bins over
/// each variable's observed range. Degenerate input — fewer than two samples,
/// mismatched lengths, a non-finite value, or a zero-variance variable —
/// yields NaN.
pub fn mi_binned(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n < 2 || y.len() != n {
        return f64::NAN;
    }

    let (min_x, max_x) = match finite_min_max(x) {
        Some(r) => r,
        None => return f64::NAN,
    };
    let (min_y, max_y) = match finite_min_max(y) {
        Some(r) => r,
        None => return f64::NAN,
    };
    let range_x = max_x - min_x;
    let range_y = max_y - min_y;
    if range_x <= 0.0 || range_y <= 0.0 {
        // Zero-variance input: MI is undefined for this estimator.
        return f64::NAN;
    }

    let n_bins = ((n as f64).sqrt().ceil() as usize).max(4);
    let bin = |v: f64, min: f64, range: f64| -> usize {
        (((v - min) / range) * n_bins as f64).min((n_bins - 1) as f64) as usize
    };

    let mut joint = vec![0usize; n_bins * n_bins];
    let mut marg_x = vec![0usize; n_bins];
    let mut marg_y = vec![0usize; n_bins];
    for i in 0..n {
        let bx = bin(x[i], min_x, range_x);
        let by = bin(y[i], min_y, range_y);
        joint[bx * n_bins + by] += 1;
        marg_x[bx] += 1;
        marg_y[by] += 1;
    }

    let total = n as f64;
    let mut mi = 0.0;
    for bx in 0..n_bins {
        if marg_x[bx] == 0 {
            continue;
        }
        let px = marg_x[bx] as f64 / total;
        for by in 0..n_bins {
            let c = joint[bx * n_bins + by];
            if c == 0 {
                continue;
            }
            let pxy = c as f64 / total;
            let py = marg_y[by] as f64 / total;
            mi += pxy * (pxy / (px * py)).ln();
        }
    }
    mi.max(0.0)
}

fn finite_min_max(data: &[f64]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in data {
        if !v.is_finite() {
            return None;
        }
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    Some((min, max))
}
