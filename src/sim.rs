//! Synthetic multi-subject recordings for tests and examples.
//!
//! Deliberately simple: seeded Gaussian noise per subject, a helper that
//! injects one ROI's activity into another over a sample window (so a known
//! coupling can be planted and recovered), and a window-mean outcome builder.

use ndarray::Array3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use std::ops::Range;

/// Simulate `n_subjects` independent Gaussian recordings of shape
/// (n_trials, n_roi, n_times), with default `roi_k` labels per subject.
pub fn sim_multi_subject(
    n_subjects: usize,
    n_trials: usize,
    n_roi: usize,
    n_times: usize,
    seed: u64,
) -> (Vec<Array3<f64>>, Vec<Vec<String>>) {
    let mut x = Vec::with_capacity(n_subjects);
    for s in 0..n_subjects {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(s as u64));
        x.push(Array3::from_shape_simple_fn((n_trials, n_roi, n_times), || {
            StandardNormal.sample(&mut rng)
        }));
    }
    let roi = (0..n_subjects)
        .map(|_| (0..n_roi).map(|k| format!("roi_{k}")).collect())
        .collect();
    (x, roi)
}

/// Add ROI `source`'s signal into ROI `target` over `window`, for every
/// subject and trial. Outside the window the two ROIs stay independent.
pub fn inject_coupling(x: &mut [Array3<f64>], source: usize, target: usize, window: Range<usize>) {
    for data in x.iter_mut() {
        let (n_trials, _, _) = data.dim();
        for trial in 0..n_trials {
            for t in window.clone() {
                let v = data[[trial, source, t]];
                data[[trial, target, t]] += v;
            }
        }
    }
}

/// Per-subject trial outcome: the mean over all ROIs and the `window` time
/// samples of each trial.
pub fn window_mean_outcome(x: &[Array3<f64>], window: Range<usize>) -> Vec<Vec<f64>> {
    x.iter()
        .map(|data| {
            let (n_trials, n_roi, _) = data.dim();
            let denom = (n_roi * window.len()) as f64;
            (0..n_trials)
                .map(|trial| {
                    let mut acc = 0.0;
                    for r in 0..n_roi {
                        for t in window.clone() {
                            acc += data[[trial, r, t]];
                        }
                    }
                    acc / denom
                })
                .collect()
        })
        .collect()
}
