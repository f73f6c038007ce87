/// Shared helpers for connectivity integration tests.
use ephyconn::sim::{inject_coupling, sim_multi_subject, window_mean_outcome};
use ephyconn::DatasetEphy;

#[allow(unused)]
/// Hanning window of length `n` (the smoothing kernel used throughout the
/// reference scenario).
pub fn hanning(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / (n as f64 - 1.0)).cos())
        .collect()
}

#[allow(unused)]
/// The reference coupling scenario: 5 subjects × 50 trials × 4 ROIs × 100
/// time samples of Gaussian noise, with roi_0 injected into roi_1 over
/// samples [20, 40) and roi_3 injected into roi_2 over [60, 80). Outcomes
/// are the per-trial window mean over samples [40, 60).
pub fn coupled_dataset(seed: u64) -> DatasetEphy {
    let (mut x, roi) = sim_multi_subject(5, 50, 4, 100, seed);
    inject_coupling(&mut x, 0, 1, 20..40);
    inject_coupling(&mut x, 3, 2, 60..80);
    let y = window_mean_outcome(&x, 40..60);
    let times: Vec<f64> = (0..100).map(|t| -1.0 + 2.0 * t as f64 / 99.0).collect();
    DatasetEphy::from_arrays(x, y, roi, times).unwrap()
}
