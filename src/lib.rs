//! # ephyconn — MI-based pairwise connectivity for multi-subject ephys data
//!
//! `ephyconn` estimates pairwise functional connectivity between regions of
//! interest (ROIs) in multi-subject electrophysiological recordings, using
//! mutual information (MI) as the dependency measure, and assesses the
//! significance of every link with a permutation test.
//!
//! ## Pipeline overview
//!
//! ```text
//! per-subject (trials × ROI × times) tensors  +  per-trial outcomes
//!   │
//!   ├─ io::conn_io()        normalize plain / labeled inputs into the
//!   │                       canonical (tensor, roi, times) triple
//!   ├─ DatasetEphy          aggregate subjects, validate the shared time
//!   │                       axis, derive the ROI union
//!   ├─ conn_mi()            for every ordered ROI pair: pooled per-time MI,
//!   │                       optional kernel smoothing, seeded permutation
//!   │                       null, one-sided p-values (rayon across pairs)
//!   └─ ConnOutput           raw (n_pairs, n_times) matrices, or labeled
//!                           source/target/time axes with .sel() lookup
//! ```
//!
//! ## Quick start
//!
//! ```
//! use ephyconn::{conn_mi, ConnConfig, DatasetEphy};
//! use ephyconn::sim::{inject_coupling, sim_multi_subject, window_mean_outcome};
//!
//! // Simulate 3 subjects × 20 trials × 3 ROIs × 30 time samples, and plant
//! // a coupling from roi_0 into roi_1 over samples 10..20.
//! let (mut x, roi) = sim_multi_subject(3, 20, 3, 30, 0);
//! inject_coupling(&mut x, 0, 1, 10..20);
//! let y = window_mean_outcome(&x, 10..20);
//! let times: Vec<f64> = (0..30).map(|t| t as f64 / 30.0).collect();
//!
//! let ds = DatasetEphy::from_arrays(x, y, roi, times).unwrap();
//! let cfg = ConnConfig { n_perm: 50, ..Default::default() };
//! let out = conn_mi(&ds, &cfg).unwrap();
//!
//! let da = out.as_dataarray().unwrap();
//! let (mi, pv) = da.sel("roi_0", "roi_1").unwrap();
//! assert_eq!(mi.len(), 30);
//! assert!(pv.iter().all(|p| (0.0..=1.0).contains(p)));
//! ```
//!
//! ## Error model
//!
//! Structural and configuration problems ([`ConnError`]) fail fast before any
//! computation: a non-3-D tensor, a label sequence whose length disagrees
//! with its axis, subjects with mismatched time axes, a malformed kernel or
//! worker count. Per-cell estimator failures (e.g. zero-variance input) never
//! abort a run: the affected (pair, time) cell is reported as NaN and a
//! warning is logged through the [`log`] facade.

pub mod dataset;
pub mod engine;
pub mod error;
pub mod io;
pub mod mi;
pub mod output;
pub mod sim;
pub mod smooth;

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `ephyconn::Foo` without having to know the internal module layout.

// dataset
pub use dataset::{DatasetEphy, Recording};

// engine
pub use engine::{conn_mi, conn_mi_with, ConnConfig, SecondVariable, BEHAVIOR_TARGET};

// error
pub use error::{ConnError, Result};

// io
pub use io::{conn_io, AxisSpec, Coord, LabeledArray, RecordingInput};

// mi
pub use mi::{mi_binned, MiEstimator};

// output
pub use output::{ConnDataArray, ConnOutput, OutputType};

// smooth
pub use smooth::smooth_same;
