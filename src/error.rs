//! Error taxonomy for the connectivity pipeline.
//!
//! Structural and configuration problems are surfaced through [`ConnError`]
//! and fail fast, before any expensive computation starts.  Degenerate
//! per-cell estimator failures are *not* errors: they are recovered locally,
//! reported as NaN in the affected (pair, time) cell and logged at warning
//! level (see [`crate::engine`]).

use thiserror::Error;

/// Everything that can go wrong while building a dataset or configuring the
/// pairwise engine.
#[derive(Debug, Error)]
pub enum ConnError {
    /// The recording tensor is not exactly 3-dimensional.
    #[error("recording tensor must be 3-D (trials, roi, times), got {ndim} dimension(s)")]
    InvalidShape { ndim: usize },

    /// A resolved label sequence disagrees in length with the tensor axis it
    /// is supposed to describe.
    #[error("{axis} axis: resolved {got} label(s) but the tensor axis has length {expected}")]
    ShapeMismatch {
        axis: &'static str,
        expected: usize,
        got: usize,
    },

    /// A subject's time coordinates disagree with the shared time axis.
    #[error("subject {subject}: time axis mismatch ({reason})")]
    TimeAxisMismatch { subject: usize, reason: String },

    /// Malformed configuration: bad kernel, invalid worker count,
    /// unrecognized output format, unresolvable coordinate name.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ConnError>;
