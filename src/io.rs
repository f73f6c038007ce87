//! Input normalization for connectivity functions.
//!
//! [`conn_io`] accepts a recording either as a plain numeric tensor or as a
//! [`LabeledArray`] carrying named coordinate axes, and produces the canonical
//! triple every downstream component operates on:
//!
//! ```text
//! (Array3<f64> [trials, roi, times], Vec<String> roi, Vec<f64> times)
//! ```
//!
//! The labeled/plain distinction is resolved here, once. The engine only ever
//! sees plain tensors plus concrete label sequences.

use std::collections::HashMap;

use log::info;
use ndarray::{Array3, ArrayD};

use crate::error::{ConnError, Result};

/// A coordinate attached to a named axis of a [`LabeledArray`].
#[derive(Debug, Clone)]
pub enum Coord {
    /// String labels (e.g. ROI names).
    Labels(Vec<String>),
    /// Numeric values (e.g. a time vector).
    Values(Vec<f64>),
}

/// A numeric tensor with named coordinate axes.
///
/// This is the crate's stand-in for a `DataArray`: just enough structure to
/// let callers refer to ROI labels and time coordinates by axis name instead
/// of passing them alongside the data.
#[derive(Debug, Clone)]
pub struct LabeledArray {
    data: ArrayD<f64>,
    coords: HashMap<String, Coord>,
}

impl LabeledArray {
    pub fn new(data: ArrayD<f64>) -> Self {
        Self { data, coords: HashMap::new() }
    }

    /// Attach string labels under `name` (builder style).
    pub fn with_labels(mut self, name: &str, labels: Vec<String>) -> Self {
        self.coords.insert(name.to_string(), Coord::Labels(labels));
        self
    }

    /// Attach a numeric coordinate vector under `name` (builder style).
    pub fn with_values(mut self, name: &str, values: Vec<f64>) -> Self {
        self.coords.insert(name.to_string(), Coord::Values(values));
        self
    }

    fn coord(&self, name: &str) -> Option<&Coord> {
        self.coords.get(name)
    }
}

/// One subject's recording, before normalization.
#[derive(Debug, Clone)]
pub enum RecordingInput {
    /// A bare numeric tensor; axis metadata must be supplied separately
    /// (or defaulted).
    Raw(ArrayD<f64>),
    /// A tensor with named coordinates that [`AxisSpec::Name`] can resolve
    /// against.
    Labeled(LabeledArray),
}

impl From<Array3<f64>> for RecordingInput {
    fn from(a: Array3<f64>) -> Self {
        RecordingInput::Raw(a.into_dyn())
    }
}

/// How one axis' labels are obtained.
#[derive(Debug, Clone)]
pub enum AxisSpec<T> {
    /// Synthesize defaults (`roi_0 … roi_{n-1}`, or a 0-based integer time
    /// index).
    Default,
    /// Use this sequence directly.
    Values(Vec<T>),
    /// Read the named coordinate from the labeled input. Invalid when the
    /// input is a plain tensor.
    Name(String),
}

impl<T> Default for AxisSpec<T> {
    fn default() -> Self {
        AxisSpec::Default
    }
}

/// Normalize one recording into the canonical (tensor, roi, times) triple.
///
/// * The tensor must be exactly 3-D with axes ordered (trial, ROI, time);
///   anything else is [`ConnError::InvalidShape`].
/// * `roi` and `times` are resolved per [`AxisSpec`]. An [`AxisSpec::Name`]
///   against a [`RecordingInput::Raw`] input, a missing coordinate, or a
///   coordinate of the wrong kind (numeric where labels are expected, or
///   vice versa) is a [`ConnError::Config`].
/// * After resolution the tensor shape must equal
///   `(n_trials, roi.len(), times.len())` exactly; a disagreement is
///   [`ConnError::ShapeMismatch`] — a symbolic name that resolved to a
///   coordinate of the wrong length is never silently truncated or padded.
pub fn conn_io(
    input: RecordingInput,
    roi: AxisSpec<String>,
    times: AxisSpec<f64>,
) -> Result<(Array3<f64>, Vec<String>, Vec<f64>)> {
    let (data, labeled) = match input {
        RecordingInput::Raw(d) => (d, None),
        RecordingInput::Labeled(la) => (la.data.clone(), Some(la)),
    };

    if data.ndim() != 3 {
        return Err(ConnError::InvalidShape { ndim: data.ndim() });
    }
    let (n_trials, n_roi, n_times) = (data.shape()[0], data.shape()[1], data.shape()[2]);
    info!("inputs conversion (n_trials={n_trials}, n_roi={n_roi}, n_times={n_times})");

    let roi = match roi {
        AxisSpec::Default => (0..n_roi).map(|k| format!("roi_{k}")).collect(),
        AxisSpec::Values(v) => v,
        AxisSpec::Name(name) => match resolve_coord(labeled.as_ref(), &name)? {
            Coord::Labels(v) => v.clone(),
            Coord::Values(_) => {
                return Err(ConnError::Config(format!(
                    "coordinate '{name}' holds numeric values, expected ROI labels"
                )))
            }
        },
    };

    let times = match times {
        AxisSpec::Default => (0..n_times).map(|t| t as f64).collect(),
        AxisSpec::Values(v) => v,
        AxisSpec::Name(name) => match resolve_coord(labeled.as_ref(), &name)? {
            Coord::Values(v) => v.clone(),
            Coord::Labels(_) => {
                return Err(ConnError::Config(format!(
                    "coordinate '{name}' holds string labels, expected time values"
                )))
            }
        },
    };

    if roi.len() != n_roi {
        return Err(ConnError::ShapeMismatch { axis: "roi", expected: n_roi, got: roi.len() });
    }
    if times.len() != n_times {
        return Err(ConnError::ShapeMismatch { axis: "time", expected: n_times, got: times.len() });
    }

    let data = data
        .into_dimensionality::<ndarray::Ix3>()
        .map_err(|_| ConnError::InvalidShape { ndim: 0 })?;
    Ok((data, roi, times))
}

fn resolve_coord<'a>(labeled: Option<&'a LabeledArray>, name: &str) -> Result<&'a Coord> {
    let la = labeled.ok_or_else(|| {
        ConnError::Config(format!(
            "coordinate name '{name}' requires a labeled input, got a plain tensor"
        ))
    })?;
    la.coord(name).ok_or_else(|| {
        ConnError::Config(format!("no coordinate named '{name}' on the labeled input"))
    })
}
