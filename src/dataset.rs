//! Multi-subject dataset container.
//!
//! [`DatasetEphy`] aggregates one normalized [`Recording`] per subject plus a
//! matching per-subject trial outcome vector and a single shared time axis.
//! Subjects may record different ROI subsets and different trial counts; the
//! engine pools, per ROI pair, only the subjects that record both ROIs of
//! that pair.  Everything in here is read-only after construction.

use log::info;
use ndarray::Array3;

use crate::error::{ConnError, Result};
use crate::io::{conn_io, AxisSpec, RecordingInput};

/// Tolerance when comparing subjects' time coordinates to the shared axis.
const TIME_TOL: f64 = 1e-9;

/// One subject's normalized recording: a (trial, ROI, time) tensor plus its
/// ROI labels.  The time axis lives on the dataset, shared by all subjects.
#[derive(Debug, Clone)]
pub struct Recording {
    data: Array3<f64>,
    roi: Vec<String>,
}

impl Recording {
    pub fn n_trials(&self) -> usize {
        self.data.dim().0
    }

    pub fn n_roi(&self) -> usize {
        self.data.dim().1
    }

    pub fn n_times(&self) -> usize {
        self.data.dim().2
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn roi(&self) -> &[String] {
        &self.roi
    }

    /// Position of `label` on this subject's ROI axis, if recorded.
    pub fn roi_index(&self, label: &str) -> Option<usize> {
        self.roi.iter().position(|r| r == label)
    }
}

/// Multi-subject electrophysiological dataset.
#[derive(Debug, Clone)]
pub struct DatasetEphy {
    recordings: Vec<Recording>,
    outcomes: Vec<Vec<f64>>,
    times: Vec<f64>,
    roi_union: Vec<String>,
}

impl DatasetEphy {
    /// Build a dataset from raw per-subject tensors, the common entry
    /// point: one (trial, ROI, time) array per subject, one trial outcome
    /// vector per subject, one ROI label list per subject, and a single time
    /// vector shared by everyone.
    ///
    /// Each tensor is routed through [`conn_io`] so the shape invariants of
    /// the normalizer apply per subject.
    pub fn from_arrays(
        x: Vec<Array3<f64>>,
        y: Vec<Vec<f64>>,
        roi: Vec<Vec<String>>,
        times: Vec<f64>,
    ) -> Result<Self> {
        if x.len() != roi.len() {
            return Err(ConnError::Config(format!(
                "{} recording(s) but {} ROI list(s)",
                x.len(),
                roi.len()
            )));
        }
        let mut normalized = Vec::with_capacity(x.len());
        for (data, labels) in x.into_iter().zip(roi) {
            normalized.push(conn_io(
                data.into(),
                AxisSpec::Values(labels),
                AxisSpec::Values(times.clone()),
            )?);
        }
        Self::new(normalized, y)
    }

    /// Build a dataset from heterogeneous inputs (plain or labeled tensors),
    /// normalizing each through [`conn_io`] with its own axis specs.
    pub fn from_inputs(
        inputs: Vec<(RecordingInput, AxisSpec<String>, AxisSpec<f64>)>,
        y: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let mut normalized = Vec::with_capacity(inputs.len());
        for (input, roi, times) in inputs {
            normalized.push(conn_io(input, roi, times)?);
        }
        Self::new(normalized, y)
    }

    /// Assemble a dataset from already-normalized triples.
    ///
    /// Validates, failing fast before any computation:
    /// * at least one subject;
    /// * one outcome vector per subject, each of that subject's trial count
    ///   ([`ConnError::ShapeMismatch`] on the `outcome` axis otherwise);
    /// * unique ROI labels within each subject;
    /// * every subject's time coordinates equal (length and values) to the
    ///   first subject's, which becomes the shared axis
    ///   ([`ConnError::TimeAxisMismatch`] otherwise).
    pub fn new(
        subjects: Vec<(Array3<f64>, Vec<String>, Vec<f64>)>,
        y: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if subjects.is_empty() {
            return Err(ConnError::Config("dataset needs at least one subject".into()));
        }
        if y.len() != subjects.len() {
            return Err(ConnError::Config(format!(
                "{} subject(s) but {} outcome vector(s)",
                subjects.len(),
                y.len()
            )));
        }

        let shared_times = subjects[0].2.clone();
        let mut recordings = Vec::with_capacity(subjects.len());
        let mut roi_union: Vec<String> = Vec::new();

        for (s, ((data, roi, times), y_s)) in subjects.into_iter().zip(&y).enumerate() {
            if times.len() != shared_times.len() {
                return Err(ConnError::TimeAxisMismatch {
                    subject: s,
                    reason: format!(
                        "{} sample(s), shared axis has {}",
                        times.len(),
                        shared_times.len()
                    ),
                });
            }
            if let Some(i) = times
                .iter()
                .zip(&shared_times)
                .position(|(a, b)| (a - b).abs() > TIME_TOL)
            {
                return Err(ConnError::TimeAxisMismatch {
                    subject: s,
                    reason: format!(
                        "value {} at index {i} differs from shared value {}",
                        times[i], shared_times[i]
                    ),
                });
            }
            if y_s.len() != data.dim().0 {
                return Err(ConnError::ShapeMismatch {
                    axis: "outcome",
                    expected: data.dim().0,
                    got: y_s.len(),
                });
            }
            for (i, label) in roi.iter().enumerate() {
                if roi[..i].contains(label) {
                    return Err(ConnError::Config(format!(
                        "subject {s}: duplicate ROI label '{label}'"
                    )));
                }
                if !roi_union.contains(label) {
                    roi_union.push(label.clone());
                }
            }
            recordings.push(Recording { data, roi });
        }

        info!(
            "dataset: {} subject(s), {} distinct ROI(s), {} time sample(s)",
            recordings.len(),
            roi_union.len(),
            shared_times.len()
        );
        Ok(Self { recordings, outcomes: y, times: shared_times, roi_union })
    }

    pub fn n_subjects(&self) -> usize {
        self.recordings.len()
    }

    pub fn subjects(&self) -> impl Iterator<Item = &Recording> {
        self.recordings.iter()
    }

    pub fn recording(&self, subject: usize) -> &Recording {
        &self.recordings[subject]
    }

    /// Trial outcome vector of one subject (length = that subject's trials).
    pub fn outcome(&self, subject: usize) -> &[f64] {
        &self.outcomes[subject]
    }

    /// Shared time coordinates.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Union of ROI labels across subjects, in first-appearance order.
    pub fn roi_union(&self) -> &[String] {
        &self.roi_union
    }

    /// Subjects recording every label in `labels`, with the per-subject ROI
    /// axis index of each label.
    pub fn subjects_with(&self, labels: &[&str]) -> Vec<(usize, Vec<usize>)> {
        self.recordings
            .iter()
            .enumerate()
            .filter_map(|(s, rec)| {
                let idx: Option<Vec<usize>> =
                    labels.iter().map(|l| rec.roi_index(l)).collect();
                idx.map(|idx| (s, idx))
            })
            .collect()
    }
}
