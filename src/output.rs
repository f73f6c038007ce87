//! Result packaging.
//!
//! Pure bookkeeping: the engine produces (n_pairs, n_times) MI and p-value
//! matrices in a deterministic pair order, and this module wraps them either
//! raw ([`ConnOutput::Array`]) or with source/target/time coordinates for
//! label-based lookup ([`ConnOutput::DataArray`]). No computation happens
//! here.

use std::str::FromStr;

use ndarray::{Array2, ArrayView1};

use crate::error::ConnError;

/// Requested output form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    /// Raw matrices; the caller keeps track of the pair ordering.
    Array,
    /// Labeled output with source/target/time coordinates.
    #[default]
    DataArray,
}

impl FromStr for OutputType {
    type Err = ConnError;

    /// Parse the string form (`"array"` / `"dataarray"`).
    fn from_str(s: &str) -> Result<Self, ConnError> {
        match s {
            "array" => Ok(OutputType::Array),
            "dataarray" => Ok(OutputType::DataArray),
            other => Err(ConnError::Config(format!(
                "unrecognized output type '{other}' (expected 'array' or 'dataarray')"
            ))),
        }
    }
}

/// Labeled connectivity result.
///
/// Row `p` of `mi` / `pv` belongs to the ordered pair
/// (`source[p]`, `target[p]`); columns follow `times`.
#[derive(Debug, Clone)]
pub struct ConnDataArray {
    pub mi: Array2<f64>,
    pub pv: Array2<f64>,
    pub source: Vec<String>,
    pub target: Vec<String>,
    pub times: Vec<f64>,
}

impl ConnDataArray {
    /// Per-time (MI, p-value) slices for one ordered pair, if present.
    pub fn sel(&self, source: &str, target: &str) -> Option<(ArrayView1<f64>, ArrayView1<f64>)> {
        let p = self
            .source
            .iter()
            .zip(&self.target)
            .position(|(s, t)| s == source && t == target)?;
        Some((self.mi.row(p), self.pv.row(p)))
    }

    /// All rows whose source matches, as (target, MI, p-value) triples.
    pub fn sel_source(&self, source: &str) -> Vec<(&str, ArrayView1<f64>, ArrayView1<f64>)> {
        self.source
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_str() == source)
            .map(|(p, _)| (self.target[p].as_str(), self.mi.row(p), self.pv.row(p)))
            .collect()
    }

    pub fn n_pairs(&self) -> usize {
        self.mi.nrows()
    }

    pub fn n_times(&self) -> usize {
        self.mi.ncols()
    }
}

/// Final result of a connectivity run.
#[derive(Debug, Clone)]
pub enum ConnOutput {
    Array { mi: Array2<f64>, pv: Array2<f64> },
    DataArray(ConnDataArray),
}

impl ConnOutput {
    /// The raw (MI, p-value) matrices regardless of form.
    pub fn matrices(&self) -> (&Array2<f64>, &Array2<f64>) {
        match self {
            ConnOutput::Array { mi, pv } => (mi, pv),
            ConnOutput::DataArray(da) => (&da.mi, &da.pv),
        }
    }

    /// The labeled form, if requested.
    pub fn as_dataarray(&self) -> Option<&ConnDataArray> {
        match self {
            ConnOutput::DataArray(da) => Some(da),
            ConnOutput::Array { .. } => None,
        }
    }
}

/// Package per-pair matrices into the requested output form.
///
/// `pairs` gives the deterministic row order: row `p` is `pairs[p]`.
pub(crate) fn assemble(
    pairs: &[(String, String)],
    times: &[f64],
    mi: Array2<f64>,
    pv: Array2<f64>,
    output_type: OutputType,
) -> ConnOutput {
    debug_assert_eq!(mi.nrows(), pairs.len());
    debug_assert_eq!(mi.ncols(), times.len());
    match output_type {
        OutputType::Array => ConnOutput::Array { mi, pv },
        OutputType::DataArray => ConnOutput::DataArray(ConnDataArray {
            mi,
            pv,
            source: pairs.iter().map(|(s, _)| s.clone()).collect(),
            target: pairs.iter().map(|(_, t)| t.clone()).collect(),
            times: times.to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn output_type_parsing() {
        assert_eq!("array".parse::<OutputType>().unwrap(), OutputType::Array);
        assert_eq!("dataarray".parse::<OutputType>().unwrap(), OutputType::DataArray);
        assert!(matches!(
            "netcdf".parse::<OutputType>(),
            Err(ConnError::Config(_))
        ));
    }

    #[test]
    fn sel_finds_pair_row() {
        let pairs = vec![
            ("a".to_string(), "b".to_string()),
            ("b".to_string(), "a".to_string()),
        ];
        let mi = array![[1.0, 2.0], [3.0, 4.0]];
        let pv = array![[0.1, 0.2], [0.3, 0.4]];
        let out = assemble(&pairs, &[0.0, 1.0], mi, pv, OutputType::DataArray);
        let da = out.as_dataarray().unwrap();

        let (mi_ab, pv_ab) = da.sel("a", "b").unwrap();
        assert_eq!(mi_ab.to_vec(), vec![1.0, 2.0]);
        assert_eq!(pv_ab.to_vec(), vec![0.1, 0.2]);
        let (mi_ba, _) = da.sel("b", "a").unwrap();
        assert_eq!(mi_ba.to_vec(), vec![3.0, 4.0]);
        assert!(da.sel("a", "c").is_none());
    }

    #[test]
    fn sel_source_collects_all_targets() {
        let pairs = vec![
            ("a".to_string(), "b".to_string()),
            ("a".to_string(), "c".to_string()),
            ("b".to_string(), "a".to_string()),
        ];
        let mi = Array2::zeros((3, 2));
        let pv = Array2::zeros((3, 2));
        let out = assemble(&pairs, &[0.0, 1.0], mi, pv, OutputType::DataArray);
        let da = out.as_dataarray().unwrap();
        let rows = da.sel_source("a");
        let targets: Vec<&str> = rows.iter().map(|(t, _, _)| *t).collect();
        assert_eq!(targets, vec!["b", "c"]);
    }

    #[test]
    fn array_form_keeps_raw_matrices() {
        let pairs = vec![("a".to_string(), "b".to_string())];
        let mi = array![[1.0]];
        let pv = array![[0.5]];
        let out = assemble(&pairs, &[0.0], mi.clone(), pv.clone(), OutputType::Array);
        assert!(out.as_dataarray().is_none());
        let (m, p) = out.matrices();
        assert_eq!(m, &mi);
        assert_eq!(p, &pv);
    }
}
