//! Conversion helpers for the Python bindings.
//!
//! Accept numpy arrays or nested sequences of floats and produce owned
//! `ndarray` tensors, so the bound methods can hand them straight to the
//! core model.
#[cfg(feature = "python-bindings")]
use ndarray::Array3;

#[cfg(feature = "python-bindings")]
use numpy::PyReadonlyArray3;

#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyTypeError, prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::latent::core::data::ObservationBatch;

/// Owned `[trials, bins, dim]` tensor from a 3-D float64 array or a nested
/// sequence.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_array3<'py>(raw: &Bound<'py, PyAny>, what: &str) -> PyResult<Array3<f64>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray3<f64>>() {
        return Ok(arr.as_array().to_owned());
    }
    let nested: Vec<Vec<Vec<f64>>> = raw.extract().map_err(|_| {
        PyTypeError::new_err(format!("{what} must be a 3-D float64 array or nested sequence"))
    })?;
    let n = nested.len();
    let t = nested.first().map_or(0, Vec::len);
    let d = nested.first().and_then(|trial| trial.first()).map_or(0, Vec::len);
    let rectangular =
        nested.iter().all(|trial| trial.len() == t && trial.iter().all(|bin| bin.len() == d));
    if !rectangular {
        return Err(PyTypeError::new_err(format!("{what} must be a rectangular [N, T, D] array")));
    }
    let flat: Vec<f64> = nested.into_iter().flatten().flatten().collect();
    Array3::from_shape_vec((n, t, d), flat)
        .map_err(|_| PyTypeError::new_err(format!("{what} must be a rectangular [N, T, D] array")))
}

/// Validated observation batch from Python data and optional entity ids.
#[cfg(feature = "python-bindings")]
pub fn extract_batch<'py>(
    raw: &Bound<'py, PyAny>, ids: Option<Vec<usize>>, num_entities: usize,
) -> PyResult<ObservationBatch> {
    let data = extract_f64_array3(raw, "observations")?;
    Ok(ObservationBatch::new(data, ids, num_entities)?)
}
