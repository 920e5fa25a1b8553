//! Errors for the latent evolution model (input validation, preconditions,
//! numerical degeneracy, sampling, configuration and persistence).
//!
//! This module defines a model error type, [`LatentError`], and a parameter
//! error type, [`ParamError`], used across the Rust core and the optional
//! Python bindings. Both implement `Display`/`Error` and convert to `PyErr`
//! when the `python-bindings` feature is enabled.
//!
//! ## Conventions
//! - **Indices are 0-based** (trial, time bin, entity).
//! - Shape errors are raised at the point of detection and never retried.
//! - Optimizer failures keep their [`OptError`] payload via
//!   [`LatentError::Optimization`].
#[cfg(feature = "python-bindings")]
use pyo3::{exceptions::PyValueError, prelude::*};

use crate::{latent::core::shape::LatentShape, optimization::errors::OptError};

/// Result alias for latent-model operations.
pub type LatentResult<T> = Result<T, LatentError>;

/// Result alias for parameter construction and θ packing.
pub type ParamResult<T> = Result<T, ParamError>;

/// Unified error type for the latent evolution model and its training loop.
#[derive(Debug, Clone, PartialEq)]
pub enum LatentError {
    // ---- Input shape ----
    /// A batch with zero trials or zero time bins.
    EmptyBatch,

    /// Identity list length differs from the number of trials.
    IdsLengthMismatch { ids: usize, batch: usize },

    /// Broadcasting the stored trajectory requires exactly one trial.
    StoredBatchNotSingleton { batch: usize },

    /// No stored trajectory has been attached to the model.
    NoStoredTrajectory,

    /// Trailing state dimension differs from `x_dim`.
    StateDimMismatch { expected: usize, found: usize },

    /// Trailing observation dimension differs from `y_dim`.
    ObservationDimMismatch { expected: usize, found: usize },

    /// Two batches that must align disagree on a leading axis.
    BatchShapeMismatch { what: &'static str, expected: usize, found: usize },

    /// An entity identity outside `[0, num_entities)`.
    UnknownEntity { id: usize, num_entities: usize },

    /// A data value is NaN/±inf.
    NonFiniteData { what: &'static str, index: usize, value: f64 },

    // ---- Preconditions ----
    /// Next-state prediction runs on exactly one trial at a time.
    SingleTrialRequired { batch: usize },

    // ---- Numerics ----
    /// An inverse-Cholesky factor is singular, ill-conditioned or non-finite.
    DegenerateCovariance { which: &'static str, det: f64 },

    // ---- Sampling ----
    /// Trajectory rejection exceeded the configured number of attempts.
    SamplerExhausted { trial: usize, attempts: usize },

    // ---- Options ----
    /// A numeric option is outside its admissible range.
    InvalidOption { name: &'static str, value: f64, reason: &'static str },

    /// Unknown observation-model name.
    InvalidObservationKind { name: String },

    // ---- Persistence ----
    /// Checkpoint or artifact I/O failed.
    Checkpoint { text: String },

    /// Configuration (de)serialization failed.
    Config { text: String },

    // ---- Wrapped ----
    /// Parameter packing/unpacking failure.
    Param(ParamError),

    /// Optimizer failure.
    Optimization(OptError),
}

impl std::error::Error for LatentError {}

impl std::fmt::Display for LatentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Input shape ----
            LatentError::EmptyBatch => write!(f, "Batch must contain at least one trial and one time bin"),
            LatentError::IdsLengthMismatch { ids, batch } => {
                write!(f, "Identity list has {ids} entries but the batch has {batch} trials")
            }
            LatentError::StoredBatchNotSingleton { batch } => {
                write!(f, "Stored trajectory must have exactly one trial to broadcast, found {batch}")
            }
            LatentError::NoStoredTrajectory => write!(f, "No stored trajectory is attached to the model"),
            LatentError::StateDimMismatch { expected, found } => {
                write!(f, "State dimension mismatch: expected {expected}, found {found}")
            }
            LatentError::ObservationDimMismatch { expected, found } => {
                write!(f, "Observation dimension mismatch: expected {expected}, found {found}")
            }
            LatentError::BatchShapeMismatch { what, expected, found } => {
                write!(f, "Mismatched {what}: expected {expected}, found {found}")
            }
            LatentError::UnknownEntity { id, num_entities } => {
                write!(f, "Entity {id} is out of range for {num_entities} entities")
            }
            LatentError::NonFiniteData { what, index, value } => {
                write!(f, "Non-finite {what} at flat index {index}: {value}")
            }

            // ---- Preconditions ----
            LatentError::SingleTrialRequired { batch } => {
                write!(f, "Next-state prediction needs exactly one trial, found {batch}")
            }

            // ---- Numerics ----
            LatentError::DegenerateCovariance { which, det } => {
                write!(f, "Degenerate inverse-Cholesky factor for {which}: determinant {det}")
            }

            // ---- Sampling ----
            LatentError::SamplerExhausted { trial, attempts } => {
                write!(f, "Trial {trial} was rejected {attempts} times; giving up")
            }

            // ---- Options ----
            LatentError::InvalidOption { name, value, reason } => {
                write!(f, "Invalid option {name} = {value}: {reason}")
            }
            LatentError::InvalidObservationKind { name } => {
                write!(f, "Unknown observation model '{name}': expected 'Gaussian' or 'Poisson'")
            }

            // ---- Persistence ----
            LatentError::Checkpoint { text } => write!(f, "Checkpoint error: {text}"),
            LatentError::Config { text } => write!(f, "Configuration error: {text}"),

            // ---- Wrapped ----
            LatentError::Param(err) => write!(f, "{err}"),
            LatentError::Optimization(err) => write!(f, "Optimization failed: {err}"),
        }
    }
}

/// Errors raised while constructing evolution parameters or mapping them
/// to and from the optimizer vector.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// Theta length does not match the model shape.
    ThetaLengthMismatch { expected: usize, actual: usize },

    /// Theta entries must be finite.
    InvalidThetaInput { index: usize, value: f64 },

    /// A parameter block has the wrong shape.
    BlockShapeMismatch { name: &'static str, expected: (usize, usize), found: (usize, usize) },

    /// A model dimension is not admissible.
    InvalidModelShape { param: usize, reason: &'static str },

    /// Replacement parameters were built for a different model shape.
    ShapeChanged { expected: LatentShape, found: LatentShape },
}

impl std::error::Error for ParamError {}

impl std::fmt::Display for ParamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, actual {actual}")
            }
            ParamError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }
            ParamError::BlockShapeMismatch { name, expected, found } => {
                write!(f, "Parameter block {name}: expected shape {expected:?}, found {found:?}")
            }
            ParamError::InvalidModelShape { param, reason } => {
                write!(f, "Invalid model shape {param}: {reason}")
            }
            ParamError::ShapeChanged { expected, found } => {
                write!(f, "Parameter shape changed: expected {expected:?}, found {found:?}")
            }
        }
    }
}

impl From<ParamError> for LatentError {
    fn from(err: ParamError) -> LatentError {
        LatentError::Param(err)
    }
}

impl From<OptError> for LatentError {
    fn from(err: OptError) -> LatentError {
        LatentError::Optimization(err)
    }
}

impl From<std::io::Error> for LatentError {
    fn from(err: std::io::Error) -> LatentError {
        LatentError::Checkpoint { text: err.to_string() }
    }
}

impl From<serde_json::Error> for LatentError {
    fn from(err: serde_json::Error) -> LatentError {
        LatentError::Config { text: err.to_string() }
    }
}

/// Convert a [`LatentError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<LatentError> for PyErr {
    fn from(err: LatentError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Convert a [`ParamError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl std::convert::From<ParamError> for PyErr {
    fn from(err: ParamError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}
