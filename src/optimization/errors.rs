use argmin::core::Error;

use crate::latent::errors::{LatentError, ParamError};

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Gradient ----
    /// Implies that FD should be used
    GradientNotImplemented,

    /// Gradient dimensions do not match parameter dimensions.
    GradientDimMismatch {
        expected: usize,
        found: usize,
    },

    /// Gradient elements need to be finite
    InvalidGradient {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    // ---- AdamOptions ----
    /// Learning rate must be finite and > 0.
    InvalidLearningRate {
        rate: f64,
        reason: &'static str,
    },
    /// Moment decay rates must lie in [0, 1).
    InvalidBeta {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    /// Denominator guard must be finite and > 0.
    InvalidEpsilon {
        value: f64,
        reason: &'static str,
    },

    // ---- Annealing schedule ----
    /// The schedule needs at least one epoch.
    InvalidEpochCount {
        epochs: usize,
        reason: &'static str,
    },

    // ---- Cost function ----
    /// Cost function returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    // ---- Parameter vector ----
    /// Theta length does not match the optimizer state.
    ThetaLengthMismatch {
        expected: usize,
        actual: usize,
    },

    /// Optimizer input must have finite values.
    InvalidThetaInput {
        index: usize,
        value: f64,
    },

    // ---- Argmin ---
    /// Failure raised inside argmin that did not originate in this crate.
    BackendError {
        text: String,
    },

    // ---- Model ----
    /// Latent-model failure raised while evaluating the objective.
    ModelError {
        text: String,
    },
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Gradient ----
            OptError::GradientNotImplemented => {
                write!(f, "Analytic gradient not implemented")
            }
            OptError::GradientDimMismatch { expected, found } => {
                write!(f, "Gradient dimension mismatch: expected {expected}, found {found}")
            }
            OptError::InvalidGradient { index, value, reason } => {
                write!(f, "Invalid gradient at index {index}: {value}: {reason}")
            }

            // ---- AdamOptions ----
            OptError::InvalidLearningRate { rate, reason } => {
                write!(f, "Invalid learning rate {rate}: {reason}")
            }
            OptError::InvalidBeta { name, value, reason } => {
                write!(f, "Invalid {name} = {value}: {reason}")
            }
            OptError::InvalidEpsilon { value, reason } => {
                write!(f, "Invalid epsilon {value}: {reason}")
            }

            // ---- Annealing schedule ----
            OptError::InvalidEpochCount { epochs, reason } => {
                write!(f, "Invalid epoch count {epochs}: {reason}")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }

            // ---- Parameter vector ----
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, actual {actual}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }

            // ---- Argmin ----
            OptError::BackendError { text } => {
                write!(f, "Backend error: {text}")
            }

            // ---- Model ----
            OptError::ModelError { text } => {
                write!(f, "Model error: {text}")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Errors raised by our own objectives travel through argmin as `OptError`.
        match original_err.downcast::<OptError>() {
            Ok(opt_err) => opt_err,
            Err(err) => OptError::BackendError { text: err.to_string() },
        }
    }
}

impl From<LatentError> for OptError {
    fn from(err: LatentError) -> Self {
        match err {
            LatentError::Optimization(inner) => inner,
            other => OptError::ModelError { text: other.to_string() },
        }
    }
}

impl From<ParamError> for OptError {
    fn from(err: ParamError) -> Self {
        match err {
            ParamError::ThetaLengthMismatch { expected, actual } => {
                OptError::ThetaLengthMismatch { expected, actual }
            }
            ParamError::InvalidThetaInput { index, value } => {
                OptError::InvalidThetaInput { index, value }
            }
            other => OptError::ModelError { text: other.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Conversions from argmin errors (ours and foreign) into `OptError`.
    // - Conversions from latent-model errors into `OptError`.
    //
    // They intentionally DO NOT cover:
    // - Display formatting of every variant.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify that an `OptError` travelling through `argmin::core::Error` is
    // recovered unchanged.
    //
    // Given
    // -----
    // - `OptError::NonFiniteCost` converted into an argmin error.
    //
    // Expect
    // ------
    // - Converting back yields the identical variant.
    fn opt_error_round_trips_through_argmin_error() {
        // Arrange
        let original = OptError::NonFiniteCost { value: f64::INFINITY };
        let wrapped: Error = original.clone().into();

        // Act
        let recovered = OptError::from(wrapped);

        // Assert
        assert_eq!(recovered, original);
    }

    #[test]
    // Purpose
    // -------
    // Ensure failures raised by argmin itself surface as `BackendError`.
    //
    // Given
    // -----
    // - `ArgminError::NotImplemented` wrapped as an argmin error.
    //
    // Expect
    // ------
    // - `OptError::BackendError` carrying the argmin message.
    fn foreign_argmin_error_maps_to_backend_error() {
        // Arrange
        let wrapped: Error =
            argmin::core::ArgminError::NotImplemented { text: "fd".to_string() }.into();

        // Act
        let converted = OptError::from(wrapped);

        // Assert
        match converted {
            OptError::BackendError { text } => assert!(text.contains("fd")),
            other => panic!("Expected BackendError, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Check that model errors become `ModelError` while wrapped optimizer
    // errors are unwrapped.
    //
    // Given
    // -----
    // - `LatentError::EmptyBatch` and `LatentError::Optimization(..)`.
    //
    // Expect
    // ------
    // - `ModelError { .. }` for the first, the inner variant for the second.
    fn latent_errors_convert_into_opt_error() {
        // Arrange
        let model = LatentError::EmptyBatch;
        let wrapped = LatentError::Optimization(OptError::GradientNotImplemented);

        // Act
        let a = OptError::from(model);
        let b = OptError::from(wrapped);

        // Assert
        assert!(matches!(a, OptError::ModelError { .. }));
        assert_eq!(b, OptError::GradientNotImplemented);
    }
}
