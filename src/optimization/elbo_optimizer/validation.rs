//! Validation helpers for ELBO optimization.
//!
//! This module centralizes the consistency checks used by the optimizer
//! interface:
//!
//! - **Option checks**: [`verify_learning_rate`], [`verify_beta`],
//!   [`verify_epsilon`] ensure Adam hyper-parameters are usable.
//! - **Gradient validation**: [`validate_grad`] enforces correct dimension
//!   and finite entries.
//! - **Parameter vectors**: [`validate_theta`] rejects non-finite `θ`.
//! - **Objective values**: [`validate_value`] checks log-density outputs
//!   for finiteness.
use crate::optimization::{
    elbo_optimizer::{Grad, Theta},
    errors::{OptError, OptResult},
};

/// Validate a learning rate.
///
/// The value must be **finite** and **strictly positive**.
///
/// # Errors
/// Returns [`OptError::InvalidLearningRate`] if the value is non-finite or ≤ 0.0.
pub fn verify_learning_rate(rate: f64) -> OptResult<()> {
    if !rate.is_finite() {
        return Err(OptError::InvalidLearningRate { rate, reason: "Learning rate must be finite." });
    }
    if rate <= 0.0 {
        return Err(OptError::InvalidLearningRate {
            rate,
            reason: "Learning rate must be positive.",
        });
    }
    Ok(())
}

/// Validate an exponential moment decay rate.
///
/// # Errors
/// Returns [`OptError::InvalidBeta`] unless `0 <= value < 1`.
pub fn verify_beta(name: &'static str, value: f64) -> OptResult<()> {
    if !value.is_finite() || !(0.0..1.0).contains(&value) {
        return Err(OptError::InvalidBeta { name, value, reason: "Decay rate must lie in [0, 1)." });
    }
    Ok(())
}

/// Validate the Adam denominator guard.
///
/// # Errors
/// Returns [`OptError::InvalidEpsilon`] if the value is non-finite or ≤ 0.0.
pub fn verify_epsilon(value: f64) -> OptResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(OptError::InvalidEpsilon { value, reason: "Epsilon must be finite and > 0." });
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// Checks:
/// - `grad.len() == dim`
/// - every element is finite (`NaN` or `±∞` are rejected)
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if length does not match `dim`.
/// - [`OptError::InvalidGradient`] with the index/value/reason of the first
///   offending element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate that every entry of a parameter vector is finite.
///
/// # Errors
/// Returns [`OptError::InvalidThetaInput`] for the first non-finite entry.
pub fn validate_theta(theta: &Theta) -> OptResult<()> {
    match theta.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(OptError::InvalidThetaInput { index, value: theta[index] }),
        None => Ok(()),
    }
}

/// Validate that a scalar log-density value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}
