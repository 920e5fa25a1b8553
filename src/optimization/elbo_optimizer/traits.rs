//! Public API surface for ELBO optimization.
//!
//! - [`LogDensityObjective`]: trait implemented by anything whose parameters
//!   are fitted by gradient ascent on a log-density.
//! - [`AdamOptions`]: configuration for the Adam update rule.
//!
//! Convention: we *maximize* a log-density `ℓ(θ)` by minimizing the cost
//! `c(θ) = -ℓ(θ)`. If an analytic gradient is provided, it should be the
//! gradient of the log-density (`∇ℓ(θ)`); the adapter flips the sign.
use serde::{Deserialize, Serialize};

use crate::optimization::{
    elbo_optimizer::{
        Cost, Grad, Theta,
        types::{DEFAULT_ADAM_EPS, DEFAULT_BETA1, DEFAULT_BETA2},
        validation::{verify_beta, verify_epsilon},
    },
    errors::{OptError, OptResult},
};

/// User-implemented log-density interface.
///
/// You maximize `ℓ(θ)`; internally we minimize the cost `c(θ) = -ℓ(θ)`.
///
/// - `type Data`: payload carried into `value`/`grad`/`check` (for the ELBO,
///   the posterior sample and the entity ids of one mini-batch).
///
/// Required:
/// - `value(&Theta, &Data) -> OptResult<Cost>`: evaluate `ℓ(θ)`.
/// - `check(&Theta, &Data) -> OptResult<()>`: reject obviously invalid
///   `θ`/`data` pairs before an update is attempted.
///
/// Optional:
/// - `grad(&Theta, &Data) -> OptResult<Grad>`: analytic gradient `∇ℓ(θ)`.
///   If not implemented, finite differences are used automatically.
pub trait LogDensityObjective {
    type Data;

    // Required methods
    fn value(&self, theta: &Theta, data: &Self::Data) -> OptResult<Cost>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn grad(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }
}

/// Adam hyper-parameters.
///
/// Fields:
/// - `beta1` — first-moment decay, in `[0, 1)`.
/// - `beta2` — second-moment decay, in `[0, 1)`.
/// - `epsilon` — denominator guard, finite and `> 0`.
///
/// Default: `beta1 = 0.9`, `beta2 = 0.999`, `epsilon = 1e-8`.
///
/// The learning rate is not part of the options; it is supplied per step
/// by the annealing schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdamOptions {
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl AdamOptions {
    /// Create validated Adam options.
    ///
    /// # Errors
    /// - [`OptError::InvalidBeta`] if a decay rate lies outside `[0, 1)`.
    /// - [`OptError::InvalidEpsilon`] if `epsilon` is non-finite or ≤ 0.
    pub fn new(beta1: f64, beta2: f64, epsilon: f64) -> OptResult<Self> {
        verify_beta("beta1", beta1)?;
        verify_beta("beta2", beta2)?;
        verify_epsilon(epsilon)?;
        Ok(Self { beta1, beta2, epsilon })
    }

    /// Re-run the constructor checks on an existing value (e.g. after
    /// deserialization).
    pub fn validate(&self) -> OptResult<()> {
        Self::new(self.beta1, self.beta2, self.epsilon).map(|_| ())
    }
}

impl Default for AdamOptions {
    fn default() -> Self {
        Self { beta1: DEFAULT_BETA1, beta2: DEFAULT_BETA2, epsilon: DEFAULT_ADAM_EPS }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Default values and validation of `AdamOptions`.
    // - The default `grad` of `LogDensityObjective`.
    //
    // They intentionally DO NOT cover:
    // - The update rule itself (see `adam`).
    // -------------------------------------------------------------------------

    struct Constant;

    impl LogDensityObjective for Constant {
        type Data = ();

        fn value(&self, _theta: &Theta, _data: &()) -> OptResult<Cost> {
            Ok(1.0)
        }

        fn check(&self, _theta: &Theta, _data: &()) -> OptResult<()> {
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the documented defaults and that they pass validation.
    //
    // Given
    // -----
    // - `AdamOptions::default()`.
    //
    // Expect
    // ------
    // - `(0.9, 0.999, 1e-8)` and `validate()` succeeds.
    fn adam_options_default_matches_documented_values() {
        // Arrange
        let opts = AdamOptions::default();

        // Act
        let checked = opts.validate();

        // Assert
        assert_eq!(opts.beta1, 0.9);
        assert_eq!(opts.beta2, 0.999);
        assert_eq!(opts.epsilon, 1e-8);
        assert!(checked.is_ok());
    }

    #[test]
    // Purpose
    // -------
    // Ensure invalid decay rates are rejected by name.
    //
    // Given
    // -----
    // - `beta2 = 1.0`.
    //
    // Expect
    // ------
    // - `OptError::InvalidBeta { name: "beta2", .. }`.
    fn adam_options_reject_unit_beta() {
        // Arrange / Act
        let result = AdamOptions::new(0.9, 1.0, 1e-8);

        // Assert
        match result {
            Err(OptError::InvalidBeta { name, .. }) => assert_eq!(name, "beta2"),
            other => panic!("Expected InvalidBeta, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // Confirm objectives without an analytic gradient report
    // `GradientNotImplemented`.
    //
    // Given
    // -----
    // - An objective that only implements `value` and `check`.
    //
    // Expect
    // ------
    // - `grad` returns `Err(GradientNotImplemented)`.
    fn default_grad_is_not_implemented() {
        // Arrange
        let theta = Theta::zeros(2);

        // Act
        let result = Constant.grad(&theta, &());

        // Assert
        assert_eq!(result, Err(OptError::GradientNotImplemented));
    }
}
