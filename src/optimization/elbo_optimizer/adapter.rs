//! Adapter that exposes a [`LogDensityObjective`] as an `argmin` problem.
//!
//! We convert a *maximization* of a log-density `ℓ(θ)` into a *minimization*
//! by defining the cost as `c(θ) = -ℓ(θ)`. Analytic gradients are negated
//! accordingly. Without an analytic gradient we finite-difference the
//! **cost**, so that branch needs no sign flip.
use argmin::core::{Error, Gradient};
use argmin_math::ArgminL2Norm;

use crate::optimization::{
    elbo_optimizer::{
        finite_diff::fd_gradient,
        traits::LogDensityObjective,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
    errors::{OptError, OptResult},
};

/// Bridges a [`LogDensityObjective`] to `argmin`'s `Gradient`.
///
/// - [`ArgMinAdapter::checked_cost`] returns `-ℓ(θ)`.
/// - `Gradient::gradient` returns `-∇ℓ(θ)` when the objective provides an
///   analytic gradient, or a finite-difference gradient of the cost. Crate
///   errors pass through argmin unchanged and convert back via `OptError::from`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LogDensityObjective> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LogDensityObjective> ArgMinAdapter<'a, F> {
    /// Construct a new adapter over an objective and its data.
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }

    /// Cost `c(θ)` with the crate error type.
    pub fn checked_cost(&self, theta: &Theta) -> OptResult<Cost> {
        let value = self.f.value(theta, self.data)?;
        if !value.is_finite() {
            return Err(OptError::NonFiniteCost { value });
        }
        Ok(-value)
    }

    /// Cost gradient `∇c(θ)` with the crate error type.
    ///
    /// Runs [`LogDensityObjective::check`] first; a missing analytic gradient
    /// falls back to [`fd_gradient`].
    pub fn checked_gradient(&self, theta: &Theta) -> OptResult<Grad> {
        self.f.check(theta, self.data)?;
        match self.f.grad(theta, self.data) {
            Ok(g) => {
                validate_grad(&g, theta.len())?;
                Ok(-g)
            }
            Err(OptError::GradientNotImplemented) => fd_gradient(theta, |t| self.checked_cost(t)),
            Err(e) => Err(e),
        }
    }
}

impl<'a, F: LogDensityObjective> Gradient for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    fn gradient(&self, theta: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(self.checked_gradient(theta)?)
    }
}

/// Euclidean norm of a gradient, reported in training diagnostics.
pub fn grad_norm(grad: &Grad) -> f64 {
    grad.l2_norm()
}
