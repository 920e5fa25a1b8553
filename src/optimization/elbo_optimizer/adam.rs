//! elbo_optimizer::adam — Adam update rule over a flat parameter vector.
//!
//! Purpose
//! -------
//! Hold the first/second moment estimates for one parameter vector and apply
//! bias-corrected Adam steps with an externally supplied learning rate, so
//! the training loop can anneal the rate between epochs.
//!
//! Invariants & assumptions
//! ------------------------
//! - Moments have the same length as `θ`; the first call to [`Adam::step`]
//!   fixes that length and later calls must match it.
//! - Gradients are **cost** gradients (`∇c = -∇ℓ`); the step moves against
//!   them.
use crate::optimization::{
    elbo_optimizer::{
        Grad, Theta,
        traits::AdamOptions,
        validation::{validate_grad, verify_learning_rate},
    },
    errors::{OptError, OptResult},
};

/// Adam optimizer state.
#[derive(Debug, Clone, PartialEq)]
pub struct Adam {
    pub opts: AdamOptions,
    m: Theta,
    v: Theta,
    t: u64,
}

impl Adam {
    /// Fresh optimizer state for a parameter vector of length `dim`.
    pub fn new(opts: AdamOptions, dim: usize) -> Self {
        Self { opts, m: Theta::zeros(dim), v: Theta::zeros(dim), t: 0 }
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Apply one Adam update in place.
    ///
    /// Parameters
    /// ----------
    /// - `theta`: parameters, updated in place.
    /// - `grad`: cost gradient at `theta`.
    /// - `learning_rate`: step size for this update.
    ///
    /// Errors
    /// ------
    /// - `OptError::InvalidLearningRate` for a non-positive rate.
    /// - `OptError::ThetaLengthMismatch` if `theta` does not match the state.
    /// - `OptError::GradientDimMismatch` / `InvalidGradient` for a malformed
    ///   gradient. The state is left untouched on error.
    pub fn step(&mut self, theta: &mut Theta, grad: &Grad, learning_rate: f64) -> OptResult<()> {
        verify_learning_rate(learning_rate)?;
        if theta.len() != self.m.len() {
            return Err(OptError::ThetaLengthMismatch {
                expected: self.m.len(),
                actual: theta.len(),
            });
        }
        validate_grad(grad, theta.len())?;

        let AdamOptions { beta1, beta2, epsilon } = self.opts;
        self.t += 1;
        let bias1 = 1.0 - beta1.powi(self.t as i32);
        let bias2 = 1.0 - beta2.powi(self.t as i32);

        for ((p, &g), (m, v)) in
            theta.iter_mut().zip(grad.iter()).zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            *m = beta1 * *m + (1.0 - beta1) * g;
            *v = beta2 * *v + (1.0 - beta2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
        }
        Ok(())
    }

    /// Forget accumulated moments and the step counter.
    pub fn reset(&mut self) {
        self.m.fill(0.0);
        self.v.fill(0.0);
        self.t = 0;
    }
}
