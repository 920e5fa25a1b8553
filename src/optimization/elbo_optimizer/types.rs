//! elbo_optimizer::types — shared numeric aliases for the optimizer layer.
//!
//! Purpose
//! -------
//! Keep the vector and scalar shapes used by the objective adapter, the
//! finite-difference helpers and the Adam state in one place so the rest of
//! the optimization code stays agnostic to `ndarray` generics.
//!
//! Conventions
//! -----------
//! - `Theta` and `Grad` have length equal to the number of free evolution
//!   parameters (see `latent::core::params::EvolutionParams::n_params`).
//! - `Cost` is always a scalar `f64`; higher layers handle any sign flips
//!   between cost and log-density.
use ndarray::Array1;

/// Parameter vector `θ` for ELBO optimization.
pub type Theta = Array1<f64>;

/// Gradient vector `∇ℓ(θ)` or `∇c(θ)`, matching the shape of `Theta`.
pub type Grad = Array1<f64>;

/// Scalar objective value used by the optimizer.
///
/// The cost `c(θ) = -ℓ(θ)` derived from a log-density `ℓ(θ)`.
pub type Cost = f64;

/// Default Adam first-moment decay.
pub const DEFAULT_BETA1: f64 = 0.9;

/// Default Adam second-moment decay.
pub const DEFAULT_BETA2: f64 = 0.999;

/// Default Adam denominator guard.
pub const DEFAULT_ADAM_EPS: f64 = 1e-8;
