//! elbo_optimizer — gradient-based fitting of log-density objectives.
//!
//! Purpose
//! -------
//! Provide the first-order optimization layer used by the variational
//! training loop: a log-density trait, an Argmin adapter that turns it into
//! a cost with finite-difference fallbacks, an Adam update rule and a
//! linear learning-rate annealing schedule.
//!
//! Key behaviors
//! -------------
//! - Convert log-densities `ℓ(θ)` into costs `c(θ) = -ℓ(θ)` via
//!   [`adapter::ArgMinAdapter`], which implements Argmin's `Gradient`.
//! - Fall back to [`finite_diff`] gradients when an objective has no
//!   analytic gradient.
//! - Apply bias-corrected Adam steps ([`Adam`]) with a per-step learning
//!   rate from [`LinearAnneal`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The optimizer **always maximizes** a log-density by minimizing its
//!   negation; objectives return `ℓ(θ)` and `∇ℓ(θ)`, never the cost.
//! - Parameters, gradients and options are validated before any state is
//!   mutated; failures surface as [`OptError`](crate::optimization::errors::OptError).
//!
//! Conventions
//! -----------
//! - Parameters live in a flat [`Theta`] (`Array1<f64>`); mapping to and from
//!   structured model parameters happens in the model layer.
//! - This module never logs; the training loop reports progress.
//!
//! Testing notes
//! -------------
//! - Unit tests cover sign conventions in [`adapter`], finite-difference
//!   fallbacks in [`finite_diff`], Adam convergence on a quadratic, schedule
//!   endpoints and option validation.

pub mod adam;
pub mod adapter;
pub mod finite_diff;
pub mod schedule;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::adam::Adam;
pub use self::adapter::{ArgMinAdapter, grad_norm};
pub use self::schedule::LinearAnneal;
pub use self::traits::{AdamOptions, LogDensityObjective};
pub use self::types::{Cost, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_latent_dynamics::optimization::elbo_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::adam::Adam;
    pub use super::adapter::ArgMinAdapter;
    pub use super::schedule::LinearAnneal;
    pub use super::traits::{AdamOptions, LogDensityObjective};
    pub use super::types::{Cost, Grad, Theta};
}
