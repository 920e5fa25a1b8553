//! optimization — ELBO optimizer stack, numerical helpers, and error surface.
//!
//! Purpose
//! -------
//! Provide the optimization layer used to fit the latent evolution model:
//! an Argmin-backed log-density adapter with finite-difference fallbacks,
//! an Adam update rule with linear learning-rate annealing, numerically
//! stable transforms, and a single error/result surface.
//!
//! Key behaviors
//! -------------
//! - Expose a log-density trait and adapter (`elbo_optimizer`) so any
//!   objective over a flat parameter vector can be turned into a cost with
//!   validated gradients.
//! - Supply shared numerical primitives (`numerical_stability`) used by the
//!   network, the densities and the observation models.
//! - Normalize configuration issues, numerical failures, and backend errors
//!   into a single enum (`errors::OptError`) with a common result alias
//!   (`OptResult<T>`).
//!
//! Conventions
//! -----------
//! - Objectives are log-densities `ℓ(θ)`; optimizers minimize `c(θ) = -ℓ(θ)`.
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw Argmin errors.
//! - This module and its submodules avoid I/O and logging; the training loop
//!   reports progress.
//!
//! Downstream usage
//! ----------------
//! - The ELBO objective implements `LogDensityObjective`; the training loop
//!   drives `Adam` with rates from `LinearAnneal`.
//! - Front-ends import the curated surface via `optimization::prelude::*`.

pub mod elbo_optimizer;
pub mod errors;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_latent_dynamics::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::elbo_optimizer::prelude::*;
    pub use super::errors::{OptError, OptResult};
    pub use super::numerical_stability::prelude::*;
}
