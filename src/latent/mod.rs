//! latent — locally-linear latent evolution model.
//!
//! Purpose
//! -------
//! Model latent trajectories `x_t ∈ R^d` whose one-step dynamics are linear
//! in a state-dependent matrix, `x_{t+1} ≈ x_t · A(x_t)`, where `A` is
//! produced by a small network conditioned on per-entity parameters and
//! blended toward a contraction far from the origin.
//!
//! Key behaviors
//! -------------
//! - Evaluate transition tensors for batches, shared paths and a stored
//!   trajectory ([`models::EvolutionNetwork`]).
//! - Score trajectories under the induced Gaussian chain, with exact
//!   gradients ([`models::ChainLogDensity`]).
//! - Simulate synthetic trajectories ([`models::TrajectorySampler`]).
//!
//! Conventions
//! -----------
//! - Row-vector states; tensors are `ndarray` arrays over `f64`.
//! - Errors are [`errors::LatentError`] / [`errors::ParamError`].
//!
//! Downstream usage
//! ----------------
//! - Build a [`models::LatentEvolution`] from a [`core::shape::LatentShape`]
//!   and [`core::options::EvolutionOptions`]; fit it with
//!   `training::TrainingLoop`.

pub mod core;
pub mod errors;
pub mod models;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_latent_dynamics::latent::prelude::*;
//
// to import the main model surface in a single line.

pub mod prelude {
    pub use super::core::{
        data::ObservationBatch,
        flow::FlowModulator,
        options::{EvolutionOptions, SamplerOptions},
        params::EvolutionParams,
        shape::LatentShape,
    };
    pub use super::errors::{LatentError, LatentResult, ParamError, ParamResult};
    pub use super::models::{
        ChainDensity, ChainLogDensity, EvolutionNetwork, LatentEvolution, SampledTrajectories,
        TrajectorySampler,
    };
}
