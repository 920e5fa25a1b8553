//! models — evolution network, chain log density, sampler and model facade.
//!
//! Purpose
//! -------
//! Compose the building blocks in `latent::core` into the locally-linear
//! evolution model:
//!
//! - [`evolution`]: state-dependent transitions `A(x)`, `A_inflow(x)` and
//!   their backward pass.
//! - [`chain`]: Gaussian Markov-chain log density of trajectories and its
//!   exact gradient.
//! - [`sampler`]: generative simulation with rejection of stalled paths.
//! - [`latent_evolution`]: [`LatentEvolution`], which owns the parameters and
//!   an optional stored trajectory and forwards to the three above.
//!
//! Invariants & assumptions
//! ------------------------
//! - The network, density and sampler are stateless over
//!   `&EvolutionParams`; only the facade owns mutable state.
//! - Every entry point validates shapes and identities before evaluating.
//!
//! Testing notes
//! -------------
//! - Backward passes are checked against central differences in
//!   [`evolution`] and [`chain`].
//! - Sampler tests use seeded `ChaCha8Rng` streams.

pub mod chain;
pub mod evolution;
pub mod latent_evolution;
pub mod sampler;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::chain::{ChainDensity, ChainGradient, ChainLogDensity};
pub use self::evolution::{EvolutionNetwork, EvolutionOutput, FlowField, lattice_2d};
pub use self::latent_evolution::LatentEvolution;
pub use self::sampler::{SampledTrajectories, TrajectorySampler};
