//! Options for constructing and sampling the evolution model.
//!
//! Purpose
//! -------
//! Collect the user-facing knobs of the evolution network
//! ([`EvolutionOptions`]) and of the trajectory sampler
//! ([`SamplerOptions`]) behind validating constructors, so the model layer
//! can assume sane, finite values.
//!
//! Conventions
//! -----------
//! - Every option struct has a validating `new` and a `Default` with the
//!   documented defaults; `validate` re-runs the checks after
//!   deserialization.
//! - Seeds are optional; `None` draws from OS entropy.
use serde::{Deserialize, Serialize};

use crate::latent::{
    core::{
        flow::FlowModulator,
        validation::{verify_non_negative, verify_positive},
    },
    errors::{LatentError, LatentResult},
};

/// Hidden width of the evolution network.
pub const DEFAULT_HIDDEN_WIDTH: usize = 64;

/// Initial mixing coefficient `alpha`.
pub const DEFAULT_ALPHA_INIT: f64 = 0.2;

/// Half-width of the uniform initializer of the network's output layer.
pub const DEFAULT_INIT_RANGE_B: f64 = 1.0;

/// Options for building the evolution network and its parameters.
///
/// Fields
/// ------
/// - `init_range_b`: output weights are drawn uniformly in
///   `[-init_range_b, init_range_b]`.
/// - `hidden_width`: width of the softmax hidden layer.
/// - `alpha_init`: initial value of the mixing coefficient.
/// - `flow`: center and sharpness of the flow modulator.
/// - `seed`: optional RNG seed for weight initialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionOptions {
    pub init_range_b: f64,
    pub hidden_width: usize,
    pub alpha_init: f64,
    pub flow: FlowModulator,
    pub seed: Option<u64>,
}

impl EvolutionOptions {
    /// # Errors
    /// - `LatentError::InvalidOption` for a non-finite or negative
    ///   `init_range_b`, a zero `hidden_width`, a non-finite `alpha_init`, or
    ///   a non-positive flow sharpness / non-finite flow center.
    pub fn new(
        init_range_b: f64, hidden_width: usize, alpha_init: f64, flow: FlowModulator,
        seed: Option<u64>,
    ) -> LatentResult<Self> {
        verify_non_negative("init_range_b", init_range_b)?;
        if hidden_width == 0 {
            return Err(LatentError::InvalidOption {
                name: "hidden_width",
                value: 0.0,
                reason: "Hidden width must be at least 1.",
            });
        }
        if !alpha_init.is_finite() {
            return Err(LatentError::InvalidOption {
                name: "alpha_init",
                value: alpha_init,
                reason: "Mixing coefficient must be finite.",
            });
        }
        verify_positive("flow.sharpness", flow.sharpness)?;
        if !flow.center.is_finite() {
            return Err(LatentError::InvalidOption {
                name: "flow.center",
                value: flow.center,
                reason: "Flow center must be finite.",
            });
        }
        Ok(Self { init_range_b, hidden_width, alpha_init, flow, seed })
    }

    pub fn validate(&self) -> LatentResult<()> {
        Self::new(self.init_range_b, self.hidden_width, self.alpha_init, self.flow, self.seed)
            .map(|_| ())
    }
}

impl Default for EvolutionOptions {
    fn default() -> Self {
        Self {
            init_range_b: DEFAULT_INIT_RANGE_B,
            hidden_width: DEFAULT_HIDDEN_WIDTH,
            alpha_init: DEFAULT_ALPHA_INIT,
            flow: FlowModulator::default(),
            seed: None,
        }
    }
}

/// Options for forward-simulating trajectories.
///
/// Fields
/// ------
/// - `n_samples`: number of trials (default 50).
/// - `n_bins`: time bins per trial (default 30, at least 2).
/// - `x0_scale`: scale applied to the initial-state draw (default 25).
/// - `path_mse_threshold`: a trajectory whose mean step length is below this
///   value is rejected and redrawn (default 0.7; 0 accepts everything).
/// - `with_inflow`: simulate with the flow-stabilized transition (default true).
/// - `max_attempts`: rejection cap per trial (default 10 000).
/// - `seed`: optional RNG seed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerOptions {
    pub n_samples: usize,
    pub n_bins: usize,
    pub x0_scale: f64,
    pub path_mse_threshold: f64,
    pub with_inflow: bool,
    pub max_attempts: usize,
    pub seed: Option<u64>,
}

impl SamplerOptions {
    /// # Errors
    /// - `LatentError::InvalidOption` if `n_samples == 0`, `n_bins < 2`,
    ///   `max_attempts == 0`, or a scale/threshold is negative or non-finite.
    pub fn new(
        n_samples: usize, n_bins: usize, x0_scale: f64, path_mse_threshold: f64,
        with_inflow: bool, max_attempts: usize, seed: Option<u64>,
    ) -> LatentResult<Self> {
        if n_samples == 0 {
            return Err(LatentError::InvalidOption {
                name: "n_samples",
                value: 0.0,
                reason: "At least one trial must be sampled.",
            });
        }
        if n_bins < 2 {
            return Err(LatentError::InvalidOption {
                name: "n_bins",
                value: n_bins as f64,
                reason: "Trajectories need at least two time bins.",
            });
        }
        if max_attempts == 0 {
            return Err(LatentError::InvalidOption {
                name: "max_attempts",
                value: 0.0,
                reason: "At least one attempt per trial is required.",
            });
        }
        verify_non_negative("x0_scale", x0_scale)?;
        verify_non_negative("path_mse_threshold", path_mse_threshold)?;
        Ok(Self { n_samples, n_bins, x0_scale, path_mse_threshold, with_inflow, max_attempts, seed })
    }

    pub fn validate(&self) -> LatentResult<()> {
        Self::new(
            self.n_samples,
            self.n_bins,
            self.x0_scale,
            self.path_mse_threshold,
            self.with_inflow,
            self.max_attempts,
            self.seed,
        )
        .map(|_| ())
    }
}

impl Default for SamplerOptions {
    fn default() -> Self {
        Self {
            n_samples: 50,
            n_bins: 30,
            x0_scale: 25.0,
            path_mse_threshold: 0.7,
            with_inflow: true,
            max_attempts: 10_000,
            seed: None,
        }
    }
}
