//! Collaborator interfaces consumed by the training loop.
//!
//! The loop never looks inside the posterior model; it only needs the
//! operations below. [`Recognition`] is object safe, so callers may pass a
//! `&mut dyn Recognition` as well as a concrete type.
use ndarray::Array3;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::latent::{core::data::ObservationBatch, errors::LatentResult, models::LatentEvolution};

/// Which posterior path/sample variant is in use.
///
/// `WithGradTerm` lets the evolution network shape the posterior path;
/// `NoGradTerm` keeps only the base linear component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PosteriorVariant {
    NoGradTerm,
    WithGradTerm,
}

/// A reparameterized posterior draw.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorSample {
    /// Posterior path the draw is centered on.
    pub path: Array3<f64>,
    /// `path + noise` scaled by the posterior widths.
    pub sample: Array3<f64>,
    /// Standard-normal noise used for the draw.
    pub noise: Array3<f64>,
}

pub trait Recognition {
    /// Posterior mean trajectories from observations alone (warm start).
    fn posterior_mean(&self, y: &ObservationBatch) -> LatentResult<Array3<f64>>;

    /// One fixed-point update `X ← posterior_path(Y, X_prev)`.
    fn posterior_path(
        &self, y: &ObservationBatch, prev: &Array3<f64>, evolution: &LatentEvolution,
        variant: PosteriorVariant,
    ) -> LatentResult<Array3<f64>>;

    /// Draw from the posterior centered on `posterior_path(Y, X_prev)`.
    fn posterior_sample(
        &self, y: &ObservationBatch, prev: &Array3<f64>, evolution: &LatentEvolution,
        variant: PosteriorVariant, rng: &mut dyn RngCore,
    ) -> LatentResult<PosteriorSample>;

    /// Entropy of the posterior that produced `sample`.
    fn entropy(&self, y: &ObservationBatch, sample: &PosteriorSample) -> f64;

    /// Adapt the recognition parameters given `∂LogDensity/∂X` at the sample.
    fn adapt(
        &mut self, _y: &ObservationBatch, _sample: &PosteriorSample, _grad_x: &Array3<f64>,
        _rate: f64,
    ) -> LatentResult<()> {
        Ok(())
    }
}
