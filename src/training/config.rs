//! Training options and the top-level JSON configuration.
//!
//! Purpose
//! -------
//! Gather every knob of a training run in validated, serializable structs:
//! [`TrainOptions`] for the loop itself and [`LatentConfig`] for a complete
//! run (model dimensions, observation family, evolution, recognition,
//! sampler and training options).
//!
//! Key behaviors
//! -------------
//! - `TrainOptions::validate` checks rates, counts and Adam options.
//! - `LatentConfig::from_json` / `from_path` deserialize (missing fields take
//!   their defaults) and validate in one step.
//! - `LatentConfig::build_*` construct the model and collaborators with RNGs
//!   seeded from `train.seed`.
//!
//! Conventions
//! -----------
//! - JSON field names equal the Rust field names.
//! - Option errors are `LatentError::InvalidOption`; JSON errors are
//!   `LatentError::Config`.
use std::{fs, path::{Path, PathBuf}};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{
    latent::{
        core::{
            options::{EvolutionOptions, SamplerOptions},
            shape::LatentShape,
        },
        errors::{LatentError, LatentResult},
        models::LatentEvolution,
    },
    optimization::elbo_optimizer::{AdamOptions, validation::verify_learning_rate},
    training::{
        observation::{ObservationKind, ObservationModel},
        recognition::{MeanFieldRecognition, RecognitionOptions},
    },
};

/// Validation (and flow-field) cadence in epochs.
pub const DEFAULT_VALIDATE_EVERY: usize = 10;

/// Options of the fixed-point training loop.
///
/// Fields
/// ------
/// - `learning_rate` / `end_learning_rate`: endpoints of the linear
///   annealing schedule (defaults 1e-3 and 1e-4).
/// - `num_fixed_point_iterations`: posterior-path passes per epoch on the
///   training set (default 2).
/// - `num_epochs_before_grad_term`: the gradient-term variant switches on
///   once `epoch > num_epochs_before_grad_term` (default 20).
/// - `use_grad_term`: use the gradient-term variant from the start.
/// - `batch_size` (default 1) and `shuffle` (default true).
/// - `validate_every`: validation cadence (default 10).
/// - `with_inflow`: use the flow-blended transition in the chain term
///   (default false).
/// - `seed`: seeds shuffling and posterior sampling.
/// - `adam`: Adam moment decays and epsilon.
/// - `checkpoint_dir` / `artifact_dir`: where checkpoints and flow-field
///   artifacts are written, if anywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub learning_rate: f64,
    pub end_learning_rate: f64,
    pub num_fixed_point_iterations: usize,
    pub num_epochs_before_grad_term: usize,
    pub use_grad_term: bool,
    pub batch_size: usize,
    pub shuffle: bool,
    pub validate_every: usize,
    pub with_inflow: bool,
    pub seed: Option<u64>,
    pub adam: AdamOptions,
    pub checkpoint_dir: Option<PathBuf>,
    pub artifact_dir: Option<PathBuf>,
}

impl TrainOptions {
    /// # Errors
    /// - `LatentError::Optimization` for a non-positive learning rate or
    ///   invalid Adam options.
    /// - `LatentError::InvalidOption` for a zero `batch_size` or
    ///   `validate_every`.
    pub fn validate(&self) -> LatentResult<()> {
        verify_learning_rate(self.learning_rate)?;
        verify_learning_rate(self.end_learning_rate)?;
        self.adam.validate()?;
        if self.batch_size == 0 {
            return Err(LatentError::InvalidOption {
                name: "batch_size",
                value: 0.0,
                reason: "Mini-batches need at least one trial.",
            });
        }
        if self.validate_every == 0 {
            return Err(LatentError::InvalidOption {
                name: "validate_every",
                value: 0.0,
                reason: "Validation cadence must be at least one epoch.",
            });
        }
        Ok(())
    }
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            learning_rate: 1e-3,
            end_learning_rate: 1e-4,
            num_fixed_point_iterations: 2,
            num_epochs_before_grad_term: 20,
            use_grad_term: false,
            batch_size: 1,
            shuffle: true,
            validate_every: DEFAULT_VALIDATE_EVERY,
            with_inflow: false,
            seed: None,
            adam: AdamOptions::default(),
            checkpoint_dir: None,
            artifact_dir: None,
        }
    }
}

/// Complete configuration of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatentConfig {
    pub x_dim: usize,
    pub p_dim: usize,
    pub num_entities: usize,
    pub y_dim: usize,
    pub observation: ObservationKind,
    pub evolution: EvolutionOptions,
    pub recognition: RecognitionOptions,
    pub sampler: SamplerOptions,
    pub train: TrainOptions,
}

impl Default for LatentConfig {
    fn default() -> Self {
        Self {
            x_dim: 2,
            p_dim: 1,
            num_entities: 1,
            y_dim: 2,
            observation: ObservationKind::default(),
            evolution: EvolutionOptions::default(),
            recognition: RecognitionOptions::default(),
            sampler: SamplerOptions::default(),
            train: TrainOptions::default(),
        }
    }
}

impl LatentConfig {
    pub fn from_json(text: &str) -> LatentResult<Self> {
        let config: LatentConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> LatentResult<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> LatentResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn shape(&self) -> LatentResult<LatentShape> {
        Ok(LatentShape::new(self.x_dim, self.p_dim, self.num_entities)?)
    }

    /// Validate every section.
    pub fn validate(&self) -> LatentResult<()> {
        self.shape()?;
        if self.y_dim == 0 {
            return Err(LatentError::InvalidOption {
                name: "y_dim",
                value: 0.0,
                reason: "Observations need at least one dimension.",
            });
        }
        self.evolution.validate()?;
        self.recognition.validate()?;
        self.sampler.validate()?;
        self.train.validate()
    }

    pub fn build_model(&self) -> LatentResult<LatentEvolution> {
        LatentEvolution::new(self.shape()?, self.evolution)
    }

    pub fn build_observation(&self) -> ObservationModel {
        let mut rng = self.rng(1);
        ObservationModel::new(self.observation, self.x_dim, self.y_dim, &mut rng)
    }

    pub fn build_recognition(&self) -> LatentResult<MeanFieldRecognition> {
        let mut rng = self.rng(2);
        MeanFieldRecognition::new(self.y_dim, self.x_dim, self.recognition, &mut rng)
    }

    fn rng(&self, stream: u64) -> ChaCha8Rng {
        match self.train.seed {
            Some(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(stream);
                rng
            }
            None => ChaCha8Rng::from_entropy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Defaults passing validation and documented values.
    // - Partial JSON filling in defaults, and JSON round trips.
    // - Rejection of invalid options and malformed JSON.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify defaults validate and carry the documented values.
    //
    // Given
    // -----
    // - `LatentConfig::default()`.
    //
    // Expect
    // ------
    // - Validation passes; validate_every 10, inflow off, hidden width 64.
    fn defaults_are_valid() {
        let config = LatentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.train.validate_every, 10);
        assert!(!config.train.with_inflow);
        assert_eq!(config.evolution.hidden_width, 64);
    }

    #[test]
    // Purpose
    // -------
    // Ensure partial JSON fills defaults and a config round-trips.
    //
    // Given
    // -----
    // - JSON naming only dimensions, the observation family and two
    //   training fields.
    //
    // Expect
    // ------
    // - Named fields set, others default; `from_json(to_json())` is identity.
    fn partial_json_fills_defaults_and_round_trips() {
        // Arrange
        let text = r#"{
            "x_dim": 3, "y_dim": 5, "num_entities": 4, "observation": "Poisson",
            "train": { "batch_size": 8, "seed": 11 }
        }"#;

        // Act
        let config = LatentConfig::from_json(text).expect("valid config");
        let again = LatentConfig::from_json(&config.to_json().expect("serializable"))
            .expect("valid config");

        // Assert
        assert_eq!(config.x_dim, 3);
        assert_eq!(config.observation, ObservationKind::Poisson);
        assert_eq!(config.train.batch_size, 8);
        assert_eq!(config.train.seed, Some(11));
        assert_eq!(config.train.learning_rate, 1e-3);
        assert_eq!(config.p_dim, 1);
        assert_eq!(again, config);
    }

    #[test]
    // Purpose
    // -------
    // Check invalid values and malformed JSON are rejected.
    //
    // Given
    // -----
    // - batch_size 0; an unknown observation family; truncated JSON.
    //
    // Expect
    // ------
    // - `InvalidOption { name: "batch_size" }`, then `Config` errors.
    fn invalid_configs_are_rejected() {
        let zero_batch = LatentConfig::from_json(r#"{ "train": { "batch_size": 0 } }"#);
        let bad_kind = LatentConfig::from_json(r#"{ "observation": "Bernoulli" }"#);
        let truncated = LatentConfig::from_json(r#"{ "x_dim": "#);

        assert!(matches!(zero_batch, Err(LatentError::InvalidOption { name: "batch_size", .. })));
        assert!(matches!(bad_kind, Err(LatentError::Config { .. })));
        assert!(matches!(truncated, Err(LatentError::Config { .. })));
    }

    #[test]
    // Purpose
    // -------
    // Verify seeded builders are reproducible and dimensioned correctly.
    //
    // Given
    // -----
    // - A seeded config with x_dim 2, y_dim 3.
    //
    // Expect
    // ------
    // - Equal collaborators from two builds; y_dim 3 read-out.
    fn seeded_builders_are_reproducible() {
        let mut config = LatentConfig { y_dim: 3, ..LatentConfig::default() };
        config.train.seed = Some(4);

        let a = config.build_recognition().expect("valid options");
        let b = config.build_recognition().expect("valid options");
        let obs = config.build_observation();

        assert_eq!(a, b);
        assert_eq!(obs.y_dim(), 3);
    }
}
