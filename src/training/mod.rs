//! training — variational fitting of the latent evolution model.
//!
//! Purpose
//! -------
//! Fit [`crate::latent::models::LatentEvolution`] to observation trials by
//! alternating fixed-point refinement of posterior trajectories with Adam
//! steps on the negative ELBO.
//!
//! Key behaviors
//! -------------
//! - [`elbo`]: the ELBO cost and its θ-objective for the optimizer stack.
//! - [`trainer`]: the epoch state machine ([`TrainingLoop`]).
//! - [`collaborators`] / [`recognition`] / [`observation`]: the posterior and
//!   observation models the loop consumes.
//! - [`config`]: validated options and JSON configuration.
//! - [`checkpoint`] / [`batching`]: persistence and mini-batch plans.
//!
//! Conventions
//! -----------
//! - Costs are negated log densities; the loop minimizes.
//! - Everything random is driven by seeded `ChaCha8Rng` streams when a seed
//!   is configured.

pub mod batching;
pub mod checkpoint;
pub mod collaborators;
pub mod config;
pub mod elbo;
pub mod observation;
pub mod recognition;
pub mod trainer;

// ---- Re-exports (primary public surface) ----

pub use self::checkpoint::{
    Checkpoint, CheckpointSink, FlowFieldArtifact, JsonCheckpointSink, load_checkpoint,
};
pub use self::collaborators::{PosteriorSample, PosteriorVariant, Recognition};
pub use self::config::{LatentConfig, TrainOptions};
pub use self::elbo::{BatchElbo, ElboObjective, ElboValue};
pub use self::observation::{ObservationDensity, ObservationKind, ObservationModel};
pub use self::recognition::{MeanFieldRecognition, RecognitionOptions};
pub use self::trainer::{EpochSummary, TrainReport, TrainingLoop};

pub mod prelude {
    pub use super::collaborators::{PosteriorVariant, Recognition};
    pub use super::config::{LatentConfig, TrainOptions};
    pub use super::elbo::ElboObjective;
    pub use super::observation::{ObservationKind, ObservationModel};
    pub use super::recognition::{MeanFieldRecognition, RecognitionOptions};
    pub use super::trainer::{TrainReport, TrainingLoop};
}
