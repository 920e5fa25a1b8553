//! TrainingLoop: fixed-point iteration alternated with Adam steps on the ELBO.
//!
//! Purpose
//! -------
//! Fit the evolution parameters of a [`LatentEvolution`] to observation
//! trials. Each epoch refines the posterior trajectories by fixed-point
//! iteration and then takes one gradient step per mini-batch on the
//! variational cost.
//!
//! Key behaviors
//! -------------
//! - Epoch 0 starts from the recognition model's posterior means; later
//!   epochs run `num_fixed_point_iterations` passes of
//!   `X ← posterior_path(Y, X)` on the training set and one pass on the
//!   validation set.
//! - The learning rate anneals linearly from `learning_rate` toward
//!   `end_learning_rate` over the epochs of one `train` call.
//! - The gradient-term posterior variant is used when `use_grad_term` is set
//!   or once `epoch > num_epochs_before_grad_term`; the switch is logged once.
//! - Each mini-batch step draws a posterior sample, takes one Adam step on
//!   `θ` (the only place the evolution parameters change) and then lets the
//!   recognition and observation collaborators adapt.
//! - Epoch and validation costs are always evaluated with the gradient-term
//!   posterior, whichever variant drives the updates.
//! - Every `validate_every` epochs the validation cost is computed and a
//!   checkpoint is written on strict improvement. The best cost restarts at
//!   `+∞` on each `train` call. 2-D models also write flow-field artifacts.
//!
//! Invariants & assumptions
//! ------------------------
//! - A non-finite epoch cost is logged with `warn!` and training continues;
//!   a non-finite gradient aborts the step with `OptError::InvalidGradient`.
//! - Adam moments and the step counter persist across `train` calls.
//!
//! Downstream usage
//! ----------------
//! - Build with [`TrainingLoop::new`] (any [`Recognition`]) or
//!   [`TrainingLoop::from_config`], then call [`TrainingLoop::train`] and
//!   inspect the returned [`TrainReport`].
use std::path::PathBuf;

use argmin::core::Gradient;
use ndarray::{Array3, Axis};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    latent::{
        core::data::ObservationBatch,
        errors::{LatentError, LatentResult},
        models::LatentEvolution,
    },
    optimization::{
        elbo_optimizer::{Adam, ArgMinAdapter, LinearAnneal, grad_norm},
        errors::OptError,
    },
    training::{
        batching::minibatches,
        checkpoint::{
            Checkpoint, CheckpointSink, FlowFieldArtifact, JsonCheckpointSink, write_flow_fields,
        },
        collaborators::{PosteriorVariant, Recognition},
        config::{LatentConfig, TrainOptions},
        elbo::ElboObjective,
        observation::ObservationModel,
        recognition::MeanFieldRecognition,
    },
};

/// Half-width of the flow-field lattice.
pub const FLOW_FIELD_RANGE: f64 = 30.0;
/// Lattice points per axis of the flow field.
pub const FLOW_FIELD_POINTS: usize = 50;

/// What happened in one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch: usize,
    pub learning_rate: f64,
    /// Full training-set cost divided by the number of trials.
    pub train_cost: f64,
    /// Validation cost, on validation epochs with a validation set.
    pub valid_cost: Option<f64>,
    /// Mean cost-gradient norm over the epoch's mini-batches.
    pub grad_norm: f64,
    pub variant: PosteriorVariant,
    pub checkpoint: Option<PathBuf>,
    pub artifact: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrainReport {
    pub history: Vec<EpochSummary>,
    /// Lowest validation cost seen during the call, if any was finite.
    pub best_valid: Option<f64>,
}

pub struct TrainingLoop<R: Recognition> {
    pub model: LatentEvolution,
    pub observation: ObservationModel,
    pub recognition: R,
    pub options: TrainOptions,
    adam: Adam,
    rng: ChaCha8Rng,
    sink: Option<Box<dyn CheckpointSink>>,
    grad_term_on: bool,
}

impl TrainingLoop<MeanFieldRecognition> {
    /// Build the model, collaborators and loop described by `config`.
    pub fn from_config(config: &LatentConfig) -> LatentResult<Self> {
        config.validate()?;
        Self::new(
            config.build_model()?,
            config.build_observation(),
            config.build_recognition()?,
            config.train.clone(),
        )
    }
}

impl<R: Recognition> TrainingLoop<R> {
    /// Assemble a training loop.
    ///
    /// A JSON checkpoint sink is installed when `options.checkpoint_dir` is
    /// set; [`TrainingLoop::with_sink`] replaces it.
    ///
    /// # Errors
    /// - Option validation errors.
    /// - `LatentError::Checkpoint` if the checkpoint directory cannot be
    ///   created.
    pub fn new(
        model: LatentEvolution, observation: ObservationModel, recognition: R,
        options: TrainOptions,
    ) -> LatentResult<Self> {
        options.validate()?;
        let adam = Adam::new(options.adam, model.params.n_params());
        let rng = match options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let sink: Option<Box<dyn CheckpointSink>> = match &options.checkpoint_dir {
            Some(dir) => Some(Box::new(JsonCheckpointSink::new(dir.clone())?)),
            None => None,
        };
        let grad_term_on = options.use_grad_term;
        Ok(Self { model, observation, recognition, options, adam, rng, sink, grad_term_on })
    }

    pub fn with_sink(mut self, sink: Box<dyn CheckpointSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Adam steps taken so far.
    pub fn steps(&self) -> u64 {
        self.adam.steps()
    }

    /// Run `num_epochs` epochs on `train`, validating on `valid` if given.
    ///
    /// # Errors
    /// - `LatentError::ObservationDimMismatch` if a batch does not match the
    ///   observation model.
    /// - Any collaborator, density, optimizer or checkpoint error.
    pub fn train(
        &mut self, train: &ObservationBatch, valid: Option<&ObservationBatch>, num_epochs: usize,
    ) -> LatentResult<TrainReport> {
        self.check_batch(train)?;
        if let Some(v) = valid {
            self.check_batch(v)?;
        }
        let mut report = TrainReport { history: Vec::with_capacity(num_epochs), best_valid: None };
        if num_epochs == 0 {
            return Ok(report);
        }
        let schedule = LinearAnneal::new(
            self.options.learning_rate,
            self.options.end_learning_rate,
            num_epochs,
        )?;
        if self.adam.steps() == 0 {
            self.observation.seed_offset(&train.data)?;
        }

        let mut best = f64::INFINITY;
        let mut x_train = self.recognition.posterior_mean(train)?;
        let mut x_valid = valid.map(|v| self.recognition.posterior_mean(v)).transpose()?;

        for epoch in 0..num_epochs {
            let variant = self.variant_at(epoch);
            if epoch > 0 {
                for iteration in 0..self.options.num_fixed_point_iterations {
                    x_train =
                        self.recognition.posterior_path(train, &x_train, &self.model, variant)?;
                    debug!(epoch, iteration, "fixed-point pass");
                }
                if let (Some(v), Some(x)) = (valid, x_valid.as_mut()) {
                    let next = self.recognition.posterior_path(v, x, &self.model, variant)?;
                    *x = next;
                }
            }

            let learning_rate = schedule.rate_at(epoch);
            let grad_norm = self.gradient_epoch(train, &x_train, variant, learning_rate)?;
            let train_cost = self.cost(train, &x_train)? / train.n_trials() as f64;
            if !train_cost.is_finite() {
                warn!(epoch, train_cost, "non-finite training cost");
            }

            let mut valid_cost = None;
            let mut checkpoint = None;
            let mut artifact = None;
            if epoch % self.options.validate_every == 0 {
                artifact = self.write_artifact(epoch)?;
                if let (Some(v), Some(x)) = (valid, x_valid.as_ref()) {
                    let cost = self.cost(v, x)?;
                    valid_cost = Some(cost);
                    if cost < best {
                        best = cost;
                        checkpoint = self.save(epoch, cost)?;
                    }
                }
            }

            info!(epoch, learning_rate, train_cost, ?valid_cost, grad_norm, ?variant, "epoch");
            report.history.push(EpochSummary {
                epoch,
                learning_rate,
                train_cost,
                valid_cost,
                grad_norm,
                variant,
                checkpoint,
                artifact,
            });
        }
        report.best_valid = best.is_finite().then_some(best);
        Ok(report)
    }

    fn check_batch(&self, batch: &ObservationBatch) -> LatentResult<()> {
        let expected = self.observation.y_dim();
        if batch.y_dim() != expected {
            return Err(LatentError::ObservationDimMismatch { expected, found: batch.y_dim() });
        }
        Ok(())
    }

    fn variant_at(&mut self, epoch: usize) -> PosteriorVariant {
        if !self.grad_term_on && epoch > self.options.num_epochs_before_grad_term {
            self.grad_term_on = true;
            info!(epoch, "including the gradient term from now on");
        }
        match self.grad_term_on {
            true => PosteriorVariant::WithGradTerm,
            false => PosteriorVariant::NoGradTerm,
        }
    }

    fn gradient_epoch(
        &mut self, train: &ObservationBatch, x_train: &Array3<f64>, variant: PosteriorVariant,
        learning_rate: f64,
    ) -> LatentResult<f64> {
        let plan = minibatches(
            train.n_trials(),
            self.options.batch_size,
            self.options.shuffle,
            &mut self.rng,
        );
        let mut total = 0.0;
        for trials in &plan {
            let y = train.select(trials);
            let prev = x_train.select(Axis(0), trials);
            total += self.step(&y, &prev, variant, learning_rate)?;
        }
        Ok(total / plan.len().max(1) as f64)
    }

    /// One mini-batch update; returns the cost-gradient norm.
    fn step(
        &mut self, y: &ObservationBatch, prev: &Array3<f64>, variant: PosteriorVariant,
        learning_rate: f64,
    ) -> LatentResult<f64> {
        let with_inflow = self.options.with_inflow;
        let sample =
            self.recognition.posterior_sample(y, prev, &self.model, variant, &mut self.rng)?;
        let entropy = self.recognition.entropy(y, &sample);
        let mut theta = self.model.params.to_theta();

        let (cost_grad, chain_x) = {
            let objective = ElboObjective::new(&self.model, &self.observation, with_inflow);
            let value = objective.evaluate(y, &sample, entropy)?;
            let batch = objective.batch(y, &sample, &value);
            let cost_grad =
                ArgMinAdapter::new(&batch, &()).gradient(&theta).map_err(OptError::from)?;
            (cost_grad, batch.take_state_grad())
        };
        let chain_x = match chain_x {
            Some(g) => g,
            None => {
                let (_, grad) =
                    self.model.log_density_with_grad(sample.sample.view(), &y.ids, with_inflow)?;
                grad.states
            }
        };
        let grad_x = chain_x + self.observation.grad_x(&y.data, &sample.sample)?;

        self.adam.step(&mut theta, &cost_grad, learning_rate)?;
        self.model.params.set_theta(&theta)?;
        self.recognition.adapt(y, &sample, &grad_x, learning_rate)?;
        self.observation.adapt(&y.data, &sample.sample, learning_rate)?;
        Ok(grad_norm(&cost_grad))
    }

    /// ELBO cost of a posterior sample centered on `posterior_path(Y, prev)`.
    ///
    /// Always uses the gradient-term posterior, so reported and validation
    /// costs stay comparable across the variant switch.
    fn cost(&mut self, y: &ObservationBatch, prev: &Array3<f64>) -> LatentResult<f64> {
        let variant = PosteriorVariant::WithGradTerm;
        let sample =
            self.recognition.posterior_sample(y, prev, &self.model, variant, &mut self.rng)?;
        let entropy = self.recognition.entropy(y, &sample);
        let objective = ElboObjective::new(&self.model, &self.observation, self.options.with_inflow);
        Ok(objective.evaluate(y, &sample, entropy)?.cost)
    }

    fn save(&mut self, epoch: usize, valid_cost: f64) -> LatentResult<Option<PathBuf>> {
        let Some(sink) = self.sink.as_mut() else {
            info!(epoch, valid_cost, "validation cost improved");
            return Ok(None);
        };
        let checkpoint = Checkpoint {
            step: self.adam.steps(),
            epoch,
            valid_cost,
            params: self.model.params.clone(),
        };
        let path = sink.save(&checkpoint)?;
        info!(epoch, valid_cost, ?path, "validation cost improved, checkpoint saved");
        Ok(path)
    }

    fn write_artifact(&self, epoch: usize) -> LatentResult<Option<PathBuf>> {
        let shape = self.model.shape();
        let Some(dir) = self.options.artifact_dir.as_ref() else {
            return Ok(None);
        };
        if shape.x_dim != 2 {
            return Ok(None);
        }
        let fields = (0..shape.num_entities)
            .map(|entity| self.model.flow_field(entity, FLOW_FIELD_RANGE, FLOW_FIELD_POINTS))
            .collect::<LatentResult<Vec<_>>>()?;
        let path = write_flow_fields(dir, &FlowFieldArtifact { epoch, fields })?;
        debug!(epoch, ?path, "flow-field artifact written");
        Ok(Some(path))
    }
}
