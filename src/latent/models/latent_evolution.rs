//! LatentEvolution: the user-facing locally-linear evolution model.
//!
//! This type bundles the trainable [`EvolutionParams`], the construction
//! options and an optionally *stored* trajectory (typically the result of
//! [`LatentEvolution::sample_and_store`]). It forwards to
//! [`EvolutionNetwork`], [`ChainLogDensity`] and [`TrajectorySampler`], which
//! are stateless over `&EvolutionParams`.
//!
//! Key ideas:
//! - Parameters are created once in [`LatentEvolution::new`] and only ever
//!   replaced wholesale by the training loop (or a loaded checkpoint).
//! - Three evaluation modes share one code path: an explicit batch with ids,
//!   a single path broadcast across all entities, and the stored trajectory
//!   broadcast the same way (which requires a stored batch of one trial).
use ndarray::{Array2, Array3, Array4, ArrayView2, ArrayView3, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::latent::{
    core::{
        options::{EvolutionOptions, SamplerOptions},
        params::EvolutionParams,
        shape::LatentShape,
        validation::validate_trajectories,
    },
    errors::{LatentError, LatentResult, ParamError},
    models::{
        chain::{ChainDensity, ChainGradient, ChainLogDensity},
        evolution::{EvolutionNetwork, EvolutionOutput, FlowField},
        sampler::{SampledTrajectories, TrajectorySampler},
    },
};

/// Locally-linear latent evolution model.
///
/// # Notes
/// - `params` is public so the training loop can swap in updated values;
///   use [`LatentEvolution::set_params`] to get shape checking.
/// - The stored trajectory never changes behind the caller's back; only
///   [`LatentEvolution::store`] and [`LatentEvolution::sample_and_store`]
///   write it.
#[derive(Debug, Clone, PartialEq)]
pub struct LatentEvolution {
    pub params: EvolutionParams,
    pub options: EvolutionOptions,
    network: EvolutionNetwork,
    stored: Option<Array3<f64>>,
}

impl LatentEvolution {
    /// Build a model with freshly initialized parameters.
    ///
    /// # Arguments
    /// - `shape`: latent, entity-parameter and entity-table sizes.
    /// - `options`: initialization options; `options.seed` fixes the draw.
    ///
    /// # Errors
    /// `LatentError::InvalidOption` if `options` fail validation.
    pub fn new(shape: LatentShape, options: EvolutionOptions) -> LatentResult<Self> {
        options.validate()?;
        let mut rng = match options.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let params = EvolutionParams::init(shape, &options, &mut rng);
        Ok(Self::assemble(params, options))
    }

    /// Wrap existing parameters (e.g. from a checkpoint).
    ///
    /// # Errors
    /// - `LatentError::InvalidOption` for bad options.
    /// - `LatentError::Param` if a parameter block has the wrong shape.
    pub fn from_params(params: EvolutionParams, options: EvolutionOptions) -> LatentResult<Self> {
        options.validate()?;
        params.validate()?;
        Ok(Self::assemble(params, options))
    }

    fn assemble(params: EvolutionParams, options: EvolutionOptions) -> Self {
        Self { params, network: EvolutionNetwork::new(options.flow), options, stored: None }
    }

    pub fn shape(&self) -> LatentShape {
        self.params.shape
    }

    pub fn network(&self) -> EvolutionNetwork {
        self.network
    }

    pub fn chain(&self) -> ChainLogDensity {
        ChainLogDensity::new(self.network)
    }

    /// Replace the parameters after checking their shapes match.
    pub fn set_params(&mut self, params: EvolutionParams) -> LatentResult<()> {
        params.validate()?;
        if params.shape != self.params.shape {
            return Err(
                ParamError::ShapeChanged { expected: self.params.shape, found: params.shape }.into()
            );
        }
        self.params = params;
        Ok(())
    }

    /// Attach a trajectory batch for later stored evaluation.
    pub fn store(&mut self, x: Array3<f64>) -> LatentResult<()> {
        validate_trajectories("stored trajectory", &x, self.params.shape.x_dim)?;
        self.stored = Some(x);
        Ok(())
    }

    pub fn stored(&self) -> Option<&Array3<f64>> {
        self.stored.as_ref()
    }

    // ---- Evaluation ----

    pub fn evaluate_on_batch(
        &self, x: ArrayView3<'_, f64>, ids: &[usize],
    ) -> LatentResult<EvolutionOutput> {
        self.network.evaluate_on_batch(&self.params, x, ids)
    }

    pub fn evaluate_shared(&self, path: ArrayView2<'_, f64>) -> LatentResult<EvolutionOutput> {
        self.network.evaluate_shared(&self.params, path)
    }

    /// Evaluate the stored trajectory broadcast across all entities.
    ///
    /// # Errors
    /// - `NoStoredTrajectory` if nothing is stored.
    /// - `StoredBatchNotSingleton` if the stored batch has more than one trial.
    pub fn evaluate_on_stored(&self) -> LatentResult<EvolutionOutput> {
        let path = self.stored_path()?;
        self.network.evaluate_shared(&self.params, path)
    }

    pub fn transition_jacobians(
        &self, x: ArrayView3<'_, f64>, ids: &[usize],
    ) -> LatentResult<Array4<f64>> {
        self.network.transition_jacobians(&self.params, x, ids)
    }

    pub fn next_states(
        &self, path: ArrayView3<'_, f64>, entity: usize, with_inflow: bool,
    ) -> LatentResult<Array2<f64>> {
        self.network.next_states(&self.params, path, entity, with_inflow)
    }

    pub fn flow_field(&self, entity: usize, range: f64, n: usize) -> LatentResult<FlowField> {
        self.network.flow_field(&self.params, entity, range, n)
    }

    // ---- Log density ----

    pub fn log_density_on_batch(
        &self, x: ArrayView3<'_, f64>, ids: &[usize], with_inflow: bool,
    ) -> LatentResult<ChainDensity> {
        self.chain().on_batch(&self.params, x, ids, with_inflow)
    }

    pub fn log_density_shared(
        &self, path: ArrayView2<'_, f64>, with_inflow: bool,
    ) -> LatentResult<ChainDensity> {
        self.chain().shared(&self.params, path, with_inflow)
    }

    /// Log density of the stored trajectory under every entity.
    ///
    /// # Errors
    /// Same preconditions as [`LatentEvolution::evaluate_on_stored`].
    pub fn log_density_on_stored(&self, with_inflow: bool) -> LatentResult<ChainDensity> {
        let path = self.stored_path()?;
        self.chain().shared(&self.params, path, with_inflow)
    }

    pub fn log_density_with_grad(
        &self, x: ArrayView3<'_, f64>, ids: &[usize], with_inflow: bool,
    ) -> LatentResult<(ChainDensity, ChainGradient)> {
        self.chain().with_grad(&self.params, x, ids, with_inflow)
    }

    // ---- Sampling ----

    /// Draw trajectories without touching the stored batch.
    pub fn sample<R: Rng + ?Sized>(
        &self, opts: SamplerOptions, ids: Option<&[usize]>, initial: Option<&Array2<f64>>,
        rng: &mut R,
    ) -> LatentResult<SampledTrajectories> {
        TrajectorySampler::new(self.network, opts)?.sample(&self.params, ids, initial, rng)
    }

    /// Draw trajectories and store them for later stored evaluation.
    ///
    /// The RNG is seeded from `opts.seed` when set.
    pub fn sample_and_store(
        &mut self, opts: SamplerOptions, ids: Option<&[usize]>, initial: Option<&Array2<f64>>,
    ) -> LatentResult<SampledTrajectories> {
        let mut rng = match opts.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let out = self.sample(opts, ids, initial, &mut rng)?;
        self.stored = Some(out.paths.clone());
        Ok(out)
    }

    fn stored_path(&self) -> LatentResult<ArrayView2<'_, f64>> {
        let stored = self.stored.as_ref().ok_or(LatentError::NoStoredTrajectory)?;
        let batch = stored.len_of(Axis(0));
        if batch != 1 {
            return Err(LatentError::StoredBatchNotSingleton { batch });
        }
        Ok(stored.index_axis(Axis(0), 0))
    }
}
