//! TrajectorySampler — generative simulation with rejection of stalled paths.
//!
//! Purpose
//! -------
//! Draw synthetic latent trajectories from the model:
//!
//! ```text
//! x_0     = x0_scale · z_0 · Q0chol          (or a supplied initial state)
//! x_{t+1} = x_t · M(x_t) + z_{t+1} · Qchol   z ~ N(0, I)
//! ```
//!
//! A trial whose mean step length `mean_t ‖x_{t+1} - x_t‖` falls below
//! `path_mse_threshold` is discarded and redrawn, up to `max_attempts` times.
//!
//! Key behaviors
//! -------------
//! - Identities are drawn uniformly from the entity table unless supplied.
//! - Every rejection is logged at `debug`; exhausting the cap is an error
//!   (`SamplerExhausted`) rather than an endless loop.
//! - Randomness comes from the caller's RNG, so seeded runs are reproducible.
use ndarray::{Array1, Array2, Array3, s};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

use crate::latent::{
    core::{
        options::SamplerOptions,
        params::EvolutionParams,
        validation::validate_ids,
    },
    errors::{LatentError, LatentResult},
    models::evolution::EvolutionNetwork,
};

/// Sampled trials with their identities and the attempts each one took.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledTrajectories {
    /// `[n_samples, n_bins, x_dim]`.
    pub paths: Array3<f64>,
    pub ids: Vec<usize>,
    pub attempts: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySampler {
    pub network: EvolutionNetwork,
    pub opts: SamplerOptions,
}

impl TrajectorySampler {
    /// # Errors
    /// `LatentError::InvalidOption` if `opts` fail validation.
    pub fn new(network: EvolutionNetwork, opts: SamplerOptions) -> LatentResult<Self> {
        opts.validate()?;
        Ok(Self { network, opts })
    }

    /// Sample one trial per supplied id or initial state, or `opts.n_samples`
    /// trials when neither is given.
    ///
    /// Parameters
    /// ----------
    /// - `params`: model parameters (read only).
    /// - `ids`: optional identity per trial; drawn uniformly otherwise.
    /// - `initial`: optional `[n, x_dim]` initial states.
    /// - `rng`: source of all randomness.
    ///
    /// Errors
    /// ------
    /// - `EmptyBatch` if the supplied `ids` or `initial` are empty.
    /// - `UnknownEntity` for bad `ids`.
    /// - `BatchShapeMismatch` if `ids` and `initial` disagree on the trial
    ///   count; `StateDimMismatch` / `NonFiniteData` for bad `initial`.
    /// - `DegenerateCovariance` for bad noise factors.
    /// - `SamplerExhausted` if a trial is rejected `max_attempts` times.
    pub fn sample<R: Rng + ?Sized>(
        &self, params: &EvolutionParams, ids: Option<&[usize]>, initial: Option<&Array2<f64>>,
        rng: &mut R,
    ) -> LatentResult<SampledTrajectories> {
        let opts = &self.opts;
        let (t, d) = (opts.n_bins, params.shape.x_dim);
        let n = match (ids, initial) {
            (Some(ids), _) => ids.len(),
            (None, Some(x0)) => x0.nrows(),
            (None, None) => opts.n_samples,
        };
        if n == 0 {
            return Err(LatentError::EmptyBatch);
        }
        let ids: Vec<usize> = match ids {
            Some(ids) => {
                validate_ids(ids, n, params.shape.num_entities)?;
                ids.to_vec()
            }
            None => (0..n).map(|_| rng.gen_range(0..params.shape.num_entities)).collect(),
        };
        if let Some(x0) = initial {
            if x0.nrows() != n {
                return Err(LatentError::BatchShapeMismatch {
                    what: "initial states",
                    expected: n,
                    found: x0.nrows(),
                });
            }
            if x0.ncols() != d {
                return Err(LatentError::StateDimMismatch { expected: d, found: x0.ncols() });
            }
            if let Some((index, &value)) = x0.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(LatentError::NonFiniteData { what: "initial states", index, value });
            }
        }
        let q = params.process_noise()?;
        let q0 = params.initial_noise()?;

        let mut paths = Array3::zeros((n, t, d));
        let mut attempts = Vec::with_capacity(n);
        for (trial, &id) in ids.iter().enumerate() {
            let mut attempt = 0;
            loop {
                if attempt == opts.max_attempts {
                    return Err(LatentError::SamplerExhausted { trial, attempts: attempt });
                }
                attempt += 1;

                let start = match initial {
                    Some(x0) => x0.row(trial).to_owned(),
                    None => standard_normal(d, rng).dot(&q0.chol) * opts.x0_scale,
                };
                let path = self.simulate(params, start, id, &q.chol, t, rng)?;
                let step_norm = mean_step_norm(&path);
                if step_norm < opts.path_mse_threshold {
                    debug!(trial, attempt, step_norm, "rejected stalled trajectory");
                    continue;
                }
                paths.slice_mut(s![trial, .., ..]).assign(&path);
                break;
            }
            attempts.push(attempt);
        }
        Ok(SampledTrajectories { paths, ids, attempts })
    }

    fn simulate<R: Rng + ?Sized>(
        &self, params: &EvolutionParams, start: Array1<f64>, id: usize, q_chol: &Array2<f64>,
        t: usize, rng: &mut R,
    ) -> LatentResult<Array2<f64>> {
        let mut path = Array2::zeros((t, start.len()));
        path.row_mut(0).assign(&start);
        for step in 0..t - 1 {
            let x = path.row(step).to_owned();
            let m = self.network.transition_at(params, &x, id, self.opts.with_inflow)?;
            let noise = standard_normal(x.len(), rng).dot(q_chol);
            path.row_mut(step + 1).assign(&(x.dot(&m) + noise));
        }
        Ok(path)
    }
}

fn standard_normal<R: Rng + ?Sized>(d: usize, rng: &mut R) -> Array1<f64> {
    Array1::from_shape_simple_fn(d, || rng.sample(StandardNormal))
}

fn mean_step_norm(path: &Array2<f64>) -> f64 {
    let t = path.nrows();
    if t < 2 {
        return 0.0;
    }
    let total: f64 = (0..t - 1)
        .map(|step| {
            let diff = &path.row(step + 1) - &path.row(step);
            diff.dot(&diff).sqrt()
        })
        .sum();
    total / (t - 1) as f64
}
