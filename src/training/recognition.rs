//! MeanFieldRecognition: a linear-Gaussian posterior with dynamics smoothing.
//!
//! Purpose
//! -------
//! Provide a small, concrete [`Recognition`] so the fixed-point training loop
//! runs end to end.
//!
//! Key behaviors
//! -------------
//! - Mean: `m_t = y_t · W + c`.
//! - Path: `path_0 = m_0`,
//!   `path_t = (1-λ)·m_t + λ·(prev_{t-1} · M_{t-1})`, where `M` is the full
//!   transition `A(prev)` for [`PosteriorVariant::WithGradTerm`] and the base
//!   linear component `Alinear` for [`PosteriorVariant::NoGradTerm`].
//! - Sample: `path + σ ⊙ ε`, `ε ~ N(0, I)`, with per-dimension `σ = exp(log_sigma)`.
//! - Entropy: `N·T·Σ_d (log σ_d + ½(1 + ln 2π))`.
//! - Adapt: one ascent step on `(W, c, log_sigma)` driven by `∂LogDensity/∂X`
//!   at the sample (plus the entropy gradient for `log_sigma`).
//!
//! Invariants & assumptions
//! ------------------------
//! - `prev` has the same `[trials, bins]` as the observations and `x_dim`
//!   trailing states.
//! - Because `path_t` only depends on `prev_{t-1}`, iterating
//!   `X ← posterior_path(Y, X)` reaches an exact fixed point after at most
//!   `bins` passes.
use ndarray::{Array1, Array2, Array3, Axis, s};
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use crate::{
    latent::{
        core::{
            data::ObservationBatch,
            network::Initializer,
            validation::{verify_non_negative, validate_trajectories},
        },
        errors::{LatentError, LatentResult},
        models::LatentEvolution,
    },
    optimization::numerical_stability::LN_2PI,
    training::collaborators::{PosteriorSample, PosteriorVariant, Recognition},
};

/// Options for [`MeanFieldRecognition`].
///
/// - `smoothing`: weight `λ ∈ [0, 1]` of the dynamics prediction in the path
///   (default 0.5).
/// - `init_log_sigma`: initial `log σ` for every latent dimension
///   (default -1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionOptions {
    pub smoothing: f64,
    pub init_log_sigma: f64,
}

impl RecognitionOptions {
    /// # Errors
    /// `LatentError::InvalidOption` if `smoothing ∉ [0, 1]` or
    /// `init_log_sigma` is non-finite.
    pub fn new(smoothing: f64, init_log_sigma: f64) -> LatentResult<Self> {
        verify_non_negative("smoothing", smoothing)?;
        if smoothing > 1.0 {
            return Err(LatentError::InvalidOption {
                name: "smoothing",
                value: smoothing,
                reason: "Smoothing weight must lie in [0, 1].",
            });
        }
        if !init_log_sigma.is_finite() {
            return Err(LatentError::InvalidOption {
                name: "init_log_sigma",
                value: init_log_sigma,
                reason: "Initial log-width must be finite.",
            });
        }
        Ok(Self { smoothing, init_log_sigma })
    }

    pub fn validate(&self) -> LatentResult<()> {
        Self::new(self.smoothing, self.init_log_sigma).map(|_| ())
    }
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self { smoothing: 0.5, init_log_sigma: -1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanFieldRecognition {
    /// `[y_dim, x_dim]`.
    pub w: Array2<f64>,
    pub c: Array1<f64>,
    pub log_sigma: Array1<f64>,
    pub opts: RecognitionOptions,
}

impl MeanFieldRecognition {
    pub fn new<R: Rng + ?Sized>(
        y_dim: usize, x_dim: usize, opts: RecognitionOptions, rng: &mut R,
    ) -> LatentResult<Self> {
        opts.validate()?;
        Ok(Self {
            w: Initializer::GlorotUniform.draw(y_dim, x_dim, rng),
            c: Array1::zeros(x_dim),
            log_sigma: Array1::from_elem(x_dim, opts.init_log_sigma),
            opts,
        })
    }

    pub fn x_dim(&self) -> usize {
        self.w.ncols()
    }

    fn check_observations(&self, y: &ObservationBatch) -> LatentResult<()> {
        if y.y_dim() != self.w.nrows() {
            return Err(LatentError::ObservationDimMismatch {
                expected: self.w.nrows(),
                found: y.y_dim(),
            });
        }
        Ok(())
    }

    fn check_prev(&self, y: &ObservationBatch, prev: &Array3<f64>) -> LatentResult<()> {
        validate_trajectories("previous path", prev, self.x_dim())?;
        let (n, t, _) = prev.dim();
        if n != y.n_trials() {
            return Err(LatentError::BatchShapeMismatch {
                what: "trials",
                expected: y.n_trials(),
                found: n,
            });
        }
        if t != y.n_bins() {
            return Err(LatentError::BatchShapeMismatch {
                what: "time bins",
                expected: y.n_bins(),
                found: t,
            });
        }
        Ok(())
    }

    /// `∂path/∂m_t`, elementwise.
    fn path_weight(&self, step: usize) -> f64 {
        if step == 0 { 1.0 } else { 1.0 - self.opts.smoothing }
    }
}

impl Recognition for MeanFieldRecognition {
    fn posterior_mean(&self, y: &ObservationBatch) -> LatentResult<Array3<f64>> {
        self.check_observations(y)?;
        let (n, t, _) = y.data.dim();
        let mut mean = Array3::zeros((n, t, self.x_dim()));
        for (mut m, row) in mean.lanes_mut(Axis(2)).into_iter().zip(y.data.lanes(Axis(2))) {
            m.assign(&(row.dot(&self.w) + &self.c));
        }
        Ok(mean)
    }

    fn posterior_path(
        &self, y: &ObservationBatch, prev: &Array3<f64>, evolution: &LatentEvolution,
        variant: PosteriorVariant,
    ) -> LatentResult<Array3<f64>> {
        let mean = self.posterior_mean(y)?;
        self.check_prev(y, prev)?;
        let lambda = self.opts.smoothing;
        let full = match variant {
            PosteriorVariant::WithGradTerm => {
                Some(evolution.evaluate_on_batch(prev.view(), &y.ids)?)
            }
            PosteriorVariant::NoGradTerm => None,
        };
        let a_linear = &evolution.params.a_linear;

        let mut path = mean.clone();
        let (n, t, _) = prev.dim();
        for i in 0..n {
            for step in 1..t {
                let x_prev = prev.slice(s![i, step - 1, ..]);
                let pred = match &full {
                    Some(out) => x_prev.dot(&out.a.slice(s![i, step - 1, .., ..])),
                    None => x_prev.dot(a_linear),
                };
                let blended = &mean.slice(s![i, step, ..]) * (1.0 - lambda) + pred * lambda;
                path.slice_mut(s![i, step, ..]).assign(&blended);
            }
        }
        Ok(path)
    }

    fn posterior_sample(
        &self, y: &ObservationBatch, prev: &Array3<f64>, evolution: &LatentEvolution,
        variant: PosteriorVariant, rng: &mut dyn RngCore,
    ) -> LatentResult<PosteriorSample> {
        let path = self.posterior_path(y, prev, evolution, variant)?;
        let noise = Array3::from_shape_simple_fn(path.raw_dim(), || rng.sample(StandardNormal));
        let sigma = self.log_sigma.mapv(f64::exp);
        let sample = &path + &(&noise * &sigma);
        Ok(PosteriorSample { path, sample, noise })
    }

    fn entropy(&self, _y: &ObservationBatch, sample: &PosteriorSample) -> f64 {
        let (n, t, _) = sample.sample.dim();
        let per_bin: f64 = self.log_sigma.iter().map(|ls| ls + 0.5 * (1.0 + LN_2PI)).sum();
        (n * t) as f64 * per_bin
    }

    fn adapt(
        &mut self, y: &ObservationBatch, sample: &PosteriorSample, grad_x: &Array3<f64>,
        rate: f64,
    ) -> LatentResult<()> {
        self.check_observations(y)?;
        if grad_x.dim() != sample.sample.dim() {
            return Err(LatentError::BatchShapeMismatch {
                what: "gradient",
                expected: sample.sample.len(),
                found: grad_x.len(),
            });
        }
        let (n, t, d) = grad_x.dim();
        let rows = (n * t) as f64;
        let sigma = self.log_sigma.mapv(f64::exp);

        let mut grad_w = Array2::zeros(self.w.raw_dim());
        let mut grad_c = Array1::zeros(d);
        let mut grad_log_sigma = Array1::from_elem(d, rows);
        for i in 0..n {
            for step in 0..t {
                let g = grad_x.slice(s![i, step, ..]);
                let g_mean = &g * self.path_weight(step);
                let yt = y.data.slice(s![i, step, ..]);
                for (k, &yk) in yt.iter().enumerate() {
                    grad_w.row_mut(k).scaled_add(yk, &g_mean);
                }
                grad_c += &g_mean;
                grad_log_sigma += &(&g * &sample.noise.slice(s![i, step, ..]) * &sigma);
            }
        }
        let scale = rate / rows;
        self.w.scaled_add(scale, &grad_w);
        self.c.scaled_add(scale, &grad_c);
        self.log_sigma.scaled_add(scale, &grad_log_sigma);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latent::core::{options::EvolutionOptions, shape::LatentShape};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Mean shapes and the linear read-in.
    // - Fixed-point idempotence of `posterior_path`.
    // - Sample centering and the entropy closed form.
    // - Option and shape validation.
    // -------------------------------------------------------------------------

    fn evolution(alpha: f64, a_linear_scale: f64) -> LatentEvolution {
        let shape = LatentShape::new(2, 1, 2).expect("valid shape");
        let opts =
            EvolutionOptions { hidden_width: 5, seed: Some(3), ..EvolutionOptions::default() };
        let mut model = LatentEvolution::new(shape, opts).expect("valid model");
        model.params.alpha = alpha;
        model.params.a_linear = Array2::eye(2) * a_linear_scale;
        model
    }

    fn observations() -> ObservationBatch {
        let data = Array3::from_shape_fn((3, 6, 3), |(i, t, k)| ((i + t * k) as f64 * 0.3).cos());
        ObservationBatch::new(data, Some(vec![0, 1, 1]), 2).expect("valid batch")
    }

    fn recognition() -> MeanFieldRecognition {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        MeanFieldRecognition::new(3, 2, RecognitionOptions::default(), &mut rng)
            .expect("valid options")
    }

    #[test]
    // Purpose
    // -------
    // Verify the posterior mean is the linear read-in.
    //
    // Given
    // -----
    // - 3 trials × 6 bins × 3 observation dims, x_dim 2.
    //
    // Expect
    // ------
    // - Shape (3, 6, 2) and mean[i, t] = y[i, t] · W + c.
    fn posterior_mean_is_linear_read_in() {
        // Arrange
        let y = observations();
        let mut rec = recognition();
        rec.c = ndarray::array![0.5, -0.5];

        // Act
        let mean = rec.posterior_mean(&y).expect("valid observations");

        // Assert
        assert_eq!(mean.dim(), (3, 6, 2));
        let row: ndarray::ArrayView1<'_, f64> = y.data.slice(s![1, 2, ..]);
        let expected: Array1<f64> = row.dot(&rec.w) + &rec.c;
        for k in 0..2 {
            assert!((mean[[1, 2, k]] - expected[k]).abs() < 1e-14);
        }
    }

    #[test]
    // Purpose
    // -------
    // Check fixed-point idempotence: once converged, one more iteration
    // leaves the path unchanged.
    //
    // Given
    // -----
    // - λ = 0.5, alpha = 0, Alinear = 0.5·I, the NoGradTerm variant and 60
    //   iterations from the posterior mean.
    //
    // Expect
    // ------
    // - An extra iteration changes no entry by more than 1e-10.
    fn fixed_point_iteration_is_idempotent() {
        // Arrange
        let y = observations();
        let rec = recognition();
        let evo = evolution(0.0, 0.5);
        let mut x = rec.posterior_mean(&y).expect("valid observations");
        for _ in 0..60 {
            x = rec.posterior_path(&y, &x, &evo, PosteriorVariant::NoGradTerm).expect("valid");
        }

        // Act
        let next = rec.posterior_path(&y, &x, &evo, PosteriorVariant::NoGradTerm).expect("valid");

        // Assert
        let max_change = (&next - &x).iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        assert!(max_change < 1e-10, "max change {max_change}");
    }

    #[test]
    // Purpose
    // -------
    // Ensure the gradient-term variant differs from the linear-only one when
    // the network contributes.
    //
    // Given
    // -----
    // - alpha = 0.2 and a non-trivial previous path.
    //
    // Expect
    // ------
    // - Equal first bin, different later bins.
    fn variants_differ_only_through_dynamics() {
        // Arrange
        let y = observations();
        let rec = recognition();
        let evo = evolution(0.2, 1.0);
        let prev = rec.posterior_mean(&y).expect("valid observations");

        // Act
        let with =
            rec.posterior_path(&y, &prev, &evo, PosteriorVariant::WithGradTerm).expect("ok");
        let without =
            rec.posterior_path(&y, &prev, &evo, PosteriorVariant::NoGradTerm).expect("ok");

        // Assert
        assert_eq!(with.slice(s![.., 0, ..]), without.slice(s![.., 0, ..]));
        assert!((&with - &without).iter().any(|v| v.abs() > 1e-9));
    }

    #[test]
    // Purpose
    // -------
    // Verify sampling and the entropy closed form.
    //
    // Given
    // -----
    // - log σ = -1 for both latent dims, 3 trials × 6 bins.
    //
    // Expect
    // ------
    // - sample = path + σ·ε; entropy = 18 · 2 · (-1 + ½(1 + ln 2π)).
    fn sample_and_entropy_follow_widths() {
        // Arrange
        let y = observations();
        let rec = recognition();
        let evo = evolution(0.2, 1.0);
        let prev = rec.posterior_mean(&y).expect("valid observations");
        let mut rng = ChaCha8Rng::seed_from_u64(4);

        // Act
        let draw = rec
            .posterior_sample(&y, &prev, &evo, PosteriorVariant::NoGradTerm, &mut rng)
            .expect("valid inputs");
        let entropy = rec.entropy(&y, &draw);

        // Assert
        let sigma = (-1.0_f64).exp();
        for ((&s_, &p), &e) in draw.sample.iter().zip(draw.path.iter()).zip(draw.noise.iter()) {
            assert!((s_ - (p + sigma * e)).abs() < 1e-12);
        }
        let expected = 18.0 * 2.0 * (-1.0 + 0.5 * (1.0 + LN_2PI));
        assert!((entropy - expected).abs() < 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // Check that adaptation moves the offset along a positive gradient.
    //
    // Given
    // -----
    // - ∂LogDensity/∂X = 1 everywhere, rate 0.1.
    //
    // Expect
    // ------
    // - Every entry of `c` increases.
    fn adapt_follows_state_gradient() {
        // Arrange
        let y = observations();
        let mut rec = recognition();
        let evo = evolution(0.2, 1.0);
        let prev = rec.posterior_mean(&y).expect("valid observations");
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let draw = rec
            .posterior_sample(&y, &prev, &evo, PosteriorVariant::NoGradTerm, &mut rng)
            .expect("valid inputs");
        let grad = Array3::ones(draw.sample.raw_dim());
        let before = rec.c.clone();

        // Act
        rec.adapt(&y, &draw, &grad, 0.1).expect("valid shapes");

        // Assert
        assert!(rec.c.iter().zip(before.iter()).all(|(a, b)| a > b));
    }

    #[test]
    // Purpose
    // -------
    // Verify option and shape validation.
    //
    // Given
    // -----
    // - smoothing 1.5; a previous path with the wrong number of bins.
    //
    // Expect
    // ------
    // - `InvalidOption { name: "smoothing" }` and
    //   `BatchShapeMismatch { what: "time bins" }`.
    fn validation_rejects_bad_inputs() {
        // Arrange
        let y = observations();
        let rec = recognition();
        let evo = evolution(0.2, 1.0);
        let short = Array3::<f64>::zeros((3, 4, 2));

        // Act
        let opts = RecognitionOptions::new(1.5, -1.0);
        let path = rec.posterior_path(&y, &short, &evo, PosteriorVariant::NoGradTerm);

        // Assert
        assert!(matches!(opts, Err(LatentError::InvalidOption { name: "smoothing", .. })));
        assert!(matches!(
            path,
            Err(LatentError::BatchShapeMismatch { what: "time bins", expected: 6, found: 4 })
        ));
    }
}
