//! Observation models: `log p(Y | X)` for Gaussian and Poisson data.
//!
//! Purpose
//! -------
//! Score observations `Y [trials, bins, y_dim]` given latent trajectories
//! `X [trials, bins, x_dim]` through a linear read-out `η = X·C + d`, and
//! provide the two derivatives the training loop needs: `∂LY/∂X` (folded
//! into the posterior update signal) and an ascent step on the read-out's own
//! parameters.
//!
//! Key behaviors
//! -------------
//! - [`ObservationKind`] names the family and parses from `"Gaussian"` /
//!   `"Poisson"`; [`ObservationModel::new`] resolves it once.
//! - Gaussian: `y ~ N(η, diag(σ²))`, with terms
//!   `ly1 = -½ Σ (y-η)²/σ²` and `ly2 = -Σ (ln σ + ½ ln 2π)`.
//! - Poisson: `y ~ Poisson(softplus(η))`, with terms
//!   `ly1 = Σ y ln λ - λ` and `ly2 = -Σ ln Γ(y+1)`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `Y` and `X` share their leading `[trials, bins]` axes.
//! - Poisson counts must be non-negative; rates are floored at
//!   [`RATE_FLOOR`] so `ln λ` stays finite.
use std::str::FromStr;

use ndarray::{Array1, Array2, Array3, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;

use crate::{
    latent::{
        core::network::Initializer,
        errors::{LatentError, LatentResult},
    },
    optimization::numerical_stability::{LN_2PI, safe_logistic, safe_softplus, safe_softplus_inv},
};

/// Smallest Poisson rate used inside `ln λ`.
pub const RATE_FLOOR: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ObservationKind {
    #[default]
    Gaussian,
    Poisson,
}

impl FromStr for ObservationKind {
    type Err = LatentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Gaussian" | "gaussian" => Ok(ObservationKind::Gaussian),
            "Poisson" | "poisson" => Ok(ObservationKind::Poisson),
            other => Err(LatentError::InvalidObservationKind { name: other.to_string() }),
        }
    }
}

/// Observation log density and its two aux terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationDensity {
    pub total: f64,
    pub ly1: f64,
    pub ly2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianReadout {
    /// `[x_dim, y_dim]`.
    pub c: Array2<f64>,
    pub d: Array1<f64>,
    pub log_sigma: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoissonReadout {
    /// `[x_dim, y_dim]`.
    pub c: Array2<f64>,
    pub d: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObservationModel {
    Gaussian(GaussianReadout),
    Poisson(PoissonReadout),
}

impl ObservationModel {
    /// Build a read-out with Glorot-uniform `C`, zero `d` and unit noise.
    pub fn new<R: Rng + ?Sized>(
        kind: ObservationKind, x_dim: usize, y_dim: usize, rng: &mut R,
    ) -> Self {
        let c = Initializer::GlorotUniform.draw(x_dim, y_dim, rng);
        let d = Array1::zeros(y_dim);
        match kind {
            ObservationKind::Gaussian => {
                ObservationModel::Gaussian(GaussianReadout { c, d, log_sigma: Array1::zeros(y_dim) })
            }
            ObservationKind::Poisson => ObservationModel::Poisson(PoissonReadout { c, d }),
        }
    }

    pub fn kind(&self) -> ObservationKind {
        match self {
            ObservationModel::Gaussian(_) => ObservationKind::Gaussian,
            ObservationModel::Poisson(_) => ObservationKind::Poisson,
        }
    }

    pub fn y_dim(&self) -> usize {
        self.readout().1.len()
    }

    /// Seed the offset `d` from the per-dimension mean of `y`.
    ///
    /// Gaussian: `d = mean(y)`. Poisson: `d = softplus⁻¹(max(mean(y), 1e-3))`.
    pub fn seed_offset(&mut self, y: &Array3<f64>) -> LatentResult<()> {
        let (n, t, y_dim) = y.dim();
        if y_dim != self.y_dim() {
            return Err(LatentError::ObservationDimMismatch { expected: self.y_dim(), found: y_dim });
        }
        if n * t == 0 {
            return Err(LatentError::EmptyBatch);
        }
        let flat = y.to_shape((n * t, y_dim)).map_err(|_| LatentError::EmptyBatch)?;
        let mean = flat.mean_axis(Axis(0)).ok_or(LatentError::EmptyBatch)?;
        match self {
            ObservationModel::Gaussian(g) => g.d = mean,
            ObservationModel::Poisson(p) => p.d = mean.mapv(|m| safe_softplus_inv(m.max(1e-3))),
        }
        Ok(())
    }

    /// `log p(Y | X)` summed over trials and bins.
    ///
    /// # Errors
    /// - `BatchShapeMismatch` if trials or bins differ.
    /// - `ObservationDimMismatch` / `StateDimMismatch` for wrong trailing axes.
    /// - `InvalidOption` for negative Poisson counts.
    pub fn log_density(&self, y: &Array3<f64>, x: &Array3<f64>) -> LatentResult<ObservationDensity> {
        self.check(y, x)?;
        let eta = self.linear_predictor(x);
        let (ly1, ly2) = match self {
            ObservationModel::Gaussian(g) => {
                let inv_var = g.log_sigma.mapv(|s| (-2.0 * s).exp());
                let resid = y - &eta;
                let quad = (&resid * &resid * &inv_var).sum();
                let rows = (y.len_of(Axis(0)) * y.len_of(Axis(1))) as f64;
                let norm = g.log_sigma.iter().map(|s| s + 0.5 * LN_2PI).sum::<f64>();
                (-0.5 * quad, -rows * norm)
            }
            ObservationModel::Poisson(_) => {
                let mut ly1 = 0.0;
                let mut ly2 = 0.0;
                for (&yv, &e) in y.iter().zip(eta.iter()) {
                    let rate = safe_softplus(e).max(RATE_FLOOR);
                    ly1 += yv * rate.ln() - rate;
                    ly2 -= ln_gamma(yv + 1.0);
                }
                (ly1, ly2)
            }
        };
        Ok(ObservationDensity { total: ly1 + ly2, ly1, ly2 })
    }

    /// `∂ log p(Y | X) / ∂X`, shape `[trials, bins, x_dim]`.
    pub fn grad_x(&self, y: &Array3<f64>, x: &Array3<f64>) -> LatentResult<Array3<f64>> {
        self.check(y, x)?;
        let g_eta = self.grad_eta(y, x);
        let (c, _) = self.readout();
        let (n, t, d) = x.dim();
        let mut out = Array3::zeros((n, t, d));
        for (mut o, g) in out.lanes_mut(Axis(2)).into_iter().zip(g_eta.lanes(Axis(2))) {
            o.assign(&c.dot(&g));
        }
        Ok(out)
    }

    /// One gradient-ascent step on the read-out parameters.
    ///
    /// The step is averaged over `trials · bins`.
    pub fn adapt(&mut self, y: &Array3<f64>, x: &Array3<f64>, rate: f64) -> LatentResult<()> {
        self.check(y, x)?;
        let g_eta = self.grad_eta(y, x);
        let resid = y - &self.linear_predictor(x);
        let (n, t, xd) = x.dim();
        let yd = y.len_of(Axis(2));
        let rows = n * t;
        let scale = rate / rows as f64;
        let xs = x.to_shape((rows, xd)).map_err(|_| LatentError::EmptyBatch)?;
        let gs = g_eta.to_shape((rows, yd)).map_err(|_| LatentError::EmptyBatch)?;
        let grad_c = xs.t().dot(&gs);
        let grad_d = gs.sum_axis(Axis(0));
        match self {
            ObservationModel::Gaussian(g) => {
                let inv_var = g.log_sigma.mapv(|s| (-2.0 * s).exp());
                let mut grad_log_sigma = Array1::<f64>::zeros(yd);
                for lane in resid.lanes(Axis(2)) {
                    for k in 0..yd {
                        grad_log_sigma[k] += lane[k] * lane[k] * inv_var[k] - 1.0;
                    }
                }
                g.c.scaled_add(scale, &grad_c);
                g.d.scaled_add(scale, &grad_d);
                g.log_sigma.scaled_add(scale, &grad_log_sigma);
            }
            ObservationModel::Poisson(p) => {
                p.c.scaled_add(scale, &grad_c);
                p.d.scaled_add(scale, &grad_d);
            }
        }
        Ok(())
    }

    fn readout(&self) -> (&Array2<f64>, &Array1<f64>) {
        match self {
            ObservationModel::Gaussian(g) => (&g.c, &g.d),
            ObservationModel::Poisson(p) => (&p.c, &p.d),
        }
    }

    fn linear_predictor(&self, x: &Array3<f64>) -> Array3<f64> {
        let (c, d) = self.readout();
        x.dot_last(c) + d
    }

    fn grad_eta(&self, y: &Array3<f64>, x: &Array3<f64>) -> Array3<f64> {
        let eta = self.linear_predictor(x);
        match self {
            ObservationModel::Gaussian(g) => {
                let inv_var = g.log_sigma.mapv(|s| (-2.0 * s).exp());
                (y - &eta) * &inv_var
            }
            ObservationModel::Poisson(_) => {
                let mut g = Array3::zeros(eta.raw_dim());
                ndarray::Zip::from(&mut g).and(y).and(&eta).for_each(|g, &yv, &e| {
                    let rate = safe_softplus(e).max(RATE_FLOOR);
                    *g = (yv / rate - 1.0) * safe_logistic(e);
                });
                g
            }
        }
    }

    fn check(&self, y: &Array3<f64>, x: &Array3<f64>) -> LatentResult<()> {
        let (yn, yt, yd) = y.dim();
        let (xn, xt, xd) = x.dim();
        if yn != xn {
            return Err(LatentError::BatchShapeMismatch { what: "trials", expected: xn, found: yn });
        }
        if yt != xt {
            return Err(LatentError::BatchShapeMismatch { what: "time bins", expected: xt, found: yt });
        }
        if yd != self.y_dim() {
            return Err(LatentError::ObservationDimMismatch { expected: self.y_dim(), found: yd });
        }
        let (c, _) = self.readout();
        if xd != c.nrows() {
            return Err(LatentError::StateDimMismatch { expected: c.nrows(), found: xd });
        }
        if self.kind() == ObservationKind::Poisson {
            if let Some(&value) = y.iter().find(|v| **v < 0.0) {
                return Err(LatentError::InvalidOption {
                    name: "observations",
                    value,
                    reason: "Poisson counts must be non-negative.",
                });
            }
        }
        Ok(())
    }
}

/// `[n, t, a] · [a, b] -> [n, t, b]`.
trait DotLast {
    fn dot_last(&self, m: &Array2<f64>) -> Array3<f64>;
}

impl DotLast for Array3<f64> {
    fn dot_last(&self, m: &Array2<f64>) -> Array3<f64> {
        let (n, t, _) = self.dim();
        let mut out = Array3::zeros((n, t, m.ncols()));
        for (mut o, row) in out.lanes_mut(Axis(2)).into_iter().zip(self.lanes(Axis(2))) {
            o.assign(&row.dot(m));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Kind parsing.
    // - Closed-form Gaussian density at a zero residual.
    // - `grad_x` against finite differences for both families.
    // - Ascent steps increasing the log density.
    // - Shape and count validation.
    // -------------------------------------------------------------------------

    fn latent() -> Array3<f64> {
        Array3::from_shape_fn((2, 3, 2), |(i, t, j)| ((i + 2 * t + 3 * j) as f64 * 0.4).sin())
    }

    fn counts() -> Array3<f64> {
        Array3::from_shape_fn((2, 3, 3), |(i, t, k)| ((i + t + k) % 4) as f64)
    }

    #[test]
    // Purpose
    // -------
    // Verify kind parsing, including the error for unknown names.
    //
    // Given
    // -----
    // - "Gaussian", "poisson" and "Bernoulli".
    //
    // Expect
    // ------
    // - Two kinds and `InvalidObservationKind { name: "Bernoulli" }`.
    fn kind_parses_known_names() {
        assert_eq!("Gaussian".parse::<ObservationKind>(), Ok(ObservationKind::Gaussian));
        assert_eq!("poisson".parse::<ObservationKind>(), Ok(ObservationKind::Poisson));
        assert_eq!(
            "Bernoulli".parse::<ObservationKind>(),
            Err(LatentError::InvalidObservationKind { name: "Bernoulli".to_string() })
        );
    }

    #[test]
    // Purpose
    // -------
    // Check the Gaussian closed form when `y = η` with unit noise.
    //
    // Given
    // -----
    // - y set to the model's own predictor, σ = 1.
    //
    // Expect
    // ------
    // - ly1 = 0 and ly2 = -rows · y_dim · ½ ln 2π.
    fn gaussian_density_at_zero_residual() {
        // Arrange
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let model = ObservationModel::new(ObservationKind::Gaussian, 2, 3, &mut rng);
        let x = latent();
        let y = model.linear_predictor(&x);

        // Act
        let density = model.log_density(&y, &x).expect("valid shapes");

        // Assert
        assert!(density.ly1.abs() < 1e-12);
        assert!((density.ly2 + 6.0 * 3.0 * 0.5 * LN_2PI).abs() < 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Verify `grad_x` against central differences for both families.
    //
    // Given
    // -----
    // - Seeded read-outs with non-zero offsets and count data.
    //
    // Expect
    // ------
    // - Agreement within 1e-5.
    fn grad_x_matches_finite_differences() {
        for kind in [ObservationKind::Gaussian, ObservationKind::Poisson] {
            // Arrange
            let mut model = ObservationModel::new(kind, 2, 3, &mut ChaCha8Rng::seed_from_u64(2));
            let y = counts();
            model.seed_offset(&y).expect("valid data");
            let x = latent();
            let h = 1e-6;

            // Act
            let grad = model.grad_x(&y, &x).expect("valid shapes");

            // Assert
            for (idx, &g) in grad.indexed_iter() {
                let mut xp = x.clone();
                let mut xm = x.clone();
                xp[idx] += h;
                xm[idx] -= h;
                let fd = (model.log_density(&y, &xp).expect("ok").total
                    - model.log_density(&y, &xm).expect("ok").total)
                    / (2.0 * h);
                assert!((fd - g).abs() < 1e-5, "{kind:?} {idx:?}: {fd} vs {g}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure a small ascent step does not decrease the log density.
    //
    // Given
    // -----
    // - Both families, step size 1e-2.
    //
    // Expect
    // ------
    // - log density after ≥ before.
    fn adapt_step_increases_log_density() {
        for kind in [ObservationKind::Gaussian, ObservationKind::Poisson] {
            // Arrange
            let mut model = ObservationModel::new(kind, 2, 3, &mut ChaCha8Rng::seed_from_u64(3));
            let y = counts();
            let x = latent();
            let before = model.log_density(&y, &x).expect("ok").total;

            // Act
            model.adapt(&y, &x, 1e-2).expect("valid shapes");

            // Assert
            let after = model.log_density(&y, &x).expect("ok").total;
            assert!(after >= before, "{kind:?}: {after} < {before}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Check shape and count validation.
    //
    // Given
    // -----
    // - Mismatched bins; negative counts for a Poisson model.
    //
    // Expect
    // ------
    // - `BatchShapeMismatch { what: "time bins", .. }` and `InvalidOption`.
    fn rejects_misaligned_or_negative_data() {
        // Arrange
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let model = ObservationModel::new(ObservationKind::Poisson, 2, 3, &mut rng);
        let x = latent();
        let short = Array3::<f64>::zeros((2, 2, 3));
        let negative = Array3::from_elem((2, 3, 3), -1.0);

        // Act / Assert
        assert!(matches!(
            model.log_density(&short, &x),
            Err(LatentError::BatchShapeMismatch { what: "time bins", .. })
        ));
        assert!(matches!(
            model.grad_x(&negative, &x),
            Err(LatentError::InvalidOption { name: "observations", .. })
        ));
    }
}
