//! ChainLogDensity — Gaussian Markov-chain log density of latent trajectories.
//!
//! Purpose
//! -------
//! Score latent trajectories under the locally-linear dynamics
//!
//! ```text
//! x_0     ~ N(x0, Q0)
//! x_{t+1} ~ N(x_t · M(x_t), Q)      M = A or A_inflow
//! ```
//!
//! and return the log density per trial together with its components, plus
//! (on request) the exact gradient with respect to the parameters and the
//! trajectories.
//!
//! Key behaviors
//! -------------
//! - Components, with `e = x_0 - x0`, `r_t = x_{t+1} - x_t · M_t`:
//!   - `lx0 = -½ eᵀ Q0⁻¹ e` (per trial)
//!   - `lx1 = -½ Σ_t r_tᵀ Q⁻¹ r_t` (per trial)
//!   - `lx2 = ½ log det Q0⁻¹`
//!   - `lx3 = ½ (T-1) log det Q⁻¹`
//!   - `lx4 = -½ T d ln 2π`
//! - `per_trial = lx0 + lx1 + lx2 + lx3 + lx4`; the training cost sums it.
//! - The transition of the last bin never enters the density.
//!
//! Invariants & assumptions
//! ------------------------
//! - Noise factors must give finite, non-degenerate covariances; otherwise
//!   `DegenerateCovariance` is returned before anything is evaluated.
//! - Gradients are of the *summed* density `Σ_trials per_trial`.
use ndarray::{Array1, Array2, Array3, Array4, ArrayView2, ArrayView3, Axis, s};

use crate::{
    latent::{
        core::{covariance::NoiseCovariance, params::EvolutionParams},
        errors::LatentResult,
        models::evolution::{EvolutionNetwork, EvolutionOutput},
    },
    optimization::numerical_stability::LN_2PI,
};

/// Log density of a batch of trajectories and its components.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainDensity {
    pub per_trial: Array1<f64>,
    pub lx0: Array1<f64>,
    pub lx1: Array1<f64>,
    pub lx2: f64,
    pub lx3: f64,
    pub lx4: f64,
}

impl ChainDensity {
    /// Summed log density over trials.
    pub fn total(&self) -> f64 {
        self.per_trial.sum()
    }
}

/// Gradient of [`ChainDensity::total`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChainGradient {
    pub params: EvolutionParams,
    /// `[trials, bins, x_dim]`.
    pub states: Array3<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChainLogDensity {
    pub network: EvolutionNetwork,
}

struct Forward {
    density: ChainDensity,
    evolution: EvolutionOutput,
    q: NoiseCovariance,
    q0: NoiseCovariance,
}

impl ChainLogDensity {
    pub fn new(network: EvolutionNetwork) -> Self {
        Self { network }
    }

    /// Log density of `x` with one identity per trial.
    pub fn on_batch(
        &self, params: &EvolutionParams, x: ArrayView3<'_, f64>, ids: &[usize], with_inflow: bool,
    ) -> LatentResult<ChainDensity> {
        Ok(self.forward(params, x, ids, with_inflow)?.density)
    }

    /// Log density of one `[bins, x_dim]` path evaluated under every entity.
    pub fn shared(
        &self, params: &EvolutionParams, path: ArrayView2<'_, f64>, with_inflow: bool,
    ) -> LatentResult<ChainDensity> {
        let (t, d) = path.dim();
        let n = params.shape.num_entities;
        let tiled = Array3::from_shape_fn((n, t, d), |(_, step, j)| path[[step, j]]);
        let ids: Vec<usize> = (0..n).collect();
        self.on_batch(params, tiled.view(), &ids, with_inflow)
    }

    /// Density plus the gradient of its total.
    pub fn with_grad(
        &self, params: &EvolutionParams, x: ArrayView3<'_, f64>, ids: &[usize], with_inflow: bool,
    ) -> LatentResult<(ChainDensity, ChainGradient)> {
        let fwd = self.forward(params, x, ids, with_inflow)?;
        let (n, t, d) = x.dim();
        let m = fwd.evolution.transition(with_inflow);

        let mut grad_x = Array3::zeros((n, t, d));
        let mut grad_m = Array4::zeros((n, t, d, d));
        let mut grad_x0 = Array1::zeros(d);
        let mut scatter_e = Array2::zeros((d, d));
        let mut scatter_r = Array2::zeros((d, d));

        for i in 0..n {
            let e = &x.slice(s![i, 0, ..]) - &params.x0;
            let v = fwd.q0.inv.dot(&e);
            grad_x0 += &v;
            let mut g0 = grad_x.slice_mut(s![i, 0, ..]);
            g0 -= &v;
            scatter_e += &outer(&e, &e);

            for step in 0..t.saturating_sub(1) {
                let xt = x.slice(s![i, step, ..]);
                let mt = m.slice(s![i, step, .., ..]);
                let r = &x.slice(s![i, step + 1, ..]) - &xt.dot(&mt);
                let u = fwd.q.inv.dot(&r);
                let mut g_next = grad_x.slice_mut(s![i, step + 1, ..]);
                g_next -= &u;
                let mut g_now = grad_x.slice_mut(s![i, step, ..]);
                g_now += &mt.dot(&u);
                grad_m.slice_mut(s![i, step, .., ..]).assign(&outer(&xt.to_owned(), &u));
                scatter_r += &outer(&r, &r);
            }
        }

        let (mut grads, grad_x_net) =
            self.network.backward(params, &fwd.evolution, x, &grad_m, with_inflow);
        grad_x += &grad_x_net;

        let nf = n as f64;
        grads.q_inv_chol = fwd.q.inv_chol_inv_t * (nf * (t as f64 - 1.0))
            - scatter_r.dot(&params.q_inv_chol);
        grads.q0_inv_chol = fwd.q0.inv_chol_inv_t * nf - scatter_e.dot(&params.q0_inv_chol);
        grads.x0 = grad_x0;

        Ok((fwd.density, ChainGradient { params: grads, states: grad_x }))
    }

    fn forward(
        &self, params: &EvolutionParams, x: ArrayView3<'_, f64>, ids: &[usize], with_inflow: bool,
    ) -> LatentResult<Forward> {
        let q = params.process_noise()?;
        let q0 = params.initial_noise()?;
        let evolution = self.network.evaluate_on_batch(params, x, ids)?;
        let m = evolution.transition(with_inflow);
        let (n, t, d) = x.dim();

        let mut lx0 = Array1::zeros(n);
        let mut lx1 = Array1::zeros(n);
        for (i, trial) in x.axis_iter(Axis(0)).enumerate() {
            let e = &trial.row(0) - &params.x0;
            lx0[i] = -0.5 * e.dot(&q0.inv.dot(&e));
            for step in 0..t - 1 {
                let pred = trial.row(step).dot(&m.slice(s![i, step, .., ..]));
                let r = &trial.row(step + 1) - &pred;
                lx1[i] -= 0.5 * r.dot(&q.inv.dot(&r));
            }
        }
        let lx2 = 0.5 * q0.log_det_inv;
        let lx3 = 0.5 * (t as f64 - 1.0) * q.log_det_inv;
        let lx4 = -0.5 * (t * d) as f64 * LN_2PI;
        let per_trial = &lx0 + &lx1 + (lx2 + lx3 + lx4);

        Ok(Forward {
            density: ChainDensity { per_trial, lx0, lx1, lx2, lx3, lx4 },
            evolution,
            q,
            q0,
        })
    }
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(j, k)| a[j] * b[k])
}
