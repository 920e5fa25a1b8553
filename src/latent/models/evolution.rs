//! EvolutionNetwork — state-dependent transition matrices with flow blending.
//!
//! Purpose
//! -------
//! Map a batch of latent states (augmented with each trial's entity
//! parameters) to transition matrices
//!
//! - `B(x)`: output of the two-layer network, reshaped to `x_dim × x_dim`,
//! - `A(x) = alpha · B(x) + Alinear`,
//! - `A_inflow(x) = w · A(x) + 0.9 · (1 - w) · I` with `w` the flow weight of
//!   `‖x‖`,
//!
//! and propagate gradients with respect to those matrices back into the
//! parameters and the states.
//!
//! Key behaviors
//! -------------
//! - [`EvolutionNetwork::evaluate_on_batch`]: explicit identities, one per trial.
//! - [`EvolutionNetwork::evaluate_shared`]: one trajectory broadcast across
//!   every entity of the table.
//! - [`EvolutionNetwork::backward`]: vector–Jacobian product through the
//!   network, the mixing coefficient and (optionally) the flow blend.
//! - [`EvolutionNetwork::next_states`]: one-step predictions `x_t · A(x_t)`
//!   for a single trial.
//! - [`EvolutionNetwork::transition_jacobians`]: `∂vec(A)/∂x` per state.
//!
//! Invariants & assumptions
//! ------------------------
//! - Outputs have shape `[trials, bins, x_dim, x_dim]`; `B` is reshaped
//!   row-major (`B[j, k] = out[j · x_dim + k]`).
//! - The flow weight uses the norm of the first `x_dim` coordinates only.
//! - Nothing is cached between calls; the forward cache lives in the
//!   returned [`EvolutionOutput`].
use ndarray::{Array1, Array2, Array3, Array4, ArrayView1, ArrayView2, ArrayView3, Axis, s};
use serde::{Deserialize, Serialize};

use crate::latent::{
    core::{
        flow::{FlowModulator, INFLOW_CONTRACTION},
        params::EvolutionParams,
        validation::{validate_ids, validate_trajectories},
    },
    errors::{LatentError, LatentResult},
};

/// Transition tensors for one batch, plus the forward cache used by
/// [`EvolutionNetwork::backward`].
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionOutput {
    pub a: Array4<f64>,
    pub a_inflow: Array4<f64>,
    pub b: Array4<f64>,
    /// Flow weight per (trial, bin).
    pub weights: Array2<f64>,
    /// State norm per (trial, bin).
    pub norms: Array2<f64>,
    pub ids: Vec<usize>,
    inputs: Array2<f64>,
    hidden: Array2<f64>,
    raw_out: Array2<f64>,
}

impl EvolutionOutput {
    /// The transition actually used for dynamics.
    pub fn transition(&self, with_inflow: bool) -> &Array4<f64> {
        if with_inflow { &self.a_inflow } else { &self.a }
    }
}

/// Flow field of one entity on a 2-D lattice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowField {
    pub entity: usize,
    /// `[points, 2]` lattice points.
    pub points: Array2<f64>,
    /// `[points, 2]` one-step predictions from each point.
    pub next: Array2<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EvolutionNetwork {
    pub flow: FlowModulator,
}

impl EvolutionNetwork {
    pub fn new(flow: FlowModulator) -> Self {
        Self { flow }
    }

    /// Evaluate transitions for a batch with one identity per trial.
    ///
    /// Errors
    /// ------
    /// - `EmptyBatch`, `StateDimMismatch`, `NonFiniteData` for bad states.
    /// - `IdsLengthMismatch` if `ids.len()` differs from the number of trials.
    /// - `UnknownEntity` for an id outside the entity table.
    pub fn evaluate_on_batch(
        &self, params: &EvolutionParams, states: ArrayView3<'_, f64>, ids: &[usize],
    ) -> LatentResult<EvolutionOutput> {
        validate_trajectories("states", &states, params.shape.x_dim)?;
        validate_ids(ids, states.len_of(Axis(0)), params.shape.num_entities)?;
        Ok(self.forward(params, states, ids))
    }

    /// Broadcast one `[bins, x_dim]` trajectory across every entity.
    ///
    /// The output batch has `num_entities` trials, trial `e` using entity `e`.
    pub fn evaluate_shared(
        &self, params: &EvolutionParams, path: ArrayView2<'_, f64>,
    ) -> LatentResult<EvolutionOutput> {
        let tiled = tile_path(path, params.shape.num_entities);
        let ids: Vec<usize> = (0..params.shape.num_entities).collect();
        self.evaluate_on_batch(params, tiled.view(), &ids)
    }

    /// Transition matrix for a single state.
    pub fn transition_at(
        &self, params: &EvolutionParams, state: &Array1<f64>, entity: usize, with_inflow: bool,
    ) -> LatentResult<Array2<f64>> {
        let d = params.shape.x_dim;
        let states = state.view().into_shape((1, 1, d)).map_err(|_| {
            LatentError::StateDimMismatch { expected: d, found: state.len() }
        })?;
        let out = self.evaluate_on_batch(params, states, &[entity])?;
        Ok(out.transition(with_inflow).slice(s![0, 0, .., ..]).to_owned())
    }

    /// One-step predictions `x_t · A(x_t)` for every bin of a single trial.
    ///
    /// Errors
    /// ------
    /// - `SingleTrialRequired` unless `states` holds exactly one trial.
    /// - Any error of [`EvolutionNetwork::evaluate_on_batch`].
    pub fn next_states(
        &self, params: &EvolutionParams, states: ArrayView3<'_, f64>, entity: usize,
        with_inflow: bool,
    ) -> LatentResult<Array2<f64>> {
        let batch = states.len_of(Axis(0));
        if batch != 1 {
            return Err(LatentError::SingleTrialRequired { batch });
        }
        let out = self.evaluate_on_batch(params, states, &[entity])?;
        let m = out.transition(with_inflow);
        let (_, t, d) = states.dim();
        let mut next = Array2::zeros((t, d));
        for step in 0..t {
            let x: ArrayView1<'_, f64> = states.slice(s![0, step, ..]);
            let mt: ArrayView2<'_, f64> = m.slice(s![0, step, .., ..]);
            let row: Array1<f64> = x.dot(&mt);
            next.row_mut(step).assign(&row);
        }
        Ok(next)
    }

    /// Flow field of `entity` on an `n × n` lattice over `[-range, range]²`.
    ///
    /// Errors
    /// ------
    /// - `StateDimMismatch` unless `x_dim == 2`.
    pub fn flow_field(
        &self, params: &EvolutionParams, entity: usize, range: f64, n: usize,
    ) -> LatentResult<FlowField> {
        if params.shape.x_dim != 2 {
            return Err(LatentError::StateDimMismatch { expected: 2, found: params.shape.x_dim });
        }
        let points = lattice_2d(range, n);
        let as_trial = points.clone().insert_axis(Axis(0));
        let next = self.next_states(params, as_trial.view(), entity, true)?;
        Ok(FlowField { entity, points, next })
    }

    /// `∂vec(A)/∂x` for every (trial, bin), shape `[trials, bins, x_dim², x_dim]`.
    ///
    /// Differentiates `A = alpha · B + Alinear` through the network with
    /// respect to the state coordinates of the input (not the flow blend).
    pub fn transition_jacobians(
        &self, params: &EvolutionParams, states: ArrayView3<'_, f64>, ids: &[usize],
    ) -> LatentResult<Array4<f64>> {
        let out = self.evaluate_on_batch(params, states, ids)?;
        let (n, t, d) = states.dim();
        let w1x = params.hidden.weights.slice(s![..d, ..]);
        let w2t = params.output.weights.t();
        let mut jac = Array4::zeros((n, t, d * d, d));
        for (row, h) in out.hidden.axis_iter(Axis(0)).enumerate() {
            // (diag(h) - h hᵀ) W1xᵀ
            let w1x_t = w1x.t();
            let hw = h.dot(&w1x_t);
            let mut tmp = Array2::zeros((h.len(), d));
            for (k, mut tmp_row) in tmp.axis_iter_mut(Axis(0)).enumerate() {
                tmp_row.assign(&((&w1x_t.row(k) - &hw) * h[k]));
            }
            let j = w2t.dot(&tmp) * params.alpha;
            jac.slice_mut(s![row / t, row % t, .., ..]).assign(&j);
        }
        Ok(jac)
    }

    /// Backpropagate `∂L/∂M` for the transition `M` (`A` or `A_inflow`).
    ///
    /// Parameters
    /// ----------
    /// - `params`: the parameters used for `out`.
    /// - `out`: forward result for `states`.
    /// - `states`: the evaluated batch.
    /// - `grad_m`: upstream gradient, shape `[trials, bins, x_dim, x_dim]`.
    /// - `with_inflow`: whether `M = A_inflow` (adds the path through `w(‖x‖)`).
    ///
    /// Returns
    /// -------
    /// `(∂L/∂params, ∂L/∂states)`. The noise factors and `x0` blocks of the
    /// parameter gradient are zero.
    pub fn backward(
        &self, params: &EvolutionParams, out: &EvolutionOutput, states: ArrayView3<'_, f64>,
        grad_m: &Array4<f64>, with_inflow: bool,
    ) -> (EvolutionParams, Array3<f64>) {
        let (n, t, d) = states.dim();
        let mut grads = params.zeros_like();
        let mut grad_states = Array3::zeros((n, t, d));

        let grad_a = if with_inflow {
            let mut grad_a = grad_m.clone();
            for i in 0..n {
                for step in 0..t {
                    let w = out.weights[[i, step]];
                    let gm = grad_m.slice(s![i, step, .., ..]);
                    let a = out.a.slice(s![i, step, .., ..]);
                    let mut dw = 0.0;
                    for ((j, k), &g) in gm.indexed_iter() {
                        let eye = if j == k { INFLOW_CONTRACTION } else { 0.0 };
                        dw += g * (a[[j, k]] - eye);
                    }
                    let norm = out.norms[[i, step]];
                    if norm > 0.0 {
                        let scale = dw * self.flow.derivative(norm) / norm;
                        let x = states.slice(s![i, step, ..]);
                        grad_states.slice_mut(s![i, step, ..]).scaled_add(scale, &x);
                    }
                    grad_a.slice_mut(s![i, step, .., ..]).mapv_inplace(|g| g * w);
                }
            }
            grad_a
        } else {
            grad_m.clone()
        };

        grads.alpha = (&grad_a * &out.b).sum();
        for mat in grad_a.outer_iter() {
            for block in mat.outer_iter() {
                grads.a_linear += &block;
            }
        }

        let rows = n * t;
        let grad_raw = Array2::from_shape_fn((rows, d * d), |(row, c)| {
            params.alpha * grad_a[[row / t, row % t, c / d, c % d]]
        });
        let (out_grad, grad_hidden) =
            params.output.backward(out.hidden.view(), out.raw_out.view(), grad_raw.view());
        let (hid_grad, grad_inputs) =
            params.hidden.backward(out.inputs.view(), out.hidden.view(), grad_hidden.view());
        grads.output.weights = out_grad.weights;
        grads.output.bias = out_grad.bias;
        grads.hidden.weights = hid_grad.weights;
        grads.hidden.bias = hid_grad.bias;

        for (row, g) in grad_inputs.axis_iter(Axis(0)).enumerate() {
            let (i, step) = (row / t, row % t);
            let mut gs = grad_states.slice_mut(s![i, step, ..]);
            gs += &g.slice(s![..d]);
            let mut ge = grads.entity_params.row_mut(out.ids[i]);
            ge += &g.slice(s![d..]);
        }
        (grads, grad_states)
    }

    fn forward(
        &self, params: &EvolutionParams, states: ArrayView3<'_, f64>, ids: &[usize],
    ) -> EvolutionOutput {
        let (n, t, d) = states.dim();
        let p = params.shape.p_dim;
        let rows = n * t;

        let mut inputs = Array2::zeros((rows, d + p));
        for (row, mut input) in inputs.axis_iter_mut(Axis(0)).enumerate() {
            let (i, step) = (row / t, row % t);
            input.slice_mut(s![..d]).assign(&states.slice(s![i, step, ..]));
            input.slice_mut(s![d..]).assign(&params.entity_params.row(ids[i]));
        }
        let hidden = params.hidden.apply(inputs.view());
        let raw_out = params.output.apply(hidden.view());

        let b = Array4::from_shape_fn((n, t, d, d), |(i, step, j, k)| {
            raw_out[[i * t + step, j * d + k]]
        });
        let a = &b * params.alpha + &params.a_linear;

        let norms = Array2::from_shape_fn((n, t), |(i, step)| {
            states.slice(s![i, step, ..]).iter().map(|v| v * v).sum::<f64>().sqrt()
        });
        let weights = norms.mapv(|norm| self.flow.weight(norm));
        let a_inflow = Array4::from_shape_fn((n, t, d, d), |(i, step, j, k)| {
            let w = weights[[i, step]];
            let eye = if j == k { INFLOW_CONTRACTION } else { 0.0 };
            w * a[[i, step, j, k]] + (1.0 - w) * eye
        });

        EvolutionOutput { a, a_inflow, b, weights, norms, ids: ids.to_vec(), inputs, hidden, raw_out }
    }
}

/// `n × n` lattice over `[-range, range]²`, flattened to `[n², 2]`.
///
/// Point `k` is `(g[k % n], g[k / n])` with `g = linspace(-range, range, n)`.
pub fn lattice_2d(range: f64, n: usize) -> Array2<f64> {
    let grid = Array1::linspace(-range, range, n);
    Array2::from_shape_fn((n * n, 2), |(k, c)| if c == 0 { grid[k % n] } else { grid[k / n] })
}

fn tile_path(path: ArrayView2<'_, f64>, copies: usize) -> Array3<f64> {
    let (t, d) = path.dim();
    Array3::from_shape_fn((copies, t, d), |(_, step, j)| path[[step, j]])
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
    // - Output shapes for explicit-id and shared evaluation.
    // - Flow-blend limits at tiny and huge state norms.
    // - Identity-list and single-trial preconditions.
    // - Backward pass and Jacobians against finite differences.
    //
    // They intentionally DO NOT cover:
    // - The chain density built on top (see `chain`).
    // -------------------------------------------------------------------------

    fn params(x_dim: usize, p_dim: usize, entities: usize, seed: u64) -> EvolutionParams {
        let shape = LatentShape::new(x_dim, p_dim, entities).expect("valid shape");
        let opts = EvolutionOptions { hidden_width: 6, ..EvolutionOptions::default() };
        EvolutionParams::init(shape, &opts, &mut ChaCha8Rng::seed_from_u64(seed))
    }

    fn states(n: usize, t: usize, d: usize) -> Array3<f64> {
        Array3::from_shape_fn((n, t, d), |(i, s, j)| {
            0.3 * ((i + 1) as f64) * ((s as f64) * 0.7 + j as f64).sin() + 0.1
        })
    }

    #[test]
    // Purpose
    // -------
    // Verify all three tensors have shape [N, T, d, d] and A = alpha·B + Alinear.
    //
    // Given
    // -----
    // - 3 trials × 4 bins × 2 dims, two entities.
    //
    // Expect
    // ------
    // - Shapes (3, 4, 2, 2); A matches the formula elementwise.
    fn outputs_have_batch_transition_shape() {
        // Arrange
        let p = params(2, 1, 2, 1);
        let x = states(3, 4, 2);
        let net = EvolutionNetwork::default();

        // Act
        let out = net.evaluate_on_batch(&p, x.view(), &[0, 1, 1]).expect("valid batch");

        // Assert
        for tensor in [&out.a, &out.a_inflow, &out.b] {
            assert_eq!(tensor.dim(), (3, 4, 2, 2));
        }
        for ((i, s, j, k), a) in out.a.indexed_iter() {
            let expected = p.alpha * out.b[[i, s, j, k]] + p.a_linear[[j, k]];
            assert!((a - expected).abs() < 1e-14);
        }
    }

    #[test]
    // Purpose
    // -------
    // Check the flow blend: A_inflow → A for tiny norms with a steep
    // modulator, and → 0.9·I for huge norms.
    //
    // Given
    // -----
    // - A zero state with sharpness 1.0, and a state of norm 1e4 with the
    //   default modulator.
    //
    // Expect
    // ------
    // - A_inflow == A in the first case, == 0.9·I in the second.
    fn inflow_limits_at_small_and_large_norms() {
        // Arrange
        let p = params(2, 1, 1, 2);
        let steep = EvolutionNetwork::new(FlowModulator::new(30.0, 1.0));
        let default = EvolutionNetwork::default();
        let small = Array3::<f64>::zeros((1, 1, 2));
        let large = Array3::from_elem((1, 1, 2), 1e4);

        // Act
        let near = steep.evaluate_on_batch(&p, small.view(), &[0]).expect("valid");
        let far = default.evaluate_on_batch(&p, large.view(), &[0]).expect("valid");

        // Assert
        for (x, y) in near.a_inflow.iter().zip(near.a.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
        let expected = [0.9, 0.0, 0.0, 0.9];
        for (x, y) in far.a_inflow.iter().zip(expected.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure shared evaluation broadcasts one path across every entity.
    //
    // Given
    // -----
    // - One 3-bin path and three entities.
    //
    // Expect
    // ------
    // - Batch of 3 with ids [0, 1, 2], equal to explicit evaluation.
    fn shared_evaluation_broadcasts_across_entities() {
        // Arrange
        let p = params(2, 2, 3, 3);
        let path = states(1, 3, 2).index_axis(Axis(0), 0).to_owned();
        let net = EvolutionNetwork::default();
        let tiled = tile_path(path.view(), 3);

        // Act
        let shared = net.evaluate_shared(&p, path.view()).expect("valid path");
        let explicit = net.evaluate_on_batch(&p, tiled.view(), &[0, 1, 2]).expect("valid");

        // Assert
        assert_eq!(shared.ids, vec![0, 1, 2]);
        assert_eq!(shared.a, explicit.a);
    }

    #[test]
    // Purpose
    // -------
    // Verify identity and single-trial preconditions.
    //
    // Given
    // -----
    // - Two trials with one id; two trials passed to `next_states`.
    //
    // Expect
    // ------
    // - `IdsLengthMismatch` and `SingleTrialRequired { batch: 2 }`.
    fn preconditions_are_reported() {
        // Arrange
        let p = params(2, 1, 1, 4);
        let x = states(2, 3, 2);
        let net = EvolutionNetwork::default();

        // Act
        let ids = net.evaluate_on_batch(&p, x.view(), &[0]);
        let single = net.next_states(&p, x.view(), 0, true);

        // Assert
        assert_eq!(ids, Err(LatentError::IdsLengthMismatch { ids: 1, batch: 2 }));
        assert_eq!(single, Err(LatentError::SingleTrialRequired { batch: 2 }));
    }

    #[test]
    // Purpose
    // -------
    // Check `next_states` against an explicit row-vector product.
    //
    // Given
    // -----
    // - One trial of 3 bins.
    //
    // Expect
    // ------
    // - next[t] = x_t · A(x_t).
    fn next_states_apply_row_vector_transition() {
        // Arrange
        let p = params(2, 1, 1, 5);
        let x = states(1, 3, 2);
        let net = EvolutionNetwork::default();
        let out = net.evaluate_on_batch(&p, x.view(), &[0]).expect("valid");

        // Act
        let next = net.next_states(&p, x.view(), 0, false).expect("single trial");

        // Assert
        for t in 0..3 {
            for k in 0..2 {
                let expected: f64 = (0..2).map(|j| x[[0, t, j]] * out.a[[0, t, j, k]]).sum();
                assert!((next[[t, k]] - expected).abs() < 1e-14);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the backward pass against finite differences for parameters and
    // states, with and without the flow blend.
    //
    // Given
    // -----
    // - Loss L = Σ G ⊙ M for a fixed random-looking G.
    //
    // Expect
    // ------
    // - Analytic and central-difference gradients agree within 1e-6.
    fn backward_matches_finite_differences() {
        for with_inflow in [false, true] {
            // Arrange
            let p = params(2, 1, 2, 6);
            let x = states(2, 3, 2) * 20.0;
            let ids = [1, 0];
            let net = EvolutionNetwork::default();
            let g = Array4::from_shape_fn((2, 3, 2, 2), |(i, s, j, k)| {
                ((i + 2 * s + 3 * j + 5 * k) as f64 * 0.37).cos()
            });
            let loss = |pp: &EvolutionParams, xx: &Array3<f64>| {
                let out = net.evaluate_on_batch(pp, xx.view(), &ids).expect("valid");
                (out.transition(with_inflow) * &g).sum()
            };
            let out = net.evaluate_on_batch(&p, x.view(), &ids).expect("valid");
            let h = 1e-6;

            // Act
            let (grads, grad_x) = net.backward(&p, &out, x.view(), &g, with_inflow);

            // Assert
            let theta = p.to_theta();
            let analytic = grads.to_theta();
            for k in 0..theta.len() {
                let mut plus = theta.clone();
                let mut minus = theta.clone();
                plus[k] += h;
                minus[k] -= h;
                let fd = (loss(&p.with_theta(&plus).expect("θ"), &x)
                    - loss(&p.with_theta(&minus).expect("θ"), &x))
                    / (2.0 * h);
                assert!((fd - analytic[k]).abs() < 1e-6, "θ[{k}]: fd {fd} vs {}", analytic[k]);
            }
            for ((i, s, j), &ga) in grad_x.indexed_iter() {
                let mut xp = x.clone();
                let mut xm = x.clone();
                xp[[i, s, j]] += h;
                xm[[i, s, j]] -= h;
                let fd = (loss(&p, &xp) - loss(&p, &xm)) / (2.0 * h);
                assert!((fd - ga).abs() < 1e-6, "x[{i},{s},{j}]: fd {fd} vs {ga}");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Check transition Jacobians against finite differences of A.
    //
    // Given
    // -----
    // - One trial of two bins.
    //
    // Expect
    // ------
    // - ∂A[j,k]/∂x_c within 1e-6 of the central difference.
    fn transition_jacobians_match_finite_differences() {
        // Arrange
        let p = params(2, 1, 1, 7);
        let x = states(1, 2, 2);
        let net = EvolutionNetwork::default();
        let h = 1e-6;

        // Act
        let jac = net.transition_jacobians(&p, x.view(), &[0]).expect("valid");

        // Assert
        assert_eq!(jac.dim(), (1, 2, 4, 2));
        for s in 0..2 {
            for c in 0..2 {
                let mut xp = x.clone();
                let mut xm = x.clone();
                xp[[0, s, c]] += h;
                xm[[0, s, c]] -= h;
                let ap = net.evaluate_on_batch(&p, xp.view(), &[0]).expect("valid").a;
                let am = net.evaluate_on_batch(&p, xm.view(), &[0]).expect("valid").a;
                for j in 0..2 {
                    for k in 0..2 {
                        let fd = (ap[[0, s, j, k]] - am[[0, s, j, k]]) / (2.0 * h);
                        assert!((fd - jac[[0, s, 2 * j + k, c]]).abs() < 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the lattice layout and the flow field dimension guard.
    //
    // Given
    // -----
    // - A 3 × 3 lattice over [-1, 1]², and a 3-D model.
    //
    // Expect
    // ------
    // - Point 5 = (1, 0); flow fields require x_dim == 2.
    fn lattice_layout_and_flow_field_guard() {
        // Arrange
        let lattice = lattice_2d(1.0, 3);
        let p3 = params(3, 1, 1, 8);
        let p2 = params(2, 1, 1, 8);
        let net = EvolutionNetwork::default();

        // Act
        let bad = net.flow_field(&p3, 0, 30.0, 4);
        let good = net.flow_field(&p2, 0, 30.0, 4).expect("2-D model");

        // Assert
        assert_eq!(lattice.dim(), (9, 2));
        assert_eq!((lattice[[5, 0]], lattice[[5, 1]]), (1.0, 0.0));
        assert!(matches!(bad, Err(LatentError::StateDimMismatch { expected: 2, found: 3 })));
        assert_eq!(good.next.dim(), (16, 2));
    }
}
