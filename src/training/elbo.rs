//! ELBO objective: `cost = -(LogDensity + Entropy)`.
//!
//! Purpose
//! -------
//! Combine the chain log density of a posterior sample, the observation log
//! density and the posterior entropy into the variational cost, and expose
//! the part that depends on the evolution parameters as a
//! [`LogDensityObjective`] over `θ` so the optimizer stack applies.
//!
//! Key behaviors
//! -------------
//! - [`ElboObjective::evaluate`] returns an [`ElboValue`] breakdown.
//! - [`BatchElbo`] fixes a sample, its identities and the θ-independent
//!   terms (`offset = observation + entropy`) and implements
//!   [`LogDensityObjective`] with an analytic gradient. While computing that
//!   gradient it also records `∂LogDensity_chain/∂X`, retrievable with
//!   [`BatchElbo::take_state_grad`].
//!
//! Invariants & assumptions
//! ------------------------
//! - The sample is held fixed while differentiating with respect to `θ`.
//! - The observation term never uses the flow-blended transition; only the
//!   chain term depends on `with_inflow`.
use std::cell::RefCell;

use ndarray::{Array3, ArrayView3};

use crate::{
    latent::{
        core::{data::ObservationBatch, params::EvolutionParams},
        errors::LatentResult,
        models::{ChainDensity, ChainLogDensity, LatentEvolution},
    },
    optimization::{
        elbo_optimizer::{Cost, Grad, LogDensityObjective, Theta, validation::validate_theta},
        errors::{OptError, OptResult},
    },
    training::{collaborators::PosteriorSample, observation::{ObservationDensity, ObservationModel}},
};

/// ELBO breakdown for one posterior sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ElboValue {
    pub chain: ChainDensity,
    pub observation: ObservationDensity,
    pub entropy: f64,
    /// `chain.total() + observation.total`.
    pub log_density: f64,
    /// `-(log_density + entropy)`.
    pub cost: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ElboObjective<'a> {
    pub evolution: &'a LatentEvolution,
    pub observation: &'a ObservationModel,
    pub with_inflow: bool,
}

impl<'a> ElboObjective<'a> {
    pub fn new(
        evolution: &'a LatentEvolution, observation: &'a ObservationModel, with_inflow: bool,
    ) -> Self {
        Self { evolution, observation, with_inflow }
    }

    /// Evaluate the ELBO for `sample` with the given posterior entropy.
    ///
    /// # Errors
    /// Any shape, identity or covariance error from the chain or
    /// observation density.
    pub fn evaluate(
        &self, y: &ObservationBatch, sample: &PosteriorSample, entropy: f64,
    ) -> LatentResult<ElboValue> {
        let chain =
            self.evolution.log_density_on_batch(sample.sample.view(), &y.ids, self.with_inflow)?;
        let observation = self.observation.log_density(&y.data, &sample.sample)?;
        let log_density = chain.total() + observation.total;
        Ok(ElboValue { chain, observation, entropy, log_density, cost: -(log_density + entropy) })
    }

    /// θ-objective for `sample`, with the θ-independent terms of `value`.
    pub fn batch<'b>(
        &self, y: &'b ObservationBatch, sample: &'b PosteriorSample, value: &ElboValue,
    ) -> BatchElbo<'b>
    where
        'a: 'b,
    {
        BatchElbo::new(
            self.evolution.chain(),
            &self.evolution.params,
            sample.sample.view(),
            &y.ids,
            self.with_inflow,
            value.observation.total + value.entropy,
        )
    }
}

/// The ELBO as a function of the evolution parameters for a fixed sample.
///
/// `value(θ) = ChainLogDensity(θ).total() + offset`.
#[derive(Debug)]
pub struct BatchElbo<'a> {
    chain: ChainLogDensity,
    template: &'a EvolutionParams,
    x: ArrayView3<'a, f64>,
    ids: &'a [usize],
    with_inflow: bool,
    offset: f64,
    state_grad: RefCell<Option<Array3<f64>>>,
}

impl<'a> BatchElbo<'a> {
    pub fn new(
        chain: ChainLogDensity, template: &'a EvolutionParams, x: ArrayView3<'a, f64>,
        ids: &'a [usize], with_inflow: bool, offset: f64,
    ) -> Self {
        Self { chain, template, x, ids, with_inflow, offset, state_grad: RefCell::new(None) }
    }

    /// `∂ChainLogDensity/∂X` from the most recent [`LogDensityObjective::grad`] call.
    pub fn take_state_grad(&self) -> Option<Array3<f64>> {
        self.state_grad.borrow_mut().take()
    }

    fn params_at(&self, theta: &Theta) -> OptResult<EvolutionParams> {
        Ok(self.template.with_theta(theta)?)
    }
}

impl LogDensityObjective for BatchElbo<'_> {
    type Data = ();

    fn value(&self, theta: &Theta, _data: &()) -> OptResult<Cost> {
        let params = self.params_at(theta)?;
        let density = self.chain.on_batch(&params, self.x, self.ids, self.with_inflow)?;
        Ok(density.total() + self.offset)
    }

    fn check(&self, theta: &Theta, _data: &()) -> OptResult<()> {
        let expected = self.template.n_params();
        if theta.len() != expected {
            return Err(OptError::ThetaLengthMismatch { expected, actual: theta.len() });
        }
        validate_theta(theta)
    }

    fn grad(&self, theta: &Theta, _data: &()) -> OptResult<Grad> {
        let params = self.params_at(theta)?;
        let (_, grad) = self.chain.with_grad(&params, self.x, self.ids, self.with_inflow)?;
        *self.state_grad.borrow_mut() = Some(grad.states);
        Ok(grad.params.to_theta())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        latent::core::{options::EvolutionOptions, shape::LatentShape},
        optimization::elbo_optimizer::{ArgMinAdapter, finite_diff::fd_gradient},
        training::{
            collaborators::{PosteriorVariant, Recognition},
            observation::ObservationKind,
            recognition::{MeanFieldRecognition, RecognitionOptions},
        },
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The cost identity `cost = -(chain + observation + entropy)`.
    // - Adapter sign conventions and the analytic θ-gradient vs finite
    //   differences of the adapter cost.
    // - Recording of the state gradient.
    // -------------------------------------------------------------------------

    struct Fixture {
        evolution: LatentEvolution,
        observation: ObservationModel,
        y: ObservationBatch,
        sample: PosteriorSample,
        entropy: f64,
    }

    fn fixture() -> Fixture {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let shape = LatentShape::new(2, 1, 2).expect("valid shape");
        let opts =
            EvolutionOptions { hidden_width: 4, seed: Some(2), ..EvolutionOptions::default() };
        let evolution = LatentEvolution::new(shape, opts).expect("valid model");
        let observation = ObservationModel::new(ObservationKind::Gaussian, 2, 3, &mut rng);
        let data = Array3::from_shape_fn((2, 4, 3), |(i, t, k)| ((i + 2 * t + k) as f64).sin());
        let y = ObservationBatch::new(data, Some(vec![1, 0]), 2).expect("valid batch");
        let rec = MeanFieldRecognition::new(3, 2, RecognitionOptions::default(), &mut rng)
            .expect("valid options");
        let mean = rec.posterior_mean(&y).expect("valid observations");
        let sample = rec
            .posterior_sample(&y, &mean, &evolution, PosteriorVariant::NoGradTerm, &mut rng)
            .expect("valid inputs");
        let entropy = rec.entropy(&y, &sample);
        Fixture { evolution, observation, y, sample, entropy }
    }

    #[test]
    // Purpose
    // -------
    // Verify the cost identity and that the adapter cost equals the ELBO cost.
    //
    // Given
    // -----
    // - A seeded posterior sample and Gaussian read-out.
    //
    // Expect
    // ------
    // - cost = -(chain + observation + entropy) and
    //   `ArgMinAdapter::checked_cost(θ)` equals it.
    fn cost_identity_and_adapter_cost_agree() {
        // Arrange
        let f = fixture();
        let objective = ElboObjective::new(&f.evolution, &f.observation, false);

        // Act
        let value = objective.evaluate(&f.y, &f.sample, f.entropy).expect("valid inputs");
        let batch = objective.batch(&f.y, &f.sample, &value);
        let cost = ArgMinAdapter::new(&batch, &())
            .checked_cost(&f.evolution.params.to_theta())
            .expect("finite cost");

        // Assert
        let expected = -(value.chain.total() + value.observation.total + f.entropy);
        assert!((value.cost - expected).abs() < 1e-10);
        assert!((cost - value.cost).abs() < 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Check the adapter's analytic cost gradient against finite differences
    // and that the state gradient is recorded.
    //
    // Given
    // -----
    // - The fixture with the flow blend enabled.
    //
    // Expect
    // ------
    // - Agreement within 1e-4 · max(1, |g|); a `[2, 4, 2]` state gradient.
    fn adapter_gradient_matches_finite_differences() {
        // Arrange
        let f = fixture();
        let objective = ElboObjective::new(&f.evolution, &f.observation, true);
        let value = objective.evaluate(&f.y, &f.sample, f.entropy).expect("valid inputs");
        let batch = objective.batch(&f.y, &f.sample, &value);
        let adapter = ArgMinAdapter::new(&batch, &());
        let theta = f.evolution.params.to_theta();

        // Act
        let analytic = adapter.checked_gradient(&theta).expect("valid gradient");
        let numeric = fd_gradient(&theta, |t: &Theta| adapter.checked_cost(t)).expect("fd");
        let state_grad = batch.take_state_grad();

        // Assert
        for (k, (a, n)) in analytic.iter().zip(numeric.iter()).enumerate() {
            assert!((a - n).abs() < 1e-4 * n.abs().max(1.0), "θ[{k}]: {a} vs {n}");
        }
        assert_eq!(state_grad.map(|g| g.dim()), Some((2, 4, 2)));
        assert!(batch.take_state_grad().is_none());
    }

    #[test]
    // Purpose
    // -------
    // Ensure θ of the wrong length is rejected before evaluation.
    //
    // Given
    // -----
    // - θ with one entry.
    //
    // Expect
    // ------
    // - `ThetaLengthMismatch`.
    fn rejects_wrong_theta_length() {
        // Arrange
        let f = fixture();
        let objective = ElboObjective::new(&f.evolution, &f.observation, false);
        let value = objective.evaluate(&f.y, &f.sample, f.entropy).expect("valid inputs");
        let batch = objective.batch(&f.y, &f.sample, &value);

        // Act
        let result = ArgMinAdapter::new(&batch, &()).checked_gradient(&Theta::zeros(1));

        // Assert
        match result {
            Err(OptError::ThetaLengthMismatch { actual, .. }) => assert_eq!(actual, 1),
            other => panic!("Expected ThetaLengthMismatch, got {other:?}"),
        }
    }
}
