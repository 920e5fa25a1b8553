//! Trainable parameters of the locally-linear evolution model.
//!
//! Purpose
//! -------
//! Hold every trainable tensor of the evolution model in one explicit
//! struct that components receive by reference, and map it to and from the
//! flat optimizer vector `θ`.
//!
//! Key behaviors
//! -------------
//! - [`EvolutionParams::init`] creates the tensors once at construction:
//!   entity table and hidden weights Glorot-uniform, output weights uniform
//!   in `±init_range_b`, `alpha = alpha_init`, `Alinear = I`,
//!   `QInvChol = Q0InvChol = I`, `x0 = 0`.
//! - [`EvolutionParams::to_theta`] / [`EvolutionParams::set_theta`] flatten
//!   and restore all blocks in a fixed order.
//! - [`EvolutionParams::zeros_like`] builds a same-shaped accumulator, which
//!   is how gradients are represented.
//!
//! Conventions
//! -----------
//! - θ layout: entity table, hidden weights, hidden bias, output weights,
//!   output bias, `alpha`, `Alinear`, `QInvChol`, `Q0InvChol`, `x0`; every
//!   matrix in row-major order.
use ndarray::{Array1, Array2};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    latent::{
        core::{
            covariance::NoiseCovariance,
            network::{Activation, DenseLayer, Initializer},
            options::EvolutionOptions,
            shape::LatentShape,
        },
        errors::{LatentResult, ParamError, ParamResult},
    },
    optimization::elbo_optimizer::Theta,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionParams {
    pub shape: LatentShape,
    /// `[num_entities, p_dim]`.
    pub entity_params: Array2<f64>,
    /// `[x_dim + p_dim, H]`, softmax.
    pub hidden: DenseLayer,
    /// `[H, x_dim²]`, linear.
    pub output: DenseLayer,
    pub alpha: f64,
    pub a_linear: Array2<f64>,
    pub q_inv_chol: Array2<f64>,
    pub q0_inv_chol: Array2<f64>,
    pub x0: Array1<f64>,
}

impl EvolutionParams {
    /// Initialize all trainable tensors.
    pub fn init<R: Rng + ?Sized>(shape: LatentShape, opts: &EvolutionOptions, rng: &mut R) -> Self {
        let x = shape.x_dim;
        let entity_params =
            Initializer::GlorotUniform.draw(shape.num_entities, shape.p_dim, rng);
        let hidden = DenseLayer::new(
            shape.input_dim(),
            opts.hidden_width,
            Activation::Softmax,
            Initializer::GlorotUniform,
            rng,
        );
        let output = DenseLayer::new(
            opts.hidden_width,
            shape.a_len(),
            Activation::Linear,
            Initializer::Uniform(opts.init_range_b),
            rng,
        );
        Self {
            shape,
            entity_params,
            hidden,
            output,
            alpha: opts.alpha_init,
            a_linear: Array2::eye(x),
            q_inv_chol: Array2::eye(x),
            q0_inv_chol: Array2::eye(x),
            x0: Array1::zeros(x),
        }
    }

    /// Same shapes and activations, every value zero.
    pub fn zeros_like(&self) -> Self {
        let mut out = self.clone();
        out.visit_mut(|v| *v = 0.0);
        out
    }

    /// Number of scalar trainable parameters.
    pub fn n_params(&self) -> usize {
        let mut n = 0;
        self.visit(|_| n += 1);
        n
    }

    pub fn to_theta(&self) -> Theta {
        let mut values = Vec::with_capacity(self.n_params());
        self.visit(|v| values.push(v));
        Theta::from(values)
    }

    /// Overwrite every block from `theta`.
    ///
    /// # Errors
    /// - [`ParamError::ThetaLengthMismatch`] if `theta.len() != n_params()`.
    /// - [`ParamError::InvalidThetaInput`] for the first non-finite entry.
    ///   Nothing is written on error.
    pub fn set_theta(&mut self, theta: &Theta) -> ParamResult<()> {
        let expected = self.n_params();
        if theta.len() != expected {
            return Err(ParamError::ThetaLengthMismatch { expected, actual: theta.len() });
        }
        if let Some(index) = theta.iter().position(|v| !v.is_finite()) {
            return Err(ParamError::InvalidThetaInput { index, value: theta[index] });
        }
        let mut source = theta.iter();
        self.visit_mut(|v| {
            if let Some(&t) = source.next() {
                *v = t;
            }
        });
        Ok(())
    }

    /// Copy of `self` with values taken from `theta`.
    pub fn with_theta(&self, theta: &Theta) -> ParamResult<Self> {
        let mut out = self.clone();
        out.set_theta(theta)?;
        Ok(out)
    }

    /// Derived process-noise quantities (`Q`).
    pub fn process_noise(&self) -> LatentResult<NoiseCovariance> {
        NoiseCovariance::from_inv_chol("Q", &self.q_inv_chol)
    }

    /// Derived initial-state noise quantities (`Q0`).
    pub fn initial_noise(&self) -> LatentResult<NoiseCovariance> {
        NoiseCovariance::from_inv_chol("Q0", &self.q0_inv_chol)
    }

    /// Check every block against `shape` (e.g. after loading a checkpoint).
    ///
    /// # Errors
    /// [`ParamError::BlockShapeMismatch`] naming the first inconsistent block.
    pub fn validate(&self) -> ParamResult<()> {
        let s = self.shape;
        let h = self.hidden.out_dim();
        let checks: [(&'static str, (usize, usize), (usize, usize)); 8] = [
            ("entity_params", (s.num_entities, s.p_dim), self.entity_params.dim()),
            ("hidden.weights", (s.input_dim(), h), self.hidden.weights.dim()),
            ("hidden.bias", (h, 1), (self.hidden.bias.len(), 1)),
            ("output.weights", (h, s.a_len()), self.output.weights.dim()),
            ("output.bias", (s.a_len(), 1), (self.output.bias.len(), 1)),
            ("a_linear", (s.x_dim, s.x_dim), self.a_linear.dim()),
            ("q_inv_chol", (s.x_dim, s.x_dim), self.q_inv_chol.dim()),
            ("q0_inv_chol", (s.x_dim, s.x_dim), self.q0_inv_chol.dim()),
        ];
        for (name, expected, found) in checks {
            if expected != found {
                return Err(ParamError::BlockShapeMismatch { name, expected, found });
            }
        }
        if self.x0.len() != s.x_dim {
            return Err(ParamError::BlockShapeMismatch {
                name: "x0",
                expected: (s.x_dim, 1),
                found: (self.x0.len(), 1),
            });
        }
        Ok(())
    }

    fn visit(&self, mut f: impl FnMut(f64)) {
        self.entity_params.iter().for_each(|&v| f(v));
        self.hidden.weights.iter().for_each(|&v| f(v));
        self.hidden.bias.iter().for_each(|&v| f(v));
        self.output.weights.iter().for_each(|&v| f(v));
        self.output.bias.iter().for_each(|&v| f(v));
        f(self.alpha);
        self.a_linear.iter().for_each(|&v| f(v));
        self.q_inv_chol.iter().for_each(|&v| f(v));
        self.q0_inv_chol.iter().for_each(|&v| f(v));
        self.x0.iter().for_each(|&v| f(v));
    }

    fn visit_mut(&mut self, mut f: impl FnMut(&mut f64)) {
        self.entity_params.iter_mut().for_each(&mut f);
        self.hidden.weights.iter_mut().for_each(&mut f);
        self.hidden.bias.iter_mut().for_each(&mut f);
        self.output.weights.iter_mut().for_each(&mut f);
        self.output.bias.iter_mut().for_each(&mut f);
        f(&mut self.alpha);
        self.a_linear.iter_mut().for_each(&mut f);
        self.q_inv_chol.iter_mut().for_each(&mut f);
        self.q0_inv_chol.iter_mut().for_each(&mut f);
        self.x0.iter_mut().for_each(&mut f);
    }
}
