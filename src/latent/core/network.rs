//! Fully connected layer with a forward map and a hand-written backward pass.
//!
//! Purpose
//! -------
//! Provide the feed-forward building block of the evolution network:
//! `y = act(x · W + b)` for a batch of row inputs, with the activation chosen
//! from a small closed set and the weights drawn from a named initializer.
//!
//! Conventions
//! -----------
//! - Inputs are row-major batches `[rows, in_dim]`; weights are
//!   `[in_dim, out_dim]`.
//! - `Softmax` normalizes each output row; it is the saturating hidden
//!   nonlinearity of the evolution network. `Linear` is the identity.
use std::str::FromStr;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::{
    latent::errors::LatentError,
    optimization::numerical_stability::{softmax_backward, softmax_in_place},
};

/// Output nonlinearity of a [`DenseLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Softmax,
    Linear,
}

impl FromStr for Activation {
    type Err = LatentError;

    /// Parse `"softmax"` or `"linear"` (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "softmax" => Ok(Activation::Softmax),
            "linear" => Ok(Activation::Linear),
            _ => Err(LatentError::Config {
                text: format!("unknown activation '{s}', expected 'softmax' or 'linear'"),
            }),
        }
    }
}

/// Weight initializer for a [`DenseLayer`]. Biases always start at zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Initializer {
    /// Uniform in `±sqrt(6 / (in + out))`.
    GlorotUniform,
    /// Uniform in `[-range, range]`.
    Uniform(f64),
    Zeros,
}

impl Initializer {
    pub fn draw<R: Rng + ?Sized>(&self, rows: usize, cols: usize, rng: &mut R) -> Array2<f64> {
        let range = match *self {
            Initializer::GlorotUniform => (6.0 / (rows + cols) as f64).sqrt(),
            Initializer::Uniform(range) => range.abs(),
            Initializer::Zeros => 0.0,
        };
        if range == 0.0 {
            return Array2::zeros((rows, cols));
        }
        let dist = Uniform::new_inclusive(-range, range);
        Array2::from_shape_simple_fn((rows, cols), || dist.sample(rng))
    }
}

/// `y = act(x · W + b)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub activation: Activation,
}

/// Gradients of a scalar loss with respect to one layer's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGrad {
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
}

impl DenseLayer {
    pub fn new<R: Rng + ?Sized>(
        in_dim: usize, out_dim: usize, activation: Activation, init: Initializer, rng: &mut R,
    ) -> Self {
        Self { weights: init.draw(in_dim, out_dim, rng), bias: Array1::zeros(out_dim), activation }
    }

    pub fn in_dim(&self) -> usize {
        self.weights.nrows()
    }

    pub fn out_dim(&self) -> usize {
        self.weights.ncols()
    }

    /// Number of scalar parameters (weights and bias).
    pub fn n_params(&self) -> usize {
        self.weights.len() + self.bias.len()
    }

    /// Forward map for a batch of rows.
    pub fn apply(&self, input: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut out = input.dot(&self.weights) + &self.bias;
        if self.activation == Activation::Softmax {
            for row in out.axis_iter_mut(Axis(0)) {
                softmax_in_place(row);
            }
        }
        out
    }

    /// Backward pass for a batch.
    ///
    /// Parameters
    /// ----------
    /// - `input`: the rows passed to [`DenseLayer::apply`].
    /// - `output`: the rows it returned.
    /// - `grad_out`: `∂L/∂output`, same shape as `output`.
    ///
    /// Returns
    /// -------
    /// `(∂L/∂params, ∂L/∂input)`.
    pub fn backward(
        &self, input: ArrayView2<'_, f64>, output: ArrayView2<'_, f64>,
        grad_out: ArrayView2<'_, f64>,
    ) -> (LayerGrad, Array2<f64>) {
        let grad_pre = match self.activation {
            Activation::Linear => grad_out.to_owned(),
            Activation::Softmax => {
                let mut grad_pre = Array2::zeros(output.raw_dim());
                for ((s, g), out) in output
                    .axis_iter(Axis(0))
                    .zip(grad_out.axis_iter(Axis(0)))
                    .zip(grad_pre.axis_iter_mut(Axis(0)))
                {
                    softmax_backward(s, g, out);
                }
                grad_pre
            }
        };
        let grad = LayerGrad { weights: input.t().dot(&grad_pre), bias: grad_pre.sum_axis(Axis(0)) };
        let grad_in = grad_pre.dot(&self.weights.t());
        (grad, grad_in)
    }
}
