//! latent::core — building blocks of the locally-linear evolution model.
//!
//! Purpose
//! -------
//! Collect the pieces the model layer composes: dimensions ([`shape`]),
//! options ([`options`]), trainable parameters ([`params`]), derived noise
//! covariances ([`covariance`]), the flow modulator ([`flow`]), the dense
//! layer with its backward pass ([`network`]), observation batches
//! ([`data`]) and input validation ([`validation`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - Every tensor is an `ndarray` container over `f64`; latent batches are
//!   `[trials, bins, x_dim]`, transition tensors `[trials, bins, x_dim, x_dim]`.
//! - Derived quantities (covariances, transition matrices) are recomputed
//!   from the current parameters on every call and never cached.
//! - Validation happens at public entry points; internal helpers assume
//!   validated, finite inputs.
//!
//! Conventions
//! -----------
//! - States are row vectors and act on transitions from the left:
//!   `x_{t+1} ≈ x_t · A(x_t)`.
//! - Errors are reported as [`LatentError`](crate::latent::errors::LatentError)
//!   or [`ParamError`](crate::latent::errors::ParamError).

pub mod covariance;
pub mod data;
pub mod flow;
pub mod network;
pub mod options;
pub mod params;
pub mod shape;
pub mod validation;
