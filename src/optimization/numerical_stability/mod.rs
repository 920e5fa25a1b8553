//! numerical_stability — numerically robust transforms and shared tolerances.
//!
//! Purpose
//! -------
//! Collect the numerically stable scalar and lane-wise transforms used by the
//! evolution network (softmax and its backward pass) and the observation
//! models (softplus, logistic), together with the shared constants
//! (`LN_2PI`, `DET_FLOOR`) used by the Gaussian densities.
//!
//! Invariants & assumptions
//! ------------------------
//! - All transforms assume finite `f64` inputs; shape and domain validation
//!   happens in the latent-model layer.
//! - This module never logs, performs I/O, or touches global state.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`transformations`] compare guarded forms with naïve
//!   formulas, exercise tails, and check the softmax backward pass with
//!   finite differences.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    DET_FLOOR, LN_2PI, safe_logistic, safe_softplus, safe_softplus_inv, softmax_backward,
    softmax_in_place,
};

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::transformations::{
        DET_FLOOR, LN_2PI, safe_logistic, safe_softplus, softmax_backward, softmax_in_place,
    };
}
