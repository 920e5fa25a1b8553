//! Noise covariances derived from trainable inverse-Cholesky factors.
//!
//! Purpose
//! -------
//! Turn a trainable factor `L` (`QInvChol` or `Q0InvChol`) into the
//! quantities the chain density and the sampler need, recomputed fresh from
//! the current parameters on every call:
//!
//! - `inv = L Lᵀ` (precision, `Q⁻¹`),
//! - `chol = L⁻¹` (row-vector noise factor: `z · chol ~ N(0, Q)`),
//! - `cov = cholᵀ chol = (L Lᵀ)⁻¹` (`Q`),
//! - `log_det_inv = log det(L Lᵀ) = 2 ln |det L|`,
//! - `inv_chol_inv_t = L⁻ᵀ`, the gradient of `ln |det L|` with respect to `L`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `L` must be square, finite and invertible with `|det L| ≥ DET_FLOOR`;
//!   otherwise construction fails with
//!   [`LatentError::DegenerateCovariance`] instead of leaking NaN/Inf into a
//!   density.
//! - Small dense algebra is delegated to `nalgebra`.
use nalgebra::DMatrix;
use ndarray::Array2;

use crate::{
    latent::errors::{LatentError, LatentResult},
    optimization::numerical_stability::DET_FLOOR,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NoiseCovariance {
    pub inv_chol: Array2<f64>,
    pub chol: Array2<f64>,
    pub inv: Array2<f64>,
    pub cov: Array2<f64>,
    pub log_det_inv: f64,
    pub inv_chol_inv_t: Array2<f64>,
}

impl NoiseCovariance {
    /// Derive all covariance quantities from an inverse-Cholesky factor.
    ///
    /// Parameters
    /// ----------
    /// - `which`: label used in error messages (`"Q"` or `"Q0"`).
    /// - `inv_chol`: the square factor `L`.
    ///
    /// Errors
    /// ------
    /// - `LatentError::DegenerateCovariance` if `L` is not square, has a
    ///   non-finite entry, `|det L| < DET_FLOOR`, cannot be inverted, or any
    ///   derived quantity is non-finite.
    pub fn from_inv_chol(which: &'static str, inv_chol: &Array2<f64>) -> LatentResult<Self> {
        let (rows, cols) = inv_chol.dim();
        if rows != cols || rows == 0 {
            return Err(LatentError::DegenerateCovariance { which, det: f64::NAN });
        }
        let l = to_nalgebra(inv_chol);
        let det = l.determinant();
        if !det.is_finite() || det.abs() < DET_FLOOR {
            return Err(LatentError::DegenerateCovariance { which, det });
        }
        let chol = l.clone().try_inverse().ok_or(LatentError::DegenerateCovariance { which, det })?;
        let inv = &l * l.transpose();
        let cov = chol.transpose() * &chol;
        let derived = [&chol, &inv, &cov];
        if derived.iter().any(|m| m.iter().any(|v| !v.is_finite())) {
            return Err(LatentError::DegenerateCovariance { which, det });
        }

        Ok(Self {
            inv_chol: inv_chol.clone(),
            chol: from_nalgebra(&chol),
            inv: from_nalgebra(&inv),
            cov: from_nalgebra(&cov),
            log_det_inv: 2.0 * det.abs().ln(),
            inv_chol_inv_t: from_nalgebra(&chol.transpose()),
        })
    }
}

/// Invert a square matrix, `None` if singular.
pub fn invert(m: &Array2<f64>) -> Option<Array2<f64>> {
    to_nalgebra(m).try_inverse().map(|inv| from_nalgebra(&inv))
}

fn to_nalgebra(m: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[[i, j]])
}

fn from_nalgebra(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}
