//! Input validation for the latent model.
//!
//! These helpers run at every public entry point so shape and domain
//! failures are raised where they are detected:
//!
//! - **Options**: [`verify_positive`], [`verify_non_negative`].
//! - **Trajectories**: [`validate_trajectories`] checks the batch is
//!   non-empty, has `x_dim` states, and is finite.
//! - **Identities**: [`validate_ids`] checks the identity list against the
//!   batch size and the entity table.
use ndarray::{ArrayBase, Data, Ix3};

use crate::latent::errors::{LatentError, LatentResult};

/// Require a finite, strictly positive option value.
///
/// # Errors
/// [`LatentError::InvalidOption`] otherwise.
pub fn verify_positive(name: &'static str, value: f64) -> LatentResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(LatentError::InvalidOption {
            name,
            value,
            reason: "Value must be finite and strictly positive.",
        });
    }
    Ok(())
}

/// Require a finite, non-negative option value.
///
/// # Errors
/// [`LatentError::InvalidOption`] otherwise.
pub fn verify_non_negative(name: &'static str, value: f64) -> LatentResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(LatentError::InvalidOption {
            name,
            value,
            reason: "Value must be finite and non-negative.",
        });
    }
    Ok(())
}

/// Validate a `[trials, bins, dim]` batch.
///
/// # Errors
/// - [`LatentError::EmptyBatch`] if any axis is empty.
/// - [`LatentError::StateDimMismatch`] if the trailing axis is not `dim`.
/// - [`LatentError::NonFiniteData`] for the first NaN/±inf entry.
pub fn validate_trajectories<S>(
    what: &'static str, x: &ArrayBase<S, Ix3>, dim: usize,
) -> LatentResult<()>
where
    S: Data<Elem = f64>,
{
    let (n, t, d) = x.dim();
    if n == 0 || t == 0 {
        return Err(LatentError::EmptyBatch);
    }
    if d != dim {
        return Err(LatentError::StateDimMismatch { expected: dim, found: d });
    }
    if let Some((index, &value)) = x.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(LatentError::NonFiniteData { what, index, value });
    }
    Ok(())
}

/// Validate an identity list against a batch of `batch` trials.
///
/// # Errors
/// - [`LatentError::IdsLengthMismatch`] if `ids.len() != batch`.
/// - [`LatentError::UnknownEntity`] for the first id `>= num_entities`.
pub fn validate_ids(ids: &[usize], batch: usize, num_entities: usize) -> LatentResult<()> {
    if ids.len() != batch {
        return Err(LatentError::IdsLengthMismatch { ids: ids.len(), batch });
    }
    if let Some(&id) = ids.iter().find(|&&id| id >= num_entities) {
        return Err(LatentError::UnknownEntity { id, num_entities });
    }
    Ok(())
}
