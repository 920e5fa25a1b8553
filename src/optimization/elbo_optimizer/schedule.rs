//! Linear learning-rate annealing across a fixed number of epochs.
use serde::{Deserialize, Serialize};

use crate::optimization::{
    elbo_optimizer::validation::verify_learning_rate,
    errors::{OptError, OptResult},
};

/// `lr(ep) = start - ep / epochs · (start - end)`.
///
/// Epoch 0 uses `start`; the last epoch approaches (but does not reach)
/// `end`, which is the rate at `ep == epochs`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearAnneal {
    pub start: f64,
    pub end: f64,
    pub epochs: usize,
}

impl LinearAnneal {
    /// # Errors
    /// - `OptError::InvalidLearningRate` if either rate is non-finite or ≤ 0.
    /// - `OptError::InvalidEpochCount` if `epochs == 0`.
    pub fn new(start: f64, end: f64, epochs: usize) -> OptResult<Self> {
        verify_learning_rate(start)?;
        verify_learning_rate(end)?;
        if epochs == 0 {
            return Err(OptError::InvalidEpochCount {
                epochs,
                reason: "Annealing needs at least one epoch.",
            });
        }
        Ok(Self { start, end, epochs })
    }

    pub fn rate_at(&self, epoch: usize) -> f64 {
        let frac = epoch.min(self.epochs) as f64 / self.epochs as f64;
        self.start - frac * (self.start - self.end)
    }
}
