//! Observation batches and trial selection.
//!
//! An [`ObservationBatch`] bundles an observation tensor
//! `[trials, bins, y_dim]` with one entity identity per trial. It is
//! validated once at construction; the training loop then slices it into
//! mini-batches with [`ObservationBatch::select`].
use ndarray::{Array3, Axis};

use crate::latent::{
    core::validation::{validate_ids, validate_trajectories},
    errors::LatentResult,
};

#[derive(Debug, Clone, PartialEq)]
pub struct ObservationBatch {
    pub data: Array3<f64>,
    pub ids: Vec<usize>,
}

impl ObservationBatch {
    /// Validate and wrap an observation tensor.
    ///
    /// Parameters
    /// ----------
    /// - `data`: `[trials, bins, y_dim]`, finite, non-empty.
    /// - `ids`: one entity per trial; `None` assigns entity 0 to every trial.
    /// - `num_entities`: size of the entity table the ids index into.
    ///
    /// Errors
    /// ------
    /// - `LatentError::EmptyBatch` / `NonFiniteData` for bad data.
    /// - `LatentError::IdsLengthMismatch` / `UnknownEntity` for bad ids.
    pub fn new(
        data: Array3<f64>, ids: Option<Vec<usize>>, num_entities: usize,
    ) -> LatentResult<Self> {
        let (n, _, y_dim) = data.dim();
        validate_trajectories("observations", &data, y_dim)?;
        let ids = ids.unwrap_or_else(|| vec![0; n]);
        validate_ids(&ids, n, num_entities)?;
        Ok(Self { data, ids })
    }

    pub fn n_trials(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn n_bins(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn y_dim(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Sub-batch of the given trials, in the given order.
    pub fn select(&self, trials: &[usize]) -> Self {
        Self {
            data: self.data.select(Axis(0), trials),
            ids: trials.iter().map(|&i| self.ids[i]).collect(),
        }
    }
}
