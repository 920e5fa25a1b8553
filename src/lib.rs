//! rust_latent_dynamics — locally-linear latent evolution models with Python bindings.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes the latent evolution model and its training loop to Python via
//! the `_rust_latent_dynamics` extension module.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules (`latent`, `optimization`, `training`) as the
//!   public crate surface.
//! - Under `python-bindings`, define `#[pyclass]` wrappers for the model
//!   ([`LocallyLinearEvolution`]) and the training loop ([`Trainer`]) plus the
//!   `flow_modulator` function, and register them in the
//!   `_rust_latent_dynamics` module.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work lives in the inner modules; this file only converts
//!   inputs, dispatches and maps errors.
//! - Python arrays are copied into owned `ndarray` tensors before use.
//!
//! Conventions
//! -----------
//! - Trajectories and observations are `[trials, bins, dim]` float64 arrays.
//! - Core errors convert to `ValueError` at the PyO3 boundary.
//!
//! Downstream usage
//! ----------------
//! - Rust code should depend on [`latent`] and [`training`] directly (or their
//!   preludes) and ignore the feature-gated items below.
//!
//! Testing notes
//! -------------
//! - Numerical behavior is covered by unit tests in the inner modules and by
//!   the pipeline test under `tests/`.

pub mod latent;
pub mod optimization;
pub mod training;
pub mod utils;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray3};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use rand::SeedableRng;

#[cfg(feature = "python-bindings")]
use rand_chacha::ChaCha8Rng;

#[cfg(feature = "python-bindings")]
use crate::{
    latent::{
        core::{
            flow::FlowModulator,
            options::{EvolutionOptions, SamplerOptions},
            shape::LatentShape,
        },
        errors::LatentError,
        models::LatentEvolution,
    },
    training::{
        LatentConfig, MeanFieldRecognition, TrainingLoop, trainer::EpochSummary,
    },
    utils::{extract_batch, extract_f64_array3},
};

/// LocallyLinearEvolution — Python-facing wrapper for [`LatentEvolution`].
///
/// Constructed from Python via
/// `LocallyLinearEvolution(x_dim, p_dim=1, num_entities=1, hidden_width=64,
/// seed=None)`. Exposes the chain log density of a trajectory batch and the
/// trajectory sampler.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_latent_dynamics", unsendable)]
pub struct LocallyLinearEvolution {
    pub inner: LatentEvolution,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl LocallyLinearEvolution {
    #[new]
    #[pyo3(
        signature = (x_dim, p_dim = 1, num_entities = 1, hidden_width = 64, seed = None),
        text_signature = "(x_dim, /, p_dim=1, num_entities=1, hidden_width=64, seed=None)"
    )]
    pub fn new(
        x_dim: usize, p_dim: usize, num_entities: usize, hidden_width: usize, seed: Option<u64>,
    ) -> PyResult<Self> {
        let shape = LatentShape::new(x_dim, p_dim, num_entities)?;
        let options = EvolutionOptions { hidden_width, seed, ..EvolutionOptions::default() };
        Ok(Self { inner: LatentEvolution::new(shape, options)? })
    }

    #[getter]
    pub fn n_params(&self) -> usize {
        self.inner.params.n_params()
    }

    /// Chain log density of `x` (`[N, T, x_dim]`) summed over trials.
    #[pyo3(
        signature = (x, ids = None, with_inflow = false),
        text_signature = "(self, x, /, ids=None, with_inflow=False)"
    )]
    pub fn log_density<'py>(
        &self, x: &Bound<'py, PyAny>, ids: Option<Vec<usize>>, with_inflow: bool,
    ) -> PyResult<f64> {
        let x = extract_f64_array3(x, "x")?;
        let ids = ids.unwrap_or_else(|| vec![0; x.dim().0]);
        let density = self.inner.log_density_on_batch(x.view(), &ids, with_inflow)?;
        Ok(density.total())
    }

    /// Forward-simulated trajectories, `[n_samples, n_bins, x_dim]`.
    #[pyo3(
        signature = (n_samples = 50, n_bins = 30, with_inflow = true, threshold = 0.7, seed = None),
        text_signature = "(self, /, n_samples=50, n_bins=30, with_inflow=True, threshold=0.7, seed=None)"
    )]
    pub fn sample<'py>(
        &self, py: Python<'py>, n_samples: usize, n_bins: usize, with_inflow: bool,
        threshold: f64, seed: Option<u64>,
    ) -> PyResult<Bound<'py, PyArray3<f64>>> {
        let opts = SamplerOptions {
            n_samples,
            n_bins,
            with_inflow,
            path_mse_threshold: threshold,
            seed,
            ..SamplerOptions::default()
        };
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let out = self.inner.sample(opts, None, None, &mut rng)?;
        Ok(out.paths.into_pyarray(py))
    }
}

/// Trainer — Python-facing wrapper for the fixed-point training loop.
///
/// Constructed from an optional JSON configuration; `train` returns one
/// `(epoch, learning_rate, train_cost, valid_cost)` tuple per epoch.
#[cfg(feature = "python-bindings")]
#[pyclass(module = "rust_latent_dynamics", unsendable)]
pub struct Trainer {
    inner: TrainingLoop<MeanFieldRecognition>,
    num_entities: usize,
}

#[cfg(feature = "python-bindings")]
#[pymethods]
impl Trainer {
    #[new]
    #[pyo3(signature = (config_json = None), text_signature = "(config_json=None, /)")]
    pub fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(text) => LatentConfig::from_json(text)?,
            None => LatentConfig::default(),
        };
        Ok(Self { inner: TrainingLoop::from_config(&config)?, num_entities: config.num_entities })
    }

    #[pyo3(
        signature = (y, num_epochs, ids = None, y_valid = None, valid_ids = None),
        text_signature = "(self, y, num_epochs, /, ids=None, y_valid=None, valid_ids=None)"
    )]
    pub fn train<'py>(
        &mut self, y: &Bound<'py, PyAny>, num_epochs: usize, ids: Option<Vec<usize>>,
        y_valid: Option<&Bound<'py, PyAny>>, valid_ids: Option<Vec<usize>>,
    ) -> PyResult<Vec<(usize, f64, f64, Option<f64>)>> {
        let train = extract_batch(y, ids, self.num_entities)?;
        let valid = y_valid.map(|v| extract_batch(v, valid_ids, self.num_entities)).transpose()?;
        let report = self.inner.train(&train, valid.as_ref(), num_epochs)?;
        Ok(report.history.iter().map(summary_tuple).collect())
    }

    /// The trained model.
    #[getter]
    pub fn model(&self) -> LocallyLinearEvolution {
        LocallyLinearEvolution { inner: self.inner.model.clone() }
    }

    /// Current evolution parameters as JSON.
    pub fn params_json(&self) -> PyResult<String> {
        Ok(serde_json::to_string(&self.inner.model.params).map_err(LatentError::from)?)
    }
}

#[cfg(feature = "python-bindings")]
fn summary_tuple(s: &EpochSummary) -> (usize, f64, f64, Option<f64>) {
    (s.epoch, s.learning_rate, s.train_cost, s.valid_cost)
}

/// Flow blend weight `w(n)` for each norm in `norms`.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(signature = (norms, center = 30.0, sharpness = 0.08))]
pub fn flow_modulator(norms: Vec<f64>, center: f64, sharpness: f64) -> Vec<f64> {
    let flow = FlowModulator::new(center, sharpness);
    norms.into_iter().map(|n| flow.weight(n)).collect()
}

/// _rust_latent_dynamics — PyO3 module initializer.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_latent_dynamics<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_class::<LocallyLinearEvolution>()?;
    m.add_class::<Trainer>()?;
    m.add_function(wrap_pyfunction!(flow_modulator, m)?)?;
    Ok(())
}
