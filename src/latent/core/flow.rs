//! Flow modulation: a saturating blend weight as a function of state norm.
//!
//! `w(n) = (1 - tanh(sharpness · (n - center))) / 2` is ≈ 1 near the origin
//! and ≈ 0 far away, so `A_inflow = w·A + c·(1 - w)·I` falls back to a fixed
//! contraction `c` outside the region covered by data.
use ndarray::{ArrayBase, ArrayD, Data, Dimension};
use serde::{Deserialize, Serialize};

/// Default norm at which the blend weight equals one half.
pub const DEFAULT_FLOW_CENTER: f64 = 30.0;

/// Default slope of the blend around its center.
pub const DEFAULT_FLOW_SHARPNESS: f64 = 0.08;

/// Contraction factor of the fallback transition `c · I`.
pub const INFLOW_CONTRACTION: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowModulator {
    pub center: f64,
    pub sharpness: f64,
}

impl Default for FlowModulator {
    fn default() -> Self {
        Self { center: DEFAULT_FLOW_CENTER, sharpness: DEFAULT_FLOW_SHARPNESS }
    }
}

impl FlowModulator {
    pub fn new(center: f64, sharpness: f64) -> Self {
        Self { center, sharpness }
    }

    /// Blend weight for a single norm value.
    pub fn weight(&self, norm: f64) -> f64 {
        0.5 * (1.0 - (self.sharpness * (norm - self.center)).tanh())
    }

    /// `dw/dn`, always ≤ 0.
    pub fn derivative(&self, norm: f64) -> f64 {
        let th = (self.sharpness * (norm - self.center)).tanh();
        -0.5 * self.sharpness * (1.0 - th * th)
    }

    /// Elementwise weight over an array of norms of any dimension.
    pub fn weights<S, D>(&self, norms: &ArrayBase<S, D>) -> ArrayD<f64>
    where
        S: Data<Elem = f64>,
        D: Dimension,
    {
        norms.mapv(|n| self.weight(n)).into_dyn()
    }
}
