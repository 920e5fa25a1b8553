//! Numerical stability utilities.
//!
//! Provides safe implementations of the nonlinear transforms used by the
//! evolution network and the observation models, with explicit cutoffs
//! (`x > 20.0`) to keep `f64` arithmetic in a well-conditioned regime.
//!
//! # Provided items
//! - [`LN_2PI`]: `ln(2π)`, shared by every Gaussian log-density.
//! - [`DET_FLOOR`]: smallest admissible `|det|` for inverse-Cholesky factors.
//! - [`safe_softplus(x)`]: stable `ln(1 + exp(x))`.
//! - [`safe_softplus_inv(x)`]: inverse of softplus on `(0, ∞)`.
//! - [`safe_logistic(x)`]: stable `1 / (1 + exp(-x))`, the derivative of
//!   softplus.
//! - [`softmax_in_place`]: max-shifted softmax over a 1-D lane.
//! - [`softmax_backward`]: vector–Jacobian product of softmax.
use ndarray::{ArrayView1, ArrayViewMut1};

/// `ln(2π)`.
pub const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Smallest `|det L|` accepted for an inverse-Cholesky factor `L`.
pub const DET_FLOOR: f64 = 1e-12;

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
///
/// - For sufficiently large `x`, `softplus(x) ≈ x`.
/// - Otherwise, it falls back to `ln1p(exp(x))`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp().ln_1p() }
}

/// Stable inverse of softplus on `(0, ∞)`: `t = ln(exp(x) - 1)`.
///
/// Mirrors the guard of [`safe_softplus`]; used to seed rates from
/// observed counts.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 { x } else { x.exp_m1().ln() }
}

/// Numerically stable logistic function `σ(x) = 1 / (1 + exp(-x))`.
///
/// Evaluated through `exp(-|x|)` so neither tail overflows.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Softmax over a lane, in place, with max-shift.
///
/// A lane containing a non-finite maximum is left as produced by the
/// arithmetic (NaN propagates); callers validate inputs upstream.
pub fn softmax_in_place(mut lane: ArrayViewMut1<'_, f64>) {
    let max = lane.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    lane.mapv_inplace(|z| (z - max).exp());
    let total: f64 = lane.sum();
    lane.mapv_inplace(|e| e / total);
}

/// Vector–Jacobian product of softmax.
///
/// Given the softmax output `s` and upstream gradient `g = ∂L/∂s`, writes
/// `∂L/∂z = s ⊙ (g - ⟨g, s⟩)` into `out`.
pub fn softmax_backward(
    s: ArrayView1<'_, f64>, g: ArrayView1<'_, f64>, mut out: ArrayViewMut1<'_, f64>,
) {
    let inner = s.dot(&g);
    for ((o, &si), &gi) in out.iter_mut().zip(s.iter()).zip(g.iter()) {
        *o = si * (gi - inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of the guarded transforms with naïve formulas on safe inputs.
    // - Tail behavior of softplus/logistic.
    // - Softmax normalization and its backward pass against finite differences.
    //
    // They intentionally DO NOT cover:
    // - Network-level gradients (see `latent::core::network`).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Verify guarded transforms against naïve formulas and in the tails.
    //
    // Given
    // -----
    // - Moderate inputs and large-magnitude inputs.
    //
    // Expect
    // ------
    // - Close agreement in the safe region, finite values in the tails, and
    //   softplus_inv ∘ softplus ≈ id.
    fn guarded_transforms_match_naive_formulas() {
        // Arrange
        let xs = [-5.0_f64, -0.5, 0.0, 0.7, 4.0];

        // Act / Assert
        for &x in &xs {
            assert!((safe_softplus(x) - (1.0 + x.exp()).ln()).abs() < 1e-12);
            assert!((safe_logistic(x) - 1.0 / (1.0 + (-x).exp())).abs() < 1e-12);
            assert!((safe_softplus_inv(safe_softplus(x)) - x).abs() < 1e-9);
        }
        assert_eq!(safe_softplus(800.0), 800.0);
        assert!(safe_logistic(-800.0) >= 0.0);
        assert!((safe_logistic(800.0) - 1.0).abs() < 1e-15);
        assert!((LN_2PI - (2.0 * std::f64::consts::PI).ln()).abs() < 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Ensure softmax sums to one and is shift-invariant.
    //
    // Given
    // -----
    // - Logits (1, 2, 3) and the same logits shifted by 1000.
    //
    // Expect
    // ------
    // - Both outputs sum to 1 and agree elementwise.
    fn softmax_is_normalized_and_shift_invariant() {
        // Arrange
        let mut a = array![1.0, 2.0, 3.0];
        let mut b = array![1001.0, 1002.0, 1003.0];

        // Act
        softmax_in_place(a.view_mut());
        softmax_in_place(b.view_mut());

        // Assert
        assert!((a.sum() - 1.0).abs() < 1e-12);
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Check the softmax vector–Jacobian product against central differences.
    //
    // Given
    // -----
    // - Logits z, weights w, scalar L(z) = ⟨w, softmax(z)⟩.
    //
    // Expect
    // ------
    // - `softmax_backward` ≈ ∂L/∂z within 1e-7.
    fn softmax_backward_matches_finite_differences() {
        // Arrange
        let z = array![0.3, -1.2, 0.8, 0.05];
        let w = array![1.0, -2.0, 0.5, 3.0];
        let loss = |zz: &Array1<f64>| {
            let mut s = zz.clone();
            softmax_in_place(s.view_mut());
            s.dot(&w)
        };
        let mut s = z.clone();
        softmax_in_place(s.view_mut());
        let mut analytic = Array1::zeros(4);

        // Act
        softmax_backward(s.view(), w.view(), analytic.view_mut());

        // Assert
        let h = 1e-6;
        for i in 0..4 {
            let mut zp = z.clone();
            let mut zm = z.clone();
            zp[i] += h;
            zm[i] -= h;
            let fd = (loss(&zp) - loss(&zm)) / (2.0 * h);
            assert!((fd - analytic[i]).abs() < 1e-7, "index {i}: fd {fd} vs {}", analytic[i]);
        }
    }
}
