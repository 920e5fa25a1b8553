//! elbo_optimizer::finite_diff — finite-difference gradients with error capture.
//!
//! Purpose
//! -------
//! Approximate the gradient of a fallible scalar objective around a
//! parameter vector, so objectives without an analytic gradient can still be
//! optimized and analytic gradients can be checked in tests.
//!
//! Key behaviors
//! -------------
//! - [`fd_gradient`] tries central differences first and falls back to
//!   forward differences when the central estimate fails validation.
//! - [`fd_gradient_forward`] runs forward differences only.
//! - Errors raised by the objective inside the `finitediff` closure are
//!   captured in a `RefCell` slot and surfaced after the sweep.
//!
//! Conventions
//! -----------
//! - Domain errors are surfaced as [`OptError`](crate::optimization::errors::OptError)
//!   via `OptResult<T>`; the closure passed to `finitediff` must return
//!   `f64`, so failed evaluations return `NaN` and park their error.
use std::cell::RefCell;

use finitediff::FiniteDiff;

use crate::optimization::{
    elbo_optimizer::{Grad, Theta, validation::validate_grad},
    errors::{OptError, OptResult},
};

/// fd_gradient — central-difference gradient with forward-difference fallback.
///
/// Parameters
/// ----------
/// - `theta`: point at which to differentiate; its length fixes the
///   gradient dimension.
/// - `func`: fallible scalar objective.
///
/// Returns
/// -------
/// A validated gradient of `func` at `theta`.
///
/// Errors
/// ------
/// - The first error raised by `func` during the sweep.
/// - `OptError::InvalidGradient` / `GradientDimMismatch` if neither
///   difference scheme yields a finite gradient.
pub fn fd_gradient<G>(theta: &Theta, func: G) -> OptResult<Grad>
where
    G: Fn(&Theta) -> OptResult<f64>,
{
    let slot: RefCell<Option<OptError>> = RefCell::new(None);
    let central = {
        let wrapped = capture(&func, &slot);
        theta.central_diff(&wrapped)
    };
    if let Some(err) = slot.take() {
        return Err(err);
    }
    match validate_grad(&central, theta.len()) {
        Ok(()) => Ok(central),
        Err(_) => fd_gradient_forward(theta, func),
    }
}

/// Forward-difference gradient with error capture and validation.
///
/// # Errors
/// Same as [`fd_gradient`].
pub fn fd_gradient_forward<G>(theta: &Theta, func: G) -> OptResult<Grad>
where
    G: Fn(&Theta) -> OptResult<f64>,
{
    let slot: RefCell<Option<OptError>> = RefCell::new(None);
    let wrapped = capture(&func, &slot);
    let forward = theta.forward_diff(&wrapped);
    if let Some(err) = slot.take() {
        return Err(err);
    }
    validate_grad(&forward, theta.len())?;
    Ok(forward)
}

fn capture<'a, G>(func: &'a G, slot: &'a RefCell<Option<OptError>>) -> impl Fn(&Theta) -> f64 + 'a
where
    G: Fn(&Theta) -> OptResult<f64>,
{
    move |theta: &Theta| match func(theta) {
        Ok(value) => value,
        Err(e) => {
            let mut parked = slot.borrow_mut();
            if parked.is_none() {
                *parked = Some(e);
            }
            f64::NAN
        }
    }
}
