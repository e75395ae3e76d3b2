//! Dynamic system abstraction consumed by the integrators.

use crate::error::SimResult;

/// An ODE `dx/dt = f(t, x)` with the vector arithmetic the integrators need.
///
/// States double as derivatives and error estimates, so `add` and `scale`
/// must be plain element-wise operations.
pub trait TransientModel {
    type State: Clone;

    /// State at `t = 0`.
    fn initial_state(&self) -> Self::State;

    /// Derivative at `(t, x)`.
    ///
    /// `&mut self` lets a model keep scratch data between stage evaluations.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// `a + b`
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// `scale * a`
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;

    /// RMS of `err_i / (atol + rtol * max(|x_i|, |x_new_i|))`.
    ///
    /// A value `<= 1` means the local error estimate is within tolerance.
    fn error_norm(
        &self,
        err: &Self::State,
        x: &Self::State,
        x_new: &Self::State,
        atol: f64,
        rtol: f64,
    ) -> f64;
}
