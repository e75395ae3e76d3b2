//! Discrete PID controller for motor speed regulation.
//!
//! The control law is evaluated at a fixed step `dt`:
//!
//! ```text
//! e[n]  = omega_ref - omega[n]
//! I[n]  = I[n-1] + e[n] * dt          (forward Euler)
//! D[n]  = (e[n] - e[n-1]) / dt
//! Va[n] = kp * e[n] + ki * I[n] + kd * D[n]
//! ```
//!
//! There is no anti-windup and no output clamping. The model being reproduced
//! drives the armature with whatever voltage the law asks for.

use crate::error::ControlResult;
use mf_core::ensure_finite;
use serde::{Deserialize, Serialize};

/// PID gains and speed reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerGains {
    /// Proportional gain (V per rad/s).
    pub kp: f64,
    /// Integral gain (V per rad).
    pub ki: f64,
    /// Derivative gain (V per rad/s²).
    pub kd: f64,
    /// Target angular velocity (rad/s).
    pub omega_ref: f64,
}

impl ControllerGains {
    /// Create a gain set.
    ///
    /// Gains may be zero or negative; only finiteness is checked.
    pub fn new(kp: f64, ki: f64, kd: f64, omega_ref: f64) -> ControlResult<Self> {
        Ok(Self {
            kp: ensure_finite(kp, "kp")?,
            ki: ensure_finite(ki, "ki")?,
            kd: ensure_finite(kd, "kd")?,
            omega_ref: ensure_finite(omega_ref, "omega_ref")?,
        })
    }
}

impl Default for ControllerGains {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 10.0,
            kd: 0.01,
            omega_ref: 100.0,
        }
    }
}

/// PID controller state, owned by a single simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    /// Integral of the speed error.
    pub integral_error: f64,
    /// Error seen on the previous update.
    pub previous_error: f64,
}

impl ControllerState {
    /// State at run start for a motor initially spinning at `omega0`.
    ///
    /// The previous error is seeded with the initial error so the first
    /// derivative term is zero instead of a kick of `omega_ref / dt`.
    pub fn initial(omega_ref: f64, omega0: f64) -> Self {
        Self {
            integral_error: 0.0,
            previous_error: omega_ref - omega0,
        }
    }
}

/// PID controller configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidController {
    pub gains: ControllerGains,
}

impl PidController {
    pub fn new(gains: ControllerGains) -> Self {
        Self { gains }
    }

    /// State for a run that starts from rest.
    pub fn initial_state(&self) -> ControllerState {
        ControllerState::initial(self.gains.omega_ref, 0.0)
    }

    /// Compute the armature voltage for the current measured speed.
    ///
    /// # Arguments
    ///
    /// * `state` - Controller state carried from the previous step
    /// * `omega` - Angular velocity measured at the start of the step
    /// * `dt` - Step size (seconds); not validated here
    ///
    /// # Returns
    ///
    /// Updated state and the voltage to hold over the coming step.
    pub fn update(&self, state: &ControllerState, omega: f64, dt: f64) -> (ControllerState, f64) {
        let g = &self.gains;
        let error = g.omega_ref - omega;

        let integral_error = state.integral_error + error * dt;
        let derivative_error = (error - state.previous_error) / dt;

        let va = g.kp * error + g.ki * integral_error + g.kd * derivative_error;

        let new_state = ControllerState {
            integral_error,
            previous_error: error,
        };

        (new_state, va)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(kp: f64, ki: f64, kd: f64, omega_ref: f64) -> PidController {
        PidController::new(ControllerGains::new(kp, ki, kd, omega_ref).unwrap())
    }

    #[test]
    fn gains_reject_non_finite() {
        assert!(ControllerGains::new(f64::NAN, 0.0, 0.0, 1.0).is_err());
        assert!(ControllerGains::new(1.0, f64::INFINITY, 0.0, 1.0).is_err());
        assert!(ControllerGains::new(1.0, 0.0, 0.0, 1.0).is_ok());
    }

    #[test]
    fn initial_state_has_no_derivative_kick() {
        let c = pid(1.0, 0.0, 5.0, 100.0);
        let state = c.initial_state();
        assert_eq!(state.previous_error, 100.0);
        assert_eq!(state.integral_error, 0.0);

        let (_, va) = c.update(&state, 0.0, 1e-3);
        // P only: derivative is zero because previous_error == error
        assert!((va - 100.0).abs() < 1e-12);
    }

    #[test]
    fn proportional_only() {
        let c = pid(2.0, 0.0, 0.0, 10.0);
        let (_, va) = c.update(&c.initial_state(), 4.0, 0.1);
        assert!((va - 12.0).abs() < 1e-12);
    }

    #[test]
    fn integral_accumulates_forward_euler() {
        let c = pid(0.0, 1.0, 0.0, 1.0);
        let mut state = c.initial_state();
        let mut va = 0.0;
        for _ in 0..10 {
            let (next, out) = c.update(&state, 0.0, 0.1);
            state = next;
            va = out;
        }
        assert!((state.integral_error - 1.0).abs() < 1e-12);
        assert!((va - 1.0).abs() < 1e-12);
    }

    #[test]
    fn derivative_uses_previous_error() {
        let c = pid(0.0, 0.0, 1.0, 10.0);
        let state = ControllerState {
            integral_error: 0.0,
            previous_error: 10.0,
        };
        // error drops from 10 to 8 over dt = 0.5 → derivative = -4
        let (next, va) = c.update(&state, 2.0, 0.5);
        assert!((va + 4.0).abs() < 1e-12);
        assert_eq!(next.previous_error, 8.0);
    }

    #[test]
    fn output_is_not_clamped() {
        let c = pid(1000.0, 0.0, 0.0, 1000.0);
        let (_, va) = c.update(&c.initial_state(), 0.0, 1e-3);
        assert_eq!(va, 1.0e6);
    }

}
