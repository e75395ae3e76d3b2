//! Closed-loop step response of a PID-regulated motor.
//!
//! One iteration per grid step `i` at `t = i * dt`:
//! 1. the PID controller reads omega at `t` and returns `Va`,
//! 2. the motor is integrated from `t` to `t + dt` with `Va` held,
//! 3. omega at `t + dt` is recorded.

use mf_controls::{ControllerGains, PidController};
use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::grid::StepGrid;
use crate::integrator::{Dopri45, ForwardEuler, Integrator, RK4};
use crate::model::TransientModel;
use crate::motor::{HeldVoltageMotor, MotorParameters};

/// Integrator selection for the plant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntegratorType {
    /// Adaptive Dormand-Prince 5(4), sub-steps inside `dt` only when needed (default).
    Dopri45 { rtol: f64, atol: f64 },
    /// 4th-order Runge-Kutta, one sub-step per `dt`.
    RK4,
    /// Forward Euler, one sub-step per `dt`.
    ForwardEuler,
}

impl Default for IntegratorType {
    fn default() -> Self {
        IntegratorType::Dopri45 {
            rtol: 1e-6,
            atol: 1e-9,
        }
    }
}

/// Options for a step-response run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepResponseOptions {
    /// Horizon (seconds)
    pub t_max: f64,
    /// Controller/plant step (seconds)
    pub dt: f64,
    #[serde(default)]
    pub integrator: IntegratorType,
}

impl Default for StepResponseOptions {
    fn default() -> Self {
        Self {
            t_max: 2.0,
            dt: 1e-3,
            integrator: IntegratorType::default(),
        }
    }
}

impl StepResponseOptions {
    /// Validate and return the step grid.
    pub fn grid(&self) -> SimResult<StepGrid> {
        StepGrid::new(self.dt, self.t_max)
    }
}

/// Recorded step response.
///
/// Sample `i` holds the state at the end of step `i`, i.e. at `(i + 1) * dt`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    /// Sample times (seconds)
    pub time: Vec<f64>,
    /// Angular velocity (rad/s)
    pub omega: Vec<f64>,
    /// Armature current (A)
    pub current: Vec<f64>,
    /// Voltage held over the step that ended at this sample (V)
    pub voltage: Vec<f64>,
}

impl Trajectory {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            time: Vec::with_capacity(n),
            omega: Vec::with_capacity(n),
            current: Vec::with_capacity(n),
            voltage: Vec::with_capacity(n),
        }
    }

    /// Build a speed-only trajectory, e.g. from measured or synthetic data.
    ///
    /// Current and voltage channels are left empty.
    pub fn from_samples(time: Vec<f64>, omega: Vec<f64>) -> Self {
        debug_assert_eq!(time.len(), omega.len());
        Self {
            time,
            omega,
            current: Vec::new(),
            voltage: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// (time, omega) pairs in time order.
    pub fn samples(&self) -> impl DoubleEndedIterator<Item = (f64, f64)> + '_ {
        self.time.iter().copied().zip(self.omega.iter().copied())
    }

    pub fn final_omega(&self) -> Option<f64> {
        self.omega.last().copied()
    }

    /// True when every recorded speed is finite.
    pub fn is_finite(&self) -> bool {
        self.omega.iter().all(|w| w.is_finite())
    }
}

/// Run the closed-loop step response from rest.
///
/// Motor parameters are used as given; non-physical values produce
/// non-finite samples rather than an error. Only the grid is validated.
pub fn simulate_step_response(
    params: &MotorParameters,
    gains: &ControllerGains,
    opts: &StepResponseOptions,
) -> SimResult<Trajectory> {
    let grid = opts.grid()?;
    match opts.integrator {
        IntegratorType::Dopri45 { rtol, atol } => {
            run_closed_loop(&Dopri45::new(rtol, atol), params, gains, &grid)
        }
        IntegratorType::RK4 => run_closed_loop(&RK4, params, gains, &grid),
        IntegratorType::ForwardEuler => run_closed_loop(&ForwardEuler, params, gains, &grid),
    }
}

fn run_closed_loop<I: Integrator>(
    integrator: &I,
    params: &MotorParameters,
    gains: &ControllerGains,
    grid: &StepGrid,
) -> SimResult<Trajectory> {
    let n_steps = grid.n_steps();
    let controller = PidController::new(*gains);
    let mut plant = HeldVoltageMotor::new(*params);

    let mut x = plant.initial_state();
    let mut ctrl = controller.initial_state();
    let mut record = Trajectory::with_capacity(n_steps);

    for i in 0..n_steps {
        let t = grid.step_start(i);

        let (next_ctrl, va) = controller.update(&ctrl, x.omega, grid.dt);
        ctrl = next_ctrl;

        plant.voltage = va;
        x = integrator.step(&mut plant, t, &x, grid.dt)?;

        record.time.push(grid.step_start(i + 1));
        record.omega.push(x.omega);
        record.current.push(x.ia);
        record.voltage.push(va);
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    #[test]
    fn options_defaults() {
        let opts = StepResponseOptions::default();
        assert_eq!(opts.dt, 1e-3);
        assert_eq!(opts.t_max, 2.0);
        assert!(matches!(opts.integrator, IntegratorType::Dopri45 { .. }));
    }

    #[test]
    fn trajectory_length_is_ceil_of_horizon() {
        let opts = StepResponseOptions {
            t_max: 0.105,
            dt: 0.01,
            integrator: IntegratorType::RK4,
        };
        let traj = simulate_step_response(
            &MotorParameters::default(),
            &ControllerGains::default(),
            &opts,
        )
        .unwrap();
        assert_eq!(traj.len(), 11);
        assert!((traj.time[0] - 0.01).abs() < 1e-15);
        assert!((traj.time[10] - 0.11).abs() < 1e-12);
    }

    #[test]
    fn first_voltage_has_no_derivative_kick() {
        // At rest the error is omega_ref; only the P and I terms contribute.
        let gains = ControllerGains::default();
        let opts = StepResponseOptions {
            t_max: 0.01,
            ..StepResponseOptions::default()
        };
        let traj = simulate_step_response(&MotorParameters::default(), &gains, &opts).unwrap();
        let expected = gains.kp * gains.omega_ref + gains.ki * gains.omega_ref * opts.dt;
        assert!((traj.voltage[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn invalid_step_is_rejected() {
        let opts = StepResponseOptions {
            dt: 0.0,
            ..StepResponseOptions::default()
        };
        let result = simulate_step_response(
            &MotorParameters::default(),
            &ControllerGains::default(),
            &opts,
        );
        assert!(matches!(result, Err(SimError::InvalidArg { .. })));
    }

    #[test]
    fn zero_inertia_yields_non_finite_samples() {
        let params = MotorParameters {
            j: 0.0,
            ..MotorParameters::default()
        };
        let opts = StepResponseOptions {
            t_max: 0.01,
            ..StepResponseOptions::default()
        };
        let traj = simulate_step_response(&params, &ControllerGains::default(), &opts).unwrap();
        assert_eq!(traj.len(), 10);
        assert!(!traj.is_finite());
    }
}
