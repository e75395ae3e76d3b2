//! Fixed step grid shared by the controller and the plant.
//!
//! The controller is sampled once per step and its output held constant
//! (zero-order hold) while the plant is integrated over that step, so both
//! run on the same clock.

use mf_core::{Tolerances, ensure_finite, ensure_positive, nearly_equal};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Upper bound on the number of steps in one run.
pub const MAX_STEPS: usize = 100_000_000;

/// Step size and horizon of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepGrid {
    /// Step period in seconds.
    pub dt: f64,
    /// Simulation horizon in seconds.
    pub t_max: f64,
}

impl StepGrid {
    /// Create a validated grid.
    ///
    /// `dt` must be positive and finite, `t_max` finite and non-negative,
    /// and the horizon must fit in at most [`MAX_STEPS`] steps.
    pub fn new(dt: f64, t_max: f64) -> SimResult<Self> {
        ensure_positive(dt, "dt").map_err(|_| SimError::InvalidArg {
            what: "dt must be positive and finite",
        })?;
        ensure_finite(t_max, "t_max").map_err(|_| SimError::InvalidArg {
            what: "t_max must be non-negative and finite",
        })?;
        if t_max < 0.0 {
            return Err(SimError::InvalidArg {
                what: "t_max must be non-negative and finite",
            });
        }
        // Compare in f64 before any cast to usize can saturate
        if (t_max / dt).ceil() > MAX_STEPS as f64 {
            return Err(SimError::InvalidArg {
                what: "t_max / dt exceeds the step limit",
            });
        }
        Ok(Self { dt, t_max })
    }

    /// Number of steps, `ceil(t_max / dt)`.
    ///
    /// A ratio within round-off of an integer is snapped to it, so
    /// `2.0 / 0.001` gives 2000 rather than 2001.
    pub fn n_steps(&self) -> usize {
        let ratio = self.t_max / self.dt;
        let nearest = ratio.round();
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-9,
        };
        if nearly_equal(ratio, nearest, tol) {
            nearest as usize
        } else {
            ratio.ceil() as usize
        }
    }

    /// Start time of step `i`.
    pub fn step_start(&self, i: usize) -> f64 {
        i as f64 * self.dt
    }

    /// Times at which samples are recorded: the end of every step.
    pub fn sample_times(&self) -> Vec<f64> {
        (1..=self.n_steps()).map(|i| self.step_start(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_steps_snaps_round_off() {
        let g = StepGrid::new(0.001, 2.0).unwrap();
        assert_eq!(g.n_steps(), 2000);
        let g = StepGrid::new(0.1, 0.3).unwrap();
        assert_eq!(g.n_steps(), 3);
    }

    #[test]
    fn n_steps_rounds_up_partial_step() {
        let g = StepGrid::new(0.3, 1.0).unwrap();
        assert_eq!(g.n_steps(), 4);
    }

    #[test]
    fn zero_horizon_has_no_steps() {
        let g = StepGrid::new(0.01, 0.0).unwrap();
        assert_eq!(g.n_steps(), 0);
        assert!(g.sample_times().is_empty());
    }

    #[test]
    fn sample_times_are_step_ends() {
        let g = StepGrid::new(0.25, 1.0).unwrap();
        assert_eq!(g.sample_times(), vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn invalid_grid_rejected() {
        for (dt, t_max) in [
            (0.0, 1.0),
            (-0.1, 1.0),
            (f64::NAN, 1.0),
            (f64::INFINITY, 1.0),
            (0.1, -1.0),
            (0.1, f64::INFINITY),
            (0.1, f64::NAN),
        ] {
            assert!(
                matches!(StepGrid::new(dt, t_max), Err(SimError::InvalidArg { .. })),
                "dt = {dt}, t_max = {t_max} accepted"
            );
        }
    }

    #[test]
    fn oversized_horizon_rejected() {
        assert!(matches!(
            StepGrid::new(1e-300, 1.0),
            Err(SimError::InvalidArg { .. })
        ));
        assert!(matches!(
            StepGrid::new(1e-3, 1e20),
            Err(SimError::InvalidArg { .. })
        ));
        let g = StepGrid::new(1.0, MAX_STEPS as f64).unwrap();
        assert_eq!(g.n_steps(), MAX_STEPS);
    }
}
