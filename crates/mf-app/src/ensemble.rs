//! Ensemble execution.
//!
//! Every parameter vector gets its own closed-loop run with its own
//! controller and plant state; nothing is shared between runs, so the
//! parallel path is a plain order-preserving `par_iter().collect()`.

use std::time::Instant;

use mf_controls::ControllerGains;
use mf_sampling::{ParameterEnsemble, SamplingStrategy};
use mf_sim::{MotorParameters, StepResponseOptions, Trajectory, simulate_step_response};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::metrics::{PerformanceMetrics, extract_metrics};

/// How ensemble members are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Sequential,
    #[default]
    Parallel,
}

/// Trajectories of one ensemble, in sample order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleRun {
    pub strategy: SamplingStrategy,
    pub samples: Vec<MotorParameters>,
    /// Shared time grid, taken from the first trajectory
    pub time: Vec<f64>,
    pub trajectories: Vec<Trajectory>,
}

impl EnsembleRun {
    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }

    /// Metrics per member, in sample order.
    pub fn metrics(&self, omega_ref: f64) -> Vec<PerformanceMetrics> {
        self.trajectories
            .iter()
            .map(|t| extract_metrics(t, omega_ref))
            .collect()
    }

    /// Members whose speed trace contains NaN or infinity.
    pub fn non_finite_count(&self) -> usize {
        self.trajectories.iter().filter(|t| !t.is_finite()).count()
    }
}

/// Run the simulator once per parameter vector.
pub fn run_ensemble(
    ensemble: &ParameterEnsemble,
    gains: &ControllerGains,
    opts: &StepResponseOptions,
    mode: ExecutionMode,
) -> AppResult<EnsembleRun> {
    // Reject a bad grid once instead of once per member
    opts.grid()?;

    let started = Instant::now();
    let non_finite_params = ensemble.iter().filter(|p| !p.is_finite()).count();
    if non_finite_params > 0 {
        tracing::warn!(
            strategy = %ensemble.strategy,
            non_finite_params,
            "ensemble contains non-finite parameter vectors"
        );
    }
    tracing::info!(
        strategy = %ensemble.strategy,
        samples = ensemble.len(),
        ?mode,
        "running ensemble"
    );

    let run_one = |params: &MotorParameters| simulate_step_response(params, gains, opts);
    let trajectories = match mode {
        ExecutionMode::Sequential => ensemble.iter().map(run_one).collect::<Result<Vec<_>, _>>()?,
        ExecutionMode::Parallel => ensemble
            .samples
            .par_iter()
            .map(run_one)
            .collect::<Result<Vec<_>, _>>()?,
    };

    let time = trajectories
        .first()
        .map(|t| t.time.clone())
        .unwrap_or_default();

    let run = EnsembleRun {
        strategy: ensemble.strategy,
        samples: ensemble.samples.clone(),
        time,
        trajectories,
    };

    let non_finite = run.non_finite_count();
    if non_finite > 0 {
        tracing::warn!(
            strategy = %ensemble.strategy,
            non_finite,
            "ensemble members produced non-finite trajectories"
        );
    }
    tracing::debug!(
        strategy = %ensemble.strategy,
        elapsed_s = started.elapsed().as_secs_f64(),
        "ensemble complete"
    );

    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mf_sim::IntegratorType;

    fn short_opts() -> StepResponseOptions {
        StepResponseOptions {
            t_max: 0.05,
            dt: 1e-3,
            integrator: IntegratorType::RK4,
        }
    }

    fn ensemble(samples: Vec<MotorParameters>) -> ParameterEnsemble {
        ParameterEnsemble {
            strategy: SamplingStrategy::MonteCarlo,
            samples,
        }
    }

    #[test]
    fn sample_order_is_preserved() {
        let mut slow = MotorParameters::default();
        slow.j = 0.1;
        let ens = ensemble(vec![MotorParameters::default(), slow]);
        let run = run_ensemble(
            &ens,
            &ControllerGains::default(),
            &short_opts(),
            ExecutionMode::Parallel,
        )
        .unwrap();

        assert_eq!(run.len(), 2);
        assert_eq!(run.samples, ens.samples);
        // Heavier rotor accelerates slower
        assert!(run.trajectories[0].final_omega() > run.trajectories[1].final_omega());
        assert_eq!(run.time, run.trajectories[0].time);
    }

    #[test]
    fn non_finite_members_are_counted_not_dropped() {
        let mut broken = MotorParameters::default();
        broken.j = 0.0;
        let ens = ensemble(vec![MotorParameters::default(), broken]);
        let run = run_ensemble(
            &ens,
            &ControllerGains::default(),
            &short_opts(),
            ExecutionMode::Sequential,
        )
        .unwrap();
        assert_eq!(run.len(), 2);
        assert_eq!(run.non_finite_count(), 1);
    }

    #[test]
    fn invalid_grid_rejected() {
        let opts = StepResponseOptions {
            dt: -1.0,
            ..short_opts()
        };
        let ens = ensemble(vec![MotorParameters::default()]);
        assert!(
            run_ensemble(&ens, &ControllerGains::default(), &opts, ExecutionMode::Parallel)
                .is_err()
        );
    }
}
