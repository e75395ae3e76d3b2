//! Study execution service.
//!
//! A study runs the nominal motor once, then for every configured strategy
//! draws an ensemble, simulates it, extracts metrics and aggregates them.

use std::time::Instant;

use mf_sampling::{SamplingStrategy, sample_ensemble, strategy_rng};
use mf_sim::{MotorParameters, Trajectory, simulate_step_response};

use crate::ensemble::{EnsembleRun, run_ensemble};
use crate::error::AppResult;
use crate::metrics::{PerformanceMetrics, extract_metrics};
use crate::stats::{MetricsSummary, TrajectoryEnvelope, summarize_metrics, trajectory_envelope};
use crate::study::{StudyConfig, validate_study};

/// Step response of the nominal motor (distribution means).
#[derive(Debug, Clone)]
pub struct NominalOutcome {
    pub params: MotorParameters,
    pub trajectory: Trajectory,
    pub metrics: PerformanceMetrics,
}

/// Everything produced for one sampling strategy.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub strategy: SamplingStrategy,
    pub run: EnsembleRun,
    /// Per-sample metrics, in sample order
    pub metrics: Vec<PerformanceMetrics>,
    pub summary: MetricsSummary,
    pub envelope: TrajectoryEnvelope,
    pub non_finite: usize,
    pub elapsed_s: f64,
}

/// Result of a whole study.
#[derive(Debug, Clone)]
pub struct StudyOutcome {
    pub study: StudyConfig,
    pub nominal: NominalOutcome,
    pub strategies: Vec<StrategyOutcome>,
}

impl StudyOutcome {
    pub fn strategy(&self, strategy: SamplingStrategy) -> Option<&StrategyOutcome> {
        self.strategies.iter().find(|s| s.strategy == strategy)
    }
}

/// Run the nominal case only.
pub fn run_nominal(study: &StudyConfig) -> AppResult<NominalOutcome> {
    let params = study.distribution_table()?.nominal();
    let trajectory = simulate_step_response(&params, &study.gains, &study.simulation)?;
    let metrics = extract_metrics(&trajectory, study.gains.omega_ref);
    Ok(NominalOutcome {
        params,
        trajectory,
        metrics,
    })
}

/// Validate and run a study.
pub fn run_study(study: &StudyConfig) -> AppResult<StudyOutcome> {
    validate_study(study)?;
    let table = study.distribution_table()?;

    tracing::info!(
        name = %study.name,
        seed = study.seed,
        n_samples = study.n_samples,
        strategies = study.strategies.len(),
        "starting study"
    );

    let nominal = run_nominal(study)?;
    tracing::debug!(metrics = ?nominal.metrics, "nominal run complete");

    let mut strategies = Vec::with_capacity(study.strategies.len());
    for &strategy in &study.strategies {
        let started = Instant::now();

        let mut rng = strategy_rng(study.seed, strategy);
        let ensemble = sample_ensemble(
            strategy,
            &table,
            study.n_samples,
            study.importance_std_scale,
            &mut rng,
        )?;

        let run = run_ensemble(&ensemble, &study.gains, &study.simulation, study.execution)?;
        let metrics = run.metrics(study.gains.omega_ref);
        let summary = summarize_metrics(&metrics)?;
        let envelope = trajectory_envelope(&run.trajectories)?;
        let non_finite = run.non_finite_count();
        let elapsed_s = started.elapsed().as_secs_f64();

        tracing::info!(
            %strategy,
            samples = run.len(),
            non_finite,
            elapsed_s,
            "strategy complete"
        );

        strategies.push(StrategyOutcome {
            strategy,
            run,
            metrics,
            summary,
            envelope,
            non_finite,
            elapsed_s,
        });
    }

    Ok(StudyOutcome {
        study: study.clone(),
        nominal,
        strategies,
    })
}
