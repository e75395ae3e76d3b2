//! Ensemble aggregation.
//!
//! Metric statistics are taken over the defined subset of each metric only;
//! undefined values are excluded, not counted as zero. Non-finite values
//! that are defined still participate and propagate into mean and std.

use mf_core::{Moments, nan_max, population_moments};
use mf_sim::Trajectory;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::metrics::{Metric, PerformanceMetrics};

/// Mean and population std of one metric across an ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std: f64,
    /// Samples where the metric was defined
    pub defined: usize,
    /// Samples where it was not
    pub undefined: usize,
}

impl MetricStats {
    fn from_moments(m: Moments, total: usize) -> Self {
        Self {
            mean: m.mean,
            std: m.std,
            defined: m.count,
            undefined: total - m.count,
        }
    }

    /// True when at least one sample contributed.
    pub fn is_defined(&self) -> bool {
        self.defined > 0
    }
}

/// Per-metric statistics for one ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub n_samples: usize,
    pub rise_time: MetricStats,
    pub settling_time: MetricStats,
    pub overshoot_pct: MetricStats,
    pub steady_state_error: MetricStats,
}

impl MetricsSummary {
    pub fn get(&self, metric: Metric) -> &MetricStats {
        match metric {
            Metric::RiseTime => &self.rise_time,
            Metric::SettlingTime => &self.settling_time,
            Metric::OvershootPct => &self.overshoot_pct,
            Metric::SteadyStateError => &self.steady_state_error,
        }
    }
}

/// Aggregate metrics over an ensemble.
///
/// A metric that is undefined for every sample aggregates to NaN mean and std.
pub fn summarize_metrics(metrics: &[PerformanceMetrics]) -> AppResult<MetricsSummary> {
    if metrics.is_empty() {
        return Err(AppError::InvalidInput(
            "cannot summarize an empty ensemble".to_string(),
        ));
    }

    let total = metrics.len();
    let stats = |metric: Metric| {
        let defined: Vec<f64> = metrics.iter().filter_map(|m| m.get(metric)).collect();
        MetricStats::from_moments(population_moments(&defined), total)
    };

    Ok(MetricsSummary {
        n_samples: total,
        rise_time: stats(Metric::RiseTime),
        settling_time: stats(Metric::SettlingTime),
        overshoot_pct: stats(Metric::OvershootPct),
        steady_state_error: stats(Metric::SteadyStateError),
    })
}

/// Pointwise speed statistics across trajectories sharing one time grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryEnvelope {
    pub time: Vec<f64>,
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl TrajectoryEnvelope {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Build the speed envelope of an ensemble.
///
/// All trajectories must have the same length; the time column is taken
/// from the first one. NaN samples propagate into every statistic at that
/// time index.
pub fn trajectory_envelope(trajectories: &[Trajectory]) -> AppResult<TrajectoryEnvelope> {
    let first = trajectories.first().ok_or_else(|| {
        AppError::InvalidInput("cannot build an envelope of zero trajectories".to_string())
    })?;
    let n = first.len();
    if let Some(bad) = trajectories.iter().find(|t| t.len() != n) {
        return Err(AppError::InvalidInput(format!(
            "trajectory length mismatch: expected {n} samples, got {}",
            bad.len()
        )));
    }

    let mut env = TrajectoryEnvelope {
        time: first.time.clone(),
        mean: Vec::with_capacity(n),
        std: Vec::with_capacity(n),
        min: Vec::with_capacity(n),
        max: Vec::with_capacity(n),
    };

    let mut column = Vec::with_capacity(trajectories.len());
    for k in 0..n {
        column.clear();
        column.extend(trajectories.iter().map(|t| t.omega[k]));

        let m = population_moments(&column);
        env.mean.push(m.mean);
        env.std.push(m.std);
        env.max.push(nan_max(column.iter().copied()).unwrap_or(f64::NAN));
        env.min
            .push(-nan_max(column.iter().map(|v| -v)).unwrap_or(f64::NAN));
    }

    Ok(env)
}
