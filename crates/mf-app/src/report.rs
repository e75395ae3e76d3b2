//! Study report export: JSON summary and CSV tables.

use std::fs;
use std::path::{Path, PathBuf};

use csv::Writer;
use mf_sampling::SamplingStrategy;
use mf_sim::{MotorParam, Trajectory};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::metrics::{Metric, PerformanceMetrics};
use crate::run_service::{StrategyOutcome, StudyOutcome};
use crate::stats::{MetricsSummary, TrajectoryEnvelope};

/// Serializable digest of a study outcome.
#[derive(Debug, Clone, Serialize)]
pub struct StudyReport {
    pub name: String,
    pub seed: u64,
    pub n_samples: usize,
    pub omega_ref: f64,
    pub nominal: PerformanceMetrics,
    pub strategies: Vec<StrategyReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyReport {
    pub strategy: SamplingStrategy,
    pub summary: MetricsSummary,
    pub non_finite_trajectories: usize,
    pub elapsed_s: f64,
}

impl StudyReport {
    pub fn from_outcome(outcome: &StudyOutcome) -> Self {
        Self {
            name: outcome.study.name.clone(),
            seed: outcome.study.seed,
            n_samples: outcome.study.n_samples,
            omega_ref: outcome.study.gains.omega_ref,
            nominal: outcome.nominal.metrics,
            strategies: outcome
                .strategies
                .iter()
                .map(|s| StrategyReport {
                    strategy: s.strategy,
                    summary: s.summary,
                    non_finite_trajectories: s.non_finite,
                    elapsed_s: s.elapsed_s,
                })
                .collect(),
        }
    }
}

fn fmt_f64(value: f64) -> String {
    format!("{value:.10}")
}

fn fmt_option_f64(value: Option<f64>) -> String {
    value.map(fmt_f64).unwrap_or_default()
}

fn ensure_parent(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AppError::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Pretty JSON summary. NaN statistics are written as `null`.
pub fn write_summary_json(path: &Path, report: &StudyReport) -> AppResult<()> {
    ensure_parent(path)?;
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content).map_err(|source| AppError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// One row per ensemble member: parameters then metrics, undefined as empty.
pub fn write_samples_csv(path: &Path, strategies: &[StrategyOutcome]) -> AppResult<()> {
    ensure_parent(path)?;
    let mut writer = Writer::from_path(path)?;

    let mut header = vec!["strategy".to_string(), "sample".to_string()];
    header.extend(MotorParam::ALL.iter().map(|p| p.label().to_string()));
    header.extend(Metric::ALL.iter().map(|m| m.label().to_string()));
    writer.write_record(&header)?;

    for outcome in strategies {
        for (idx, (params, metrics)) in outcome
            .run
            .samples
            .iter()
            .zip(&outcome.metrics)
            .enumerate()
        {
            let mut row = vec![outcome.strategy.label().to_string(), idx.to_string()];
            row.extend(params.to_array().into_iter().map(fmt_f64));
            row.extend(Metric::ALL.iter().map(|m| fmt_option_f64(metrics.get(*m))));
            writer.write_record(&row)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Pointwise omega statistics across an ensemble.
pub fn write_envelope_csv(path: &Path, envelope: &TrajectoryEnvelope) -> AppResult<()> {
    ensure_parent(path)?;
    let mut writer = Writer::from_path(path)?;
    writer.write_record(["time_s", "omega_mean", "omega_std", "omega_min", "omega_max"])?;
    for k in 0..envelope.len() {
        writer.write_record([
            fmt_f64(envelope.time[k]),
            fmt_f64(envelope.mean[k]),
            fmt_f64(envelope.std[k]),
            fmt_f64(envelope.min[k]),
            fmt_f64(envelope.max[k]),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Single trajectory as `time_s,omega`, plus current and voltage when recorded.
pub fn write_trajectory_csv(path: &Path, traj: &Trajectory) -> AppResult<()> {
    ensure_parent(path)?;
    let full = traj.current.len() == traj.len() && traj.voltage.len() == traj.len();
    let mut writer = Writer::from_path(path)?;

    if full {
        writer.write_record(["time_s", "omega", "current_a", "voltage_v"])?;
    } else {
        writer.write_record(["time_s", "omega"])?;
    }

    for k in 0..traj.len() {
        if full {
            writer.write_record([
                fmt_f64(traj.time[k]),
                fmt_f64(traj.omega[k]),
                fmt_f64(traj.current[k]),
                fmt_f64(traj.voltage[k]),
            ])?;
        } else {
            writer.write_record([fmt_f64(traj.time[k]), fmt_f64(traj.omega[k])])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write every report of a study into `dir`, returning the files written.
pub fn write_study_outputs(dir: &Path, outcome: &StudyOutcome) -> AppResult<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|source| AppError::FileWrite {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();

    let summary = dir.join("summary.json");
    write_summary_json(&summary, &StudyReport::from_outcome(outcome))?;
    written.push(summary);

    let samples = dir.join("samples.csv");
    write_samples_csv(&samples, &outcome.strategies)?;
    written.push(samples);

    let nominal = dir.join("nominal_trajectory.csv");
    write_trajectory_csv(&nominal, &outcome.nominal.trajectory)?;
    written.push(nominal);

    for s in &outcome.strategies {
        let path = dir.join(format!("envelope_{}.csv", s.strategy.label()));
        write_envelope_csv(&path, &s.envelope)?;
        written.push(path);
    }

    tracing::info!(dir = %dir.display(), files = written.len(), "wrote study reports");
    Ok(written)
}
