//! Study configuration: YAML schema, defaults, validation and file I/O.

use std::collections::HashSet;
use std::path::Path;

use mf_controls::ControllerGains;
use mf_sampling::{DistributionTable, ParameterDistribution, SamplingStrategy};
use mf_sim::{IntegratorType, StepResponseOptions};
use serde::{Deserialize, Serialize};

use crate::ensemble::ExecutionMode;
use crate::error::{AppError, AppResult};

/// Current study file version.
pub const STUDY_VERSION: u32 = 1;

/// A complete uncertainty study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyConfig {
    pub version: u32,
    pub name: String,
    /// Base seed; each strategy derives its own stream from it
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_n_samples")]
    pub n_samples: usize,
    #[serde(default)]
    pub gains: ControllerGains,
    #[serde(default)]
    pub simulation: StepResponseOptions,
    /// One row per motor parameter, any order
    pub parameters: Vec<ParameterDistribution>,
    #[serde(default = "default_strategies")]
    pub strategies: Vec<SamplingStrategy>,
    #[serde(default = "default_importance_std_scale")]
    pub importance_std_scale: f64,
    #[serde(default)]
    pub execution: ExecutionMode,
}

fn default_seed() -> u64 {
    2026
}

fn default_n_samples() -> usize {
    200
}

fn default_strategies() -> Vec<SamplingStrategy> {
    SamplingStrategy::ALL.to_vec()
}

fn default_importance_std_scale() -> f64 {
    0.5
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            version: STUDY_VERSION,
            name: "nominal-study".to_string(),
            seed: default_seed(),
            n_samples: default_n_samples(),
            gains: ControllerGains::default(),
            simulation: StepResponseOptions::default(),
            parameters: DistributionTable::default().into(),
            strategies: default_strategies(),
            importance_std_scale: default_importance_std_scale(),
            execution: ExecutionMode::default(),
        }
    }
}

impl StudyConfig {
    /// Parameter rows as a validated table.
    pub fn distribution_table(&self) -> AppResult<DistributionTable> {
        DistributionTable::new(self.parameters.clone())
            .map_err(|e| AppError::Validation(format!("parameters: {e}")))
    }
}

/// Check a study for structural and numeric problems.
pub fn validate_study(study: &StudyConfig) -> AppResult<()> {
    if study.version != STUDY_VERSION {
        return Err(AppError::Validation(format!(
            "unsupported study version {} (expected {STUDY_VERSION})",
            study.version
        )));
    }
    if study.n_samples == 0 {
        return Err(invalid("n_samples", study.n_samples, "must be at least 1"));
    }

    ControllerGains::new(
        study.gains.kp,
        study.gains.ki,
        study.gains.kd,
        study.gains.omega_ref,
    )?;

    let sim = &study.simulation;
    if !(sim.dt.is_finite() && sim.dt > 0.0) {
        return Err(invalid("simulation.dt", sim.dt, "must be positive and finite"));
    }
    if !(sim.t_max.is_finite() && sim.t_max >= 0.0) {
        return Err(invalid(
            "simulation.t_max",
            sim.t_max,
            "must be non-negative and finite",
        ));
    }
    if let IntegratorType::Dopri45 { rtol, atol } = sim.integrator {
        if !(rtol.is_finite() && rtol > 0.0) {
            return Err(invalid("simulation.integrator.rtol", rtol, "must be positive"));
        }
        if !(atol.is_finite() && atol > 0.0) {
            return Err(invalid("simulation.integrator.atol", atol, "must be positive"));
        }
    }

    study.distribution_table()?;

    if study.strategies.is_empty() {
        return Err(AppError::Validation(
            "strategies: at least one sampling strategy is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for strategy in &study.strategies {
        if !seen.insert(strategy) {
            return Err(AppError::Validation(format!(
                "strategies: duplicate entry {strategy}"
            )));
        }
    }

    let scale = study.importance_std_scale;
    if !(scale.is_finite() && scale > 0.0 && scale <= 1.0) {
        return Err(invalid("importance_std_scale", scale, "must be in (0, 1]"));
    }

    Ok(())
}

fn invalid(field: &str, value: impl std::fmt::Display, reason: &str) -> AppError {
    AppError::Validation(format!("{field} = {value} ({reason})"))
}

/// Load and validate a study from a YAML file.
pub fn load_study(path: &Path) -> AppResult<StudyConfig> {
    let content = std::fs::read_to_string(path).map_err(|source| AppError::StudyFileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let study: StudyConfig = serde_yaml::from_str(&content)?;
    validate_study(&study)?;
    Ok(study)
}

/// Validate and write a study as YAML.
pub fn save_study(path: &Path, study: &StudyConfig) -> AppResult<()> {
    validate_study(study)?;
    let content = serde_yaml::to_string(study)?;
    std::fs::write(path, content).map_err(|source| AppError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}
