//! Error types for the mf-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the lower crates and
/// provides a unified error interface for the CLI and tests.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Study validation failed: {0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Sampling error: {0}")]
    Sampling(String),

    #[error("Controller error: {0}")]
    Control(String),

    #[error("Failed to read study file: {path}")]
    StudyFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mf-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<mf_sim::SimError> for AppError {
    fn from(err: mf_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<mf_sampling::SamplingError> for AppError {
    fn from(err: mf_sampling::SamplingError) -> Self {
        AppError::Sampling(err.to_string())
    }
}

impl From<mf_controls::ControlError> for AppError {
    fn from(err: mf_controls::ControlError) -> Self {
        AppError::Control(err.to_string())
    }
}
