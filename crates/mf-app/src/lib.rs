//! Study orchestration for motorflow.
//!
//! Ties the step-response simulator to sampled parameter ensembles:
//! metric extraction, ensemble execution, aggregation, study configuration
//! and report export. Shared by the CLI and tests.

pub mod ensemble;
pub mod error;
pub mod metrics;
pub mod report;
pub mod run_service;
pub mod stats;
pub mod study;

// Re-export key types for convenience
pub use ensemble::{EnsembleRun, ExecutionMode, run_ensemble};
pub use error::{AppError, AppResult};
pub use metrics::{Metric, PerformanceMetrics, extract_metrics};
pub use report::{StudyReport, write_study_outputs, write_trajectory_csv};
pub use run_service::{NominalOutcome, StrategyOutcome, StudyOutcome, run_nominal, run_study};
pub use stats::{
    MetricStats, MetricsSummary, TrajectoryEnvelope, summarize_metrics, trajectory_envelope,
};
pub use study::{STUDY_VERSION, StudyConfig, load_study, save_study, validate_study};
