//! Error types for ensemble sampling.

use mf_sim::MotorParam;
use thiserror::Error;

pub type SamplingResult<T> = Result<T, SamplingError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplingError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Distribution table has no entry for {param}")]
    MissingParameter { param: MotorParam },

    #[error("Distribution table has more than one entry for {param}")]
    DuplicateParameter { param: MotorParam },

    #[error("Invalid distribution for {param}: {message}")]
    Distribution { param: MotorParam, message: String },
}
