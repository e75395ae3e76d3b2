//! Parameter ensembles for motor uncertainty studies.
//!
//! Produces vectors of [`MotorParameters`](mf_sim::MotorParameters) from a
//! per-parameter distribution table under three strategies:
//! - plain Monte Carlo (independent normals)
//! - Latin Hypercube over the ±3σ range of each parameter
//! - a narrowed-variance "importance" variant of Monte Carlo
//!
//! Every strategy draws from its own seeded ChaCha8 stream so an ensemble is
//! reproducible independently of which other strategies run.

pub mod distribution;
pub mod error;
pub mod strategy;

pub use distribution::{DistributionTable, ParameterDistribution};
pub use error::{SamplingError, SamplingResult};
pub use strategy::{ParameterEnsemble, SamplingStrategy, sample_ensemble, strategy_rng};
