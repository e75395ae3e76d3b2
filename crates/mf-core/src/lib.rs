//! mf-core: shared foundation for motorflow.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers + population moments)
//! - error (shared error types)

pub mod error;
pub mod numeric;

pub use error::MfError;
pub use numeric::*;
