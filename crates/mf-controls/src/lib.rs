//! Feedback control primitives for motorflow.
//!
//! The controller here is a discrete PID evaluated once per simulation step.
//! It shares its clock with the plant integration: the voltage it returns is
//! held constant (zero-order hold) until the next step.

pub mod controller;
pub mod error;

pub use controller::{ControllerGains, ControllerState, PidController};
pub use error::{ControlError, ControlResult};
