//! Closed-loop step-response simulation for a PID-regulated DC motor.
//!
//! Provides:
//! - Armature/rotor ODE right-hand side
//! - Fixed-step RK4 and forward Euler integrators
//! - Adaptive Dormand-Prince 5(4) integrator that refines inside a step
//! - Step-response driver coupling the PID controller and plant on one clock

pub mod error;
pub mod grid;
pub mod integrator;
pub mod model;
pub mod motor;
pub mod step_response;

// Re-exports for public API
pub use error::{SimError, SimResult};
pub use grid::StepGrid;
pub use integrator::{Dopri45, ForwardEuler, Integrator, RK4};
pub use model::TransientModel;
pub use motor::{HeldVoltageMotor, MotorParam, MotorParameters, MotorState};
pub use step_response::{IntegratorType, StepResponseOptions, Trajectory, simulate_step_response};
