//! Armature-controlled DC motor dynamics.

use serde::{Deserialize, Serialize};

use crate::error::SimResult;
use crate::model::TransientModel;

/// Physical parameters of a DC motor.
///
/// Models the coupled electrical and mechanical dynamics:
///
/// ```text
/// L * dia/dt    = Va - R*ia - Kb*ω
/// J * dω/dt     = Kt*ia - B*ω
/// ```
///
/// Values are not validated. Zero `l` or `j` produces non-finite derivatives
/// that propagate through the trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotorParameters {
    /// Armature resistance (Ω)
    pub r: f64,
    /// Armature inductance (H)
    pub l: f64,
    /// Back-EMF constant (V·s/rad)
    pub kb: f64,
    /// Torque constant (N·m/A)
    pub kt: f64,
    /// Rotor inertia (kg·m²)
    pub j: f64,
    /// Viscous damping (N·m·s/rad)
    pub b: f64,
}

impl Default for MotorParameters {
    fn default() -> Self {
        Self {
            r: 1.0,
            l: 0.01,
            kb: 0.05,
            kt: 0.05,
            j: 0.01,
            b: 0.001,
        }
    }
}

/// Identifies one of the six motor parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MotorParam {
    R,
    L,
    Kb,
    Kt,
    J,
    B,
}

impl MotorParam {
    /// All parameters in canonical order.
    pub const ALL: [MotorParam; 6] = [
        MotorParam::R,
        MotorParam::L,
        MotorParam::Kb,
        MotorParam::Kt,
        MotorParam::J,
        MotorParam::B,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MotorParam::R => "R",
            MotorParam::L => "L",
            MotorParam::Kb => "Kb",
            MotorParam::Kt => "Kt",
            MotorParam::J => "J",
            MotorParam::B => "B",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            MotorParam::R => "ohm",
            MotorParam::L => "H",
            MotorParam::Kb => "V*s/rad",
            MotorParam::Kt => "N*m/A",
            MotorParam::J => "kg*m^2",
            MotorParam::B => "N*m*s/rad",
        }
    }
}

impl std::fmt::Display for MotorParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl MotorParameters {
    pub fn get(&self, param: MotorParam) -> f64 {
        match param {
            MotorParam::R => self.r,
            MotorParam::L => self.l,
            MotorParam::Kb => self.kb,
            MotorParam::Kt => self.kt,
            MotorParam::J => self.j,
            MotorParam::B => self.b,
        }
    }

    pub fn set(&mut self, param: MotorParam, value: f64) {
        match param {
            MotorParam::R => self.r = value,
            MotorParam::L => self.l = value,
            MotorParam::Kb => self.kb = value,
            MotorParam::Kt => self.kt = value,
            MotorParam::J => self.j = value,
            MotorParam::B => self.b = value,
        }
    }

    /// Build from values ordered as [`MotorParam::ALL`].
    pub fn from_array(values: [f64; 6]) -> Self {
        let mut p = Self::default();
        for (param, value) in MotorParam::ALL.into_iter().zip(values) {
            p.set(param, value);
        }
        p
    }

    /// Values ordered as [`MotorParam::ALL`].
    pub fn to_array(&self) -> [f64; 6] {
        MotorParam::ALL.map(|param| self.get(param))
    }

    /// True when every parameter is finite.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Time derivative of the motor state under armature voltage `va`.
    pub fn derivative(&self, state: &MotorState, va: f64) -> MotorState {
        let dia_dt = (va - self.r * state.ia - self.kb * state.omega) / self.l;
        let domega_dt = (self.kt * state.ia - self.b * state.omega) / self.j;
        MotorState {
            ia: dia_dt,
            omega: domega_dt,
        }
    }
}

/// Electrical and mechanical state of the motor.
///
/// Also used for state derivatives and error vectors during integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorState {
    /// Armature current (A)
    pub ia: f64,
    /// Angular velocity (rad/s)
    pub omega: f64,
}

/// Motor driven by a voltage that is constant over one integration call.
#[derive(Clone, Debug)]
pub struct HeldVoltageMotor {
    pub params: MotorParameters,
    /// Armature voltage held by the zero-order hold (V)
    pub voltage: f64,
}

impl HeldVoltageMotor {
    pub fn new(params: MotorParameters) -> Self {
        Self {
            params,
            voltage: 0.0,
        }
    }
}

impl TransientModel for HeldVoltageMotor {
    type State = MotorState;

    fn initial_state(&self) -> MotorState {
        MotorState::default()
    }

    fn rhs(&mut self, _t: f64, x: &MotorState) -> SimResult<MotorState> {
        Ok(self.params.derivative(x, self.voltage))
    }

    fn add(&self, a: &MotorState, b: &MotorState) -> MotorState {
        MotorState {
            ia: a.ia + b.ia,
            omega: a.omega + b.omega,
        }
    }

    fn scale(&self, a: &MotorState, scale: f64) -> MotorState {
        MotorState {
            ia: a.ia * scale,
            omega: a.omega * scale,
        }
    }

    fn error_norm(
        &self,
        err: &MotorState,
        x: &MotorState,
        x_new: &MotorState,
        atol: f64,
        rtol: f64,
    ) -> f64 {
        let e_ia = err.ia / (atol + rtol * x.ia.abs().max(x_new.ia.abs()));
        let e_omega = err.omega / (atol + rtol * x.omega.abs().max(x_new.omega.abs()));
        (0.5 * (e_ia * e_ia + e_omega * e_omega)).sqrt()
    }
}
