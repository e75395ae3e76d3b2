//! Step-response performance metrics.
//!
//! Computes rise time, settling time, overshoot and steady-state error from a
//! recorded speed trajectory against a fixed reference. Metrics that are not
//! reached within the horizon are `None`, never a numeric placeholder.

use mf_core::nan_max;
use mf_sim::Trajectory;
use serde::{Deserialize, Serialize};

/// Fraction of the reference that counts as "risen".
pub const RISE_FRACTION: f64 = 0.9;

/// Half-width of the settling band as a fraction of the reference.
pub const SETTLING_BAND: f64 = 0.02;

/// Standard step-response metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// First time omega reaches 90% of the reference (seconds)
    pub rise_time: Option<f64>,
    /// Time of the last excursion outside the ±2% band (seconds)
    pub settling_time: Option<f64>,
    /// Peak excursion above the reference, percent of reference
    pub overshoot_pct: Option<f64>,
    /// |omega_ref - omega_final|
    pub steady_state_error: Option<f64>,
}

impl PerformanceMetrics {
    /// Returns true if at least some metrics were computed
    pub fn has_data(&self) -> bool {
        self.rise_time.is_some()
            || self.settling_time.is_some()
            || self.overshoot_pct.is_some()
            || self.steady_state_error.is_some()
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::RiseTime => self.rise_time,
            Metric::SettlingTime => self.settling_time,
            Metric::OvershootPct => self.overshoot_pct,
            Metric::SteadyStateError => self.steady_state_error,
        }
    }
}

/// Identifies one of the four metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    RiseTime,
    SettlingTime,
    OvershootPct,
    SteadyStateError,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::RiseTime,
        Metric::SettlingTime,
        Metric::OvershootPct,
        Metric::SteadyStateError,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Metric::RiseTime => "rise_time_s",
            Metric::SettlingTime => "settling_time_s",
            Metric::OvershootPct => "overshoot_pct",
            Metric::SteadyStateError => "steady_state_error",
        }
    }
}

/// Compute all metrics for a trajectory tracking `omega_ref`.
///
/// An empty trajectory yields all `None`. NaN and infinite samples are not
/// trapped; they flow into overshoot and steady-state error as-is.
pub fn extract_metrics(traj: &Trajectory, omega_ref: f64) -> PerformanceMetrics {
    if traj.is_empty() {
        return PerformanceMetrics::default();
    }

    let peak = nan_max(traj.omega.iter().copied());

    PerformanceMetrics {
        rise_time: rise_time(traj, omega_ref),
        settling_time: settling_time(traj, omega_ref, SETTLING_BAND),
        overshoot_pct: peak.map(|p| (p - omega_ref) / omega_ref * 100.0),
        steady_state_error: traj.final_omega().map(|w| (omega_ref - w).abs()),
    }
}

/// First sample time with `omega >= 0.9 * omega_ref`, scanning forward.
fn rise_time(traj: &Trajectory, omega_ref: f64) -> Option<f64> {
    let target = RISE_FRACTION * omega_ref;
    traj.samples().find(|(_, w)| *w >= target).map(|(t, _)| t)
}

/// Scanning backward from the final sample, the first time the response is
/// outside `omega_ref ± band * |omega_ref|`.
///
/// This is the last moment the response left the band; after it the
/// response stays inside. `None` means it never left the band.
fn settling_time(traj: &Trajectory, omega_ref: f64, band: f64) -> Option<f64> {
    let tolerance = band * omega_ref.abs();
    traj.samples()
        .rev()
        .find(|(_, w)| (w - omega_ref).abs() > tolerance)
        .map(|(t, _)| t)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn below_reference_never_overshoots(
            values in prop::collection::vec(0.0_f64..100.0, 1..200),
        ) {
            let time: Vec<f64> = (1..=values.len()).map(|i| i as f64 * 0.01).collect();
            let t = Trajectory::from_samples(time, values);
            let m = extract_metrics(&t, 100.0);
            prop_assert!(m.overshoot_pct.unwrap() <= 0.0);
        }

        #[test]
        fn settling_time_is_last_violation(
            values in prop::collection::vec(90.0_f64..110.0, 1..200),
        ) {
            let time: Vec<f64> = (1..=values.len()).map(|i| i as f64).collect();
            let t = Trajectory::from_samples(time.clone(), values.clone());
            let m = extract_metrics(&t, 100.0);
            match m.settling_time {
                None => prop_assert!(values.iter().all(|w| (w - 100.0).abs() <= 2.0)),
                Some(ts) => {
                    let idx = time.iter().position(|t| *t == ts).unwrap();
                    prop_assert!((values[idx] - 100.0).abs() > 2.0);
                    prop_assert!(values[idx + 1..].iter().all(|w| (w - 100.0).abs() <= 2.0));
                }
            }
        }

        #[test]
        fn rise_time_precedes_no_earlier_crossing(
            values in prop::collection::vec(0.0_f64..120.0, 1..200),
        ) {
            let time: Vec<f64> = (1..=values.len()).map(|i| i as f64).collect();
            let t = Trajectory::from_samples(time.clone(), values.clone());
            let m = extract_metrics(&t, 100.0);
            match m.rise_time {
                None => prop_assert!(values.iter().all(|w| *w < 90.0)),
                Some(tr) => {
                    let idx = time.iter().position(|t| *t == tr).unwrap();
                    prop_assert!(values[idx] >= 90.0);
                    prop_assert!(values[..idx].iter().all(|w| *w < 90.0));
                }
            }
        }
    }
}
