//! Closed-loop step response of the nominal motor.

use mf_controls::ControllerGains;
use mf_sim::{IntegratorType, MotorParameters, StepResponseOptions, simulate_step_response};

fn nominal() -> (MotorParameters, ControllerGains, StepResponseOptions) {
    let params = MotorParameters {
        r: 1.0,
        l: 0.01,
        kb: 0.05,
        kt: 0.05,
        j: 0.01,
        b: 0.001,
    };
    let gains = ControllerGains::new(1.0, 10.0, 0.01, 100.0).expect("valid gains");
    let opts = StepResponseOptions {
        t_max: 2.0,
        dt: 0.001,
        integrator: IntegratorType::default(),
    };
    (params, gains, opts)
}

#[test]
fn nominal_response_converges_to_reference() {
    let (params, gains, opts) = nominal();
    let traj = simulate_step_response(&params, &gains, &opts).expect("simulation should run");

    assert_eq!(traj.len(), 2000);
    assert!(traj.is_finite(), "trajectory diverged");

    let peak = traj.omega.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(peak < 200.0, "peak {peak} suggests divergence");

    let final_omega = traj.final_omega().expect("non-empty");
    assert!(
        (final_omega - 100.0).abs() < 3.0,
        "final omega {final_omega} not within a few percent of 100"
    );
}

#[test]
fn identical_inputs_give_identical_trajectories() {
    let (params, gains, opts) = nominal();
    let a = simulate_step_response(&params, &gains, &opts).unwrap();
    let b = simulate_step_response(&params, &gains, &opts).unwrap();
    assert_eq!(a, b);
}

#[test]
fn fixed_and_adaptive_integrators_agree() {
    let (params, gains, opts) = nominal();
    let adaptive = simulate_step_response(&params, &gains, &opts).unwrap();
    let rk4 = simulate_step_response(
        &params,
        &gains,
        &StepResponseOptions {
            integrator: IntegratorType::RK4,
            ..opts
        },
    )
    .unwrap();

    for (a, b) in adaptive.omega.iter().zip(&rk4.omega) {
        assert!((a - b).abs() < 0.05, "adaptive {a} vs rk4 {b}");
    }
}

#[test]
fn voltage_follows_pid_law_on_start_of_step_speed() {
    let (params, gains, opts) = nominal();
    let traj = simulate_step_response(&params, &gains, &opts).unwrap();
    assert_eq!(traj.voltage.len(), traj.len());
    assert_eq!(traj.current.len(), traj.len());

    // Step k reads omega at the end of step k-1 (zero at k = 0).
    let mut integral = 0.0;
    let mut prev_error = gains.omega_ref;
    for k in 0..traj.len() {
        let omega_start = if k == 0 { 0.0 } else { traj.omega[k - 1] };
        let error = gains.omega_ref - omega_start;
        integral += error * opts.dt;
        let expected = gains.kp * error
            + gains.ki * integral
            + gains.kd * (error - prev_error) / opts.dt;
        prev_error = error;
        assert!(
            (traj.voltage[k] - expected).abs() <= 1e-9 * expected.abs().max(1.0),
            "step {k}: {} vs {expected}",
            traj.voltage[k]
        );
    }
}
