use approx::assert_relative_eq;
use nalgebra::{Unit, UnitQuaternion};
use proptest::prelude::*;

use swingsim::simulation::forces::{centripetal_force, centripetal_magnitude, tension_magnitude};
use swingsim::{
    pendulum_step, project, Anchor, AttachmentState, Bob, CommandSchedule, Engine, NVec3,
    Parameters, PivotRequest, Scenario, ScenarioConfig, SwingError, Tether, Transition,
};

const EPS: f64 = 1e-9;

/// Default physics parameters for tests
pub fn test_params() -> Parameters {
    Parameters {
        t_end: 1.0,
        h0: 0.02,
        gravity: NVec3::new(0.0, -9.81, 0.0),
        release_delay: 1.0,
        taut_eps: 1e-6,
    }
}

/// Three anchors 4 units apart along x
pub fn anchor_row() -> Vec<Anchor> {
    vec![
        Anchor::new(NVec3::new(0.0, 0.0, 0.0)),
        Anchor::new(NVec3::new(4.0, 0.5, 0.0)),
        Anchor::new(NVec3::new(8.0, 0.0, 0.0)),
    ]
}

/// Bob hanging 3 units below anchor 0, at rest
pub fn hanging_scenario(p: Parameters) -> Scenario {
    let bob = Bob::new(NVec3::new(0.0, -3.0, 0.0), NVec3::zeros(), 1.0).unwrap();
    Scenario::new(Engine::default(), p, bob, anchor_row(), CommandSchedule::default()).unwrap()
}

/// Bob pulled out to the side of anchor 0 so it swings
pub fn swinging_scenario(p: Parameters) -> Scenario {
    let bob = Bob::new(NVec3::new(-2.0, -2.2, 0.0), NVec3::zeros(), 1.0).unwrap();
    Scenario::new(Engine::default(), p, bob, anchor_row(), CommandSchedule::default()).unwrap()
}

fn distance_to_anchor(sc: &Scenario) -> Option<(f64, f64)> {
    let tether = sc.tether()?;
    Some(((sc.position() - tether.pivot).norm(), tether.length))
}

// ==================================================================================
// Force model tests
// ==================================================================================

#[test]
fn end_to_end_hanging_bob_stays_on_sphere() {
    let tether = Tether::new(NVec3::zeros(), 3.0).unwrap();
    let mut bob = Bob::new(NVec3::new(0.0, -3.0, 0.0), NVec3::zeros(), 1.0).unwrap();
    let g = NVec3::new(0.0, -9.81, 0.0);

    pendulum_step(&mut bob, Some(&tether), &g, 1e-6, 0.02);

    let d = (bob.x - tether.pivot).norm();
    assert!((d - 3.0).abs() < 1e-3, "distance after one step: {d}");
    assert!(d <= 3.0 + EPS);
}

#[test]
fn rotated_system_steps_to_rotated_state() {
    let rot = UnitQuaternion::from_axis_angle(&Unit::new_normalize(NVec3::new(1.0, 2.0, -0.5)), 1.1);
    let tether = Tether::new(NVec3::zeros(), 2.5).unwrap();
    let g = NVec3::new(0.0, -9.81, 0.0);

    let mut a = Bob::new(NVec3::new(1.5, -2.0, 0.0), NVec3::new(0.7, 0.4, -1.2), 1.3).unwrap();
    let mut b = Bob::new(rot * a.x, rot * a.v, a.m).unwrap();

    for _ in 0..50 {
        let sa = pendulum_step(&mut a, Some(&tether), &g, 1e-6, 0.01);
        let sb = pendulum_step(&mut b, Some(&tether), &(rot * g), 1e-6, 0.01);
        assert_relative_eq!(sa.centripetal_magnitude, sb.centripetal_magnitude, epsilon = 1e-9);
    }

    assert_relative_eq!(rot * a.x, b.x, epsilon = 1e-9);
    assert_relative_eq!(rot * a.v, b.v, epsilon = 1e-9);
}

proptest! {
    #[test]
    fn centripetal_is_rotation_invariant(
        v in (-10.0..10.0_f64, -10.0..10.0_f64, -10.0..10.0_f64).prop_map(|(x, y, z)| NVec3::new(x, y, z)),
        axis in (-1.0..1.0_f64, -1.0..1.0_f64, -1.0..1.0_f64).prop_map(|(x, y, z)| NVec3::new(x, y, z)),
        angle in -std::f64::consts::PI..std::f64::consts::PI,
        m in 0.1..10.0_f64,
        length in 0.5..10.0_f64,
    ) {
        prop_assume!(axis.norm() > 0.1);
        let rot = UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), angle);
        let inward = NVec3::new(0.0, 1.0, 0.0);

        let f = centripetal_force(&v, m, length, &inward);
        let f_rot = centripetal_force(&(rot * v), m, length, &(rot * inward));

        let mag = centripetal_magnitude(&v, m, length);
        let mag_rot = centripetal_magnitude(&(rot * v), m, length);
        prop_assert!((mag - mag_rot).abs() <= 1e-9 * mag.max(1.0));

        let diff = (rot * f - f_rot).norm();
        prop_assert!(diff <= 1e-9 * f.norm().max(1.0), "rotated force differs by {}", diff);
    }

    #[test]
    fn tension_depends_only_on_relative_angle(
        axis in (-1.0..1.0_f64, -1.0..1.0_f64, -1.0..1.0_f64).prop_map(|(x, y, z)| NVec3::new(x, y, z)),
        angle in -std::f64::consts::PI..std::f64::consts::PI,
        theta in 0.0..std::f64::consts::PI,
    ) {
        prop_assume!(axis.norm() > 0.1);
        let rot = UnitQuaternion::from_axis_angle(&Unit::new_normalize(axis), angle);
        let down = NVec3::new(0.0, -1.0, 0.0);
        let outward = NVec3::new(theta.sin(), -theta.cos(), 0.0);

        let t = tension_magnitude(&outward, &down, 1.0, 9.81);
        let t_rot = tension_magnitude(&(rot * outward), &(rot * down), 1.0, 9.81);

        prop_assert!((t - 9.81 * theta.cos()).abs() < 1e-9);
        prop_assert!((t - t_rot).abs() < 1e-9);
    }
}

// ==================================================================================
// Constraint solver tests
// ==================================================================================

#[test]
fn slack_step_leaves_tentative_position_alone() {
    let tether = Tether::new(NVec3::zeros(), 3.0).unwrap();
    let mut bob = Bob::new(NVec3::new(0.0, -1.0, 0.0), NVec3::zeros(), 1.0).unwrap();
    let g = NVec3::new(0.0, -9.81, 0.0);
    let dt = 0.02;

    let sample = pendulum_step(&mut bob, Some(&tether), &g, 1e-6, dt);

    // Pure semi-implicit free fall inside the sphere
    let v = g * dt;
    assert!(!sample.is_taut);
    assert_eq!(sample.tension_force, 0.0);
    assert_relative_eq!(bob.v, v, epsilon = 1e-15);
    assert_relative_eq!(bob.x, NVec3::new(0.0, -1.0, 0.0) + v * dt, epsilon = 1e-15);
}

proptest! {
    #[test]
    fn projection_lands_exactly_on_sphere(
        pivot in (-10.0..10.0_f64, -10.0..10.0_f64, -10.0..10.0_f64).prop_map(|(x, y, z)| NVec3::new(x, y, z)),
        dir in (-1.0..1.0_f64, -1.0..1.0_f64, -1.0..1.0_f64).prop_map(|(x, y, z)| NVec3::new(x, y, z)),
        length in 0.1..10.0_f64,
        stretch in 1.001..5.0_f64,
    ) {
        prop_assume!(dir.norm() > 0.1);
        let tether = Tether::new(pivot, length).unwrap();
        let tentative = pivot + dir.normalize() * length * stretch;

        let out = project(&tether, &tentative, 1e-6);

        prop_assert!(out.taut);
        prop_assert!(((out.x - pivot).norm() - length).abs() < EPS);
        // Same ray from the pivot
        let a = (out.x - pivot).normalize();
        let b = (tentative - pivot).normalize();
        prop_assert!(a.dot(&b) > 1.0 - EPS);
    }

    #[test]
    fn attached_bob_never_exceeds_tether(
        dir in (-1.0..1.0_f64, -1.0..1.0_f64, -1.0..1.0_f64).prop_map(|(x, y, z)| NVec3::new(x, y, z)),
        length in 0.5..5.0_f64,
        v in (-5.0..5.0_f64, -5.0..5.0_f64, -5.0..5.0_f64).prop_map(|(x, y, z)| NVec3::new(x, y, z)),
        m in 0.1..5.0_f64,
        shrink in 0.5..1.0_f64,
    ) {
        prop_assume!(dir.norm() > 0.1);
        let tether = Tether::new(NVec3::new(1.0, 2.0, 3.0), length).unwrap();
        let start = tether.pivot + dir.normalize() * length * shrink;
        let mut bob = Bob::new(start, v, m).unwrap();
        let g = NVec3::new(0.0, -9.81, 0.0);

        for _ in 0..300 {
            pendulum_step(&mut bob, Some(&tether), &g, 1e-6, 0.02);
            let d = (bob.x - tether.pivot).norm();
            prop_assert!(d <= length + EPS, "distance {} exceeds {}", d, length);
            prop_assert!(bob.v.iter().all(|c| c.is_finite()));
        }
    }
}

#[test]
fn rest_state_without_gravity_is_stationary() {
    let p = Parameters {
        gravity: NVec3::zeros(),
        ..test_params()
    };
    let mut sc = hanging_scenario(p);
    let start = sc.position();

    for _ in 0..1000 {
        let sample = sc.step().unwrap();
        assert_eq!(sample.tension_force, 0.0);
        assert_eq!(sample.centripetal_magnitude, 0.0);
    }

    assert_eq!(sc.position(), start);
    assert_eq!(sc.bob().v, NVec3::zeros());
}

// ==================================================================================
// Scenario / attachment tests
// ==================================================================================

#[test]
fn swing_stays_within_tether_while_attached() {
    let mut sc = swinging_scenario(test_params());
    for _ in 0..2000 {
        sc.step().unwrap();
        let (d, l) = distance_to_anchor(&sc).unwrap();
        assert!(d <= l + EPS, "distance {d} exceeds {l}");
    }
}

#[test]
fn reattach_happens_on_tenth_tick() {
    let p = Parameters {
        h0: 0.1,
        ..test_params()
    };
    let mut sc = swinging_scenario(p);

    let t = sc.request_pivot_change(PivotRequest::Next).unwrap();
    assert_eq!(t, Some(Transition::Detached { target: 1 }));
    assert_eq!(sc.tether_length(), None);

    for tick in 1..=9 {
        sc.step().unwrap();
        assert!(!sc.attachment().is_attached(), "attached early on tick {tick}");
    }

    sc.step().unwrap();
    assert_eq!(sc.attachment(), AttachmentState::Attached { anchor: 1 });
}

#[test]
fn reattach_recomputes_tether_length() {
    let p = Parameters {
        h0: 0.1,
        ..test_params()
    };
    let mut sc = swinging_scenario(p);
    sc.request_pivot_change(PivotRequest::Index(2)).unwrap();

    for _ in 0..10 {
        sc.step().unwrap();
    }

    let anchor = sc.anchors()[2].x;
    let expected = (sc.position() - anchor).norm();
    assert_eq!(sc.attachment(), AttachmentState::Attached { anchor: 2 });
    assert_relative_eq!(sc.tether_length().unwrap(), expected, epsilon = 1e-12);
}

#[test]
fn detached_bob_falls_freely() {
    let mut sc = hanging_scenario(test_params());
    sc.request_pivot_change(PivotRequest::Next).unwrap();

    let start = sc.position();
    for _ in 0..10 {
        let sample = sc.step().unwrap();
        assert!(!sample.is_taut);
    }

    // Hanging 3 below anchor 0, now below its old tether length
    assert!(sc.position().y < start.y - 0.1);
    assert!((sc.position() - sc.anchors()[0].x).norm() > 3.0);
}

#[test]
fn request_while_detached_is_ignored() {
    let mut sc = swinging_scenario(test_params());
    sc.request_pivot_change(PivotRequest::Next).unwrap();
    sc.step().unwrap();

    assert_eq!(sc.request_pivot_change(PivotRequest::Next).unwrap(), None);
    assert_eq!(sc.pivot_index(), 1);
    match sc.attachment() {
        AttachmentState::Detached { elapsed, target } => {
            assert_relative_eq!(elapsed, 0.02, epsilon = 1e-12);
            assert_eq!(target, 1);
        }
        other => panic!("expected detached, got {other:?}"),
    }
}

#[test]
fn next_pivot_wraps_to_first_anchor() {
    let p = Parameters {
        release_delay: 0.0,
        ..test_params()
    };
    let mut sc = swinging_scenario(p);

    for expected in [1, 2, 0, 1] {
        sc.request_pivot_change(PivotRequest::Next).unwrap();
        sc.step().unwrap();
        assert_eq!(sc.attachment(), AttachmentState::Attached { anchor: expected });
    }
}

#[test]
fn reset_abandons_pending_reattach() {
    let mut sc = swinging_scenario(test_params());
    for _ in 0..20 {
        sc.step().unwrap();
    }
    sc.request_pivot_change(PivotRequest::Next).unwrap();
    sc.step().unwrap();

    let t = sc.reset().unwrap();

    let start = NVec3::new(-2.0, -2.2, 0.0);
    assert_eq!(sc.attachment(), AttachmentState::Attached { anchor: 0 });
    assert_eq!(sc.position(), start);
    assert_eq!(sc.bob().v, NVec3::zeros());
    assert_eq!(t, Transition::Reset { length: start.norm() });
    assert_eq!(sc.pivot_index(), 0);
}

#[test]
fn paused_scenario_does_not_move() {
    let mut sc = swinging_scenario(test_params());
    sc.request_pivot_change(PivotRequest::Next).unwrap();
    sc.set_paused(true);

    let x = sc.position();
    for _ in 0..100 {
        sc.step().unwrap();
    }
    assert_eq!(sc.position(), x);
    assert_eq!(sc.time(), 0.0);
    assert!(matches!(sc.attachment(), AttachmentState::Detached { elapsed, .. } if elapsed == 0.0));

    sc.set_paused(false);
    sc.step().unwrap();
    assert_ne!(sc.position(), x);
}

#[test]
fn diagnostics_report_angle_and_angular_momentum() {
    let mut sc = swinging_scenario(test_params());
    for _ in 0..30 {
        sc.step().unwrap();
    }
    let sample = *sc.diagnostics();
    assert!(sample.delta_theta > 0.0 && sample.delta_theta < 90.0);
    // Swing in the xy-plane: angular momentum along z only
    assert_relative_eq!(sample.angular_momentum.x, 0.0, epsilon = 1e-12);
    assert_relative_eq!(sample.angular_momentum.y, 0.0, epsilon = 1e-12);
    assert!(sample.angular_momentum.z.abs() > 0.0);
    assert_eq!(sample.velocity, sc.bob().v);
}

#[test]
fn independent_scenarios_step_on_separate_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Scenario>();

    let mut scenarios: Vec<Scenario> = (0..4).map(|_| swinging_scenario(test_params())).collect();
    std::thread::scope(|s| {
        for sc in scenarios.iter_mut() {
            s.spawn(move || {
                for _ in 0..100 {
                    sc.step().unwrap();
                }
            });
        }
    });

    // Same inputs, same deterministic result
    let first = scenarios[0].position();
    assert!(scenarios.iter().all(|sc| sc.position() == first));
}

// ==================================================================================
// Error handling tests
// ==================================================================================

#[test]
fn non_positive_mass_is_rejected() {
    let err = Bob::new(NVec3::zeros(), NVec3::zeros(), 0.0).unwrap_err();
    assert_eq!(err, SwingError::NonPositiveMass(0.0));
    assert!(Bob::new(NVec3::zeros(), NVec3::zeros(), -1.0).is_err());
}

#[test]
fn non_positive_tether_length_is_rejected() {
    assert_eq!(
        Tether::new(NVec3::zeros(), 0.0).unwrap_err(),
        SwingError::NonPositiveTetherLength(0.0)
    );
}

#[test]
fn non_positive_dt_is_rejected_at_step() {
    let mut sc = hanging_scenario(test_params());
    let x = sc.position();
    assert_eq!(sc.step_dt(0.0).unwrap_err(), SwingError::NonPositiveTimeStep(0.0));
    assert!(sc.step_dt(-0.1).is_err());
    assert_eq!(sc.position(), x);
}

#[test]
fn invalid_parameters_fail_at_setup() {
    let bob = Bob::new(NVec3::new(0.0, -3.0, 0.0), NVec3::zeros(), 1.0).unwrap();

    let p = Parameters { h0: 0.0, ..test_params() };
    assert!(Scenario::new(Engine::default(), p, bob.clone(), anchor_row(), CommandSchedule::default()).is_err());

    let err = Scenario::new(Engine::default(), test_params(), bob, Vec::new(), CommandSchedule::default()).unwrap_err();
    assert_eq!(err, SwingError::NoAnchors);
}

#[test]
fn negative_tolerance_and_zero_stride_fail_at_setup() {
    let bob = Bob::new(NVec3::new(0.0, -3.0, 0.0), NVec3::zeros(), 1.0).unwrap();

    let p = Parameters { taut_eps: -1e-6, ..test_params() };
    let err = Scenario::new(Engine::default(), p, bob.clone(), anchor_row(), CommandSchedule::default()).unwrap_err();
    assert_eq!(err, SwingError::NegativeTautEps(-1e-6));

    let engine = Engine { viewer: false, record_every: 0 };
    let err = Scenario::new(engine, test_params(), bob, anchor_row(), CommandSchedule::default()).unwrap_err();
    assert_eq!(err, SwingError::ZeroRecordStride);

    let mut sc = hanging_scenario(test_params());
    sc.engine.record_every = 0;
    assert_eq!(sc.run_until(|_| {}).unwrap_err(), SwingError::ZeroRecordStride);
}

#[test]
fn non_finite_anchor_fails_at_setup() {
    let bob = Bob::new(NVec3::new(0.0, -3.0, 0.0), NVec3::zeros(), 1.0).unwrap();
    let mut anchors = anchor_row();
    anchors[1] = Anchor::new(NVec3::new(f64::NAN, 0.0, 0.0));

    let err = Scenario::new(Engine::default(), test_params(), bob, anchors, CommandSchedule::default()).unwrap_err();
    assert_eq!(err, SwingError::NonFinite { what: "anchor position" });
}

#[test]
fn non_finite_anchor_move_is_rejected() {
    let mut sc = hanging_scenario(test_params());
    let before = sc.anchors().to_vec();

    let err = sc.move_anchor(0, NVec3::new(f64::NAN, 0.0, 0.0)).unwrap_err();
    assert_eq!(err, SwingError::NonFinite { what: "anchor position" });
    assert!(sc.move_anchor(1, NVec3::new(0.0, f64::INFINITY, 0.0)).is_err());
    assert_eq!(sc.anchors(), &before[..]);

    sc.step().unwrap();
    assert!(sc.position().iter().all(|c| c.is_finite()));
}

#[test]
fn failed_reset_leaves_scenario_untouched() {
    let mut sc = hanging_scenario(test_params());
    let start = sc.position();
    sc.request_pivot_change(PivotRequest::Next).unwrap();
    for _ in 0..3 {
        sc.step().unwrap();
    }
    // Anchor 0 on top of the start position: reattaching there has no length
    sc.move_anchor(0, start).unwrap();

    let x = sc.position();
    let v = sc.bob().v;
    let state = sc.attachment();
    let sample = *sc.diagnostics();

    assert_eq!(sc.reset().unwrap_err(), SwingError::NonPositiveTetherLength(0.0));
    assert_eq!(sc.position(), x);
    assert_eq!(sc.bob().v, v);
    assert_eq!(sc.attachment(), state);
    assert!(matches!(state, AttachmentState::Detached { target: 1, .. }));
    assert_eq!(*sc.diagnostics(), sample);
}

#[test]
fn out_of_range_pivot_is_rejected() {
    let mut sc = hanging_scenario(test_params());
    let err = sc.request_pivot_change(PivotRequest::Index(7)).unwrap_err();
    assert_eq!(err, SwingError::AnchorOutOfRange { index: 7, count: 3 });
    assert!(sc.attachment().is_attached());
}

// ==================================================================================
// Configuration / scripted run tests
// ==================================================================================

const SCRIPTED: &str = "
engine:
  record_every: 10
parameters:
  t_end: 4.0
  h0: 0.02
  release_delay: 0.5
bob:
  x: [-2.0, -2.2, 0.0]
  m: 1.0
anchors:
  - [0.0, 0.0, 0.0]
  - [4.0, 0.5, 0.0]
commands:
  - { at: 1.0, action: next }
  - { at: 3.0, action: attach, anchor: 0 }
";

#[test]
fn scripted_run_follows_commands() {
    let cfg: ScenarioConfig = serde_yaml::from_str(SCRIPTED).unwrap();
    let mut sc = Scenario::build_scenario(cfg).unwrap();

    let mut rows = Vec::new();
    let ticks = sc.run_until(|s| rows.push(s.trace_row())).unwrap();

    assert_eq!(ticks, 200);
    // initial row + one every 10 ticks
    assert_eq!(rows.len(), 21);

    // Detached from 1.0 to 1.5, attached to anchor 1 until 3.0
    let at = |t: f64| rows.iter().find(|r| (r.t - t).abs() < 1e-6).unwrap();
    assert_eq!(at(0.8).anchor, Some(0));
    assert_eq!(at(1.2).anchor, None);
    assert_eq!(at(2.0).anchor, Some(1));
    assert_eq!(at(3.2).anchor, None);
    assert_eq!(at(4.0).anchor, Some(0));
}

#[test]
fn attach_command_without_anchor_is_rejected() {
    let yaml = SCRIPTED.replace("action: attach, anchor: 0", "action: attach");
    let cfg: ScenarioConfig = serde_yaml::from_str(&yaml).unwrap();
    let err = Scenario::build_scenario(cfg).unwrap_err();
    assert_eq!(err, SwingError::MissingAnchorIndex(3.0));
}

#[test]
fn trace_row_formats_as_csv() {
    let sc = hanging_scenario(test_params());
    let row = sc.trace_row().to_string();
    assert_eq!(row.split(',').count(), swingsim::TraceRow::CSV_HEADER.split(',').count());
    assert!(row.starts_with("0.0000,0.000000,-3.000000,"));
}
