use reptrack_core::conditioner::{Ema, SignalConditioner, evaluate_gate};
use reptrack_core::mocks::PoseBuilder;
use reptrack_core::{ExerciseRegistry, SmoothingCfg, VisibilityCfg};
use rstest::rstest;

fn smoothing(enabled: bool, window: u32) -> SmoothingCfg {
    SmoothingCfg { enabled, window }
}

#[rstest]
#[case::window_zero(smoothing(true, 0))]
#[case::window_one(smoothing(true, 1))]
#[case::disabled(smoothing(false, 10))]
fn identity_when_smoothing_is_off(#[case] cfg: SmoothingCfg) {
    let mut c = SignalConditioner::new(cfg);
    for (i, v) in [170.0, 12.5, 99.0, 160.25].into_iter().enumerate() {
        let s = c.condition("elbow", Some(v), i as u64);
        assert_eq!(s.smoothed_value, Some(v));
        assert_eq!(s.raw_value, Some(v));
    }
}

#[test]
fn gap_reseeds_average() {
    let mut c = SignalConditioner::new(smoothing(true, 3));
    assert_eq!(c.condition("knee", Some(100.0), 0).smoothed_value, Some(100.0));
    assert_eq!(c.condition("knee", Some(140.0), 1).smoothed_value, Some(120.0));

    let gap = c.condition("knee", None, 2);
    assert_eq!(gap.raw_value, None);
    assert_eq!(gap.smoothed_value, None);

    // First value after the gap behaves like the first value ever seen.
    assert_eq!(c.condition("knee", Some(60.0), 3).smoothed_value, Some(60.0));
}

#[test]
fn signals_are_smoothed_independently() {
    let mut c = SignalConditioner::new(smoothing(true, 3));
    c.condition("left", Some(0.0), 0);
    c.condition("right", Some(100.0), 0);
    assert_eq!(c.condition("left", Some(10.0), 1).smoothed_value, Some(5.0));
    assert_eq!(c.condition("right", Some(100.0), 1).smoothed_value, Some(100.0));
}

#[test]
fn reset_forgets_history() {
    let mut c = SignalConditioner::new(smoothing(true, 9));
    c.condition("x", Some(1.0), 0);
    c.reset();
    assert_eq!(c.condition("x", Some(50.0), 1).smoothed_value, Some(50.0));
}

#[test]
fn ema_matches_closed_form() {
    let alpha = smoothing(true, 4).alpha();
    assert!((alpha - 0.4).abs() < 1e-12);
    let mut ema = Ema::new();
    ema.push(Some(10.0), alpha);
    let y = ema.push(Some(20.0), alpha);
    assert!(matches!(y, Some(v) if (v - 14.0).abs() < 1e-9));
}

#[test]
fn primary_gate_fails_on_low_confidence() {
    let reg = ExerciseRegistry::builtin();
    let curl = reg.require("bicep_curl").unwrap();
    let cfg = VisibilityCfg::default();

    let ok = PoseBuilder::new();
    assert!(evaluate_gate(ok.landmarks(), &curl, &cfg).visible);

    let occluded = PoseBuilder::new().visibility("right_wrist", 0.2);
    let gate = evaluate_gate(occluded.landmarks(), &curl, &cfg);
    assert!(!gate.visible);
    assert!(!gate.primary.all_visible);
    assert!((gate.primary.min_visibility - 0.2).abs() < 1e-6);
    assert!(gate.secondary.is_none());
}

#[test]
fn primary_gate_can_be_disabled() {
    let reg = ExerciseRegistry::builtin();
    let curl = reg.require("bicep_curl").unwrap();
    let cfg = VisibilityCfg {
        require_primary: false,
        ..VisibilityCfg::default()
    };
    let occluded = PoseBuilder::new().visibility("left_elbow", 0.0);
    assert!(evaluate_gate(occluded.landmarks(), &curl, &cfg).visible);
}

#[test]
fn secondary_gate_only_when_enabled() {
    let reg = ExerciseRegistry::builtin();
    let curl = reg.require("bicep_curl").unwrap();
    let pose = PoseBuilder::new().visibility("left_hip", 0.1);

    let relaxed = VisibilityCfg::default();
    assert!(evaluate_gate(pose.landmarks(), &curl, &relaxed).visible);

    let strict = VisibilityCfg {
        require_secondary: true,
        ..VisibilityCfg::default()
    };
    let gate = evaluate_gate(pose.landmarks(), &curl, &strict);
    assert!(!gate.visible);
    assert!(gate.primary.all_visible);
    assert!(gate.secondary.is_some_and(|g| !g.all_visible));
}

#[test]
fn empty_frame_closes_primary_gate() {
    let reg = ExerciseRegistry::builtin();
    let squat = reg.require("squat").unwrap();
    let gate = evaluate_gate(&[], &squat, &VisibilityCfg::default());
    assert!(!gate.visible);
    assert_eq!(gate.primary.min_visibility, 0.0);
}
