use std::sync::Arc;

use reptrack_core::session::circuit::{CircuitSessionState, advance, flatten};
use reptrack_core::session::{CircuitSession, SessionEvent};
use reptrack_core::{
    CircuitPlan, ExerciseRegistry, PlanItem, PlannedSet, RepAggregator, Side, WorkoutPlan,
};
use rstest::{fixture, rstest};

fn set(id: &str, reps: u32) -> PlannedSet {
    PlannedSet {
        exercise_id: id.into(),
        target_reps: reps,
        weight: None,
    }
}

fn circuit(id: &str, repetitions: u32, elements: Vec<PlannedSet>) -> PlanItem {
    PlanItem::Circuit(CircuitPlan {
        id: id.into(),
        name: id.to_uppercase(),
        repetitions,
        elements,
    })
}

#[fixture]
fn three_rounds() -> WorkoutPlan {
    WorkoutPlan {
        items: vec![circuit("c1", 3, vec![set("squat", 10), set("push_up", 8)])],
    }
}

fn session(plan: &WorkoutPlan) -> CircuitSession {
    let mut s = CircuitSession::new(Arc::new(ExerciseRegistry::builtin()));
    s.initialize_workout(plan);
    s
}

#[rstest]
fn circuit_repeats_then_completes(three_rounds: WorkoutPlan) {
    let mut s = session(&three_rounds);
    let mut agg = RepAggregator::new();
    assert_eq!(s.steps().len(), 2, "repetitions are not pre-expanded");
    s.toggle_workout(&mut agg);

    let mut visited = Vec::new();
    let d = s.get_current_exercise_details().unwrap();
    visited.push((d.exercise_id.clone(), d.circuit.as_ref().unwrap().repetition));
    for _ in 0..5 {
        s.advance_to_next_set(&mut agg);
        let d = s.get_current_exercise_details().unwrap();
        visited.push((d.exercise_id.clone(), d.circuit.as_ref().unwrap().repetition));
    }
    let want: Vec<(String, u32)> = [
        ("squat", 1),
        ("push_up", 1),
        ("squat", 2),
        ("push_up", 2),
        ("squat", 3),
        ("push_up", 3),
    ]
    .into_iter()
    .map(|(id, r)| (id.to_string(), r))
    .collect();
    assert_eq!(visited, want);
    assert!(!s.state().is_complete);

    let events = s.advance_to_next_set(&mut agg);
    assert!(s.state().is_complete);
    assert!(!s.state().is_active);
    assert!(matches!(events.last(), Some(SessionEvent::Finished(_))));

    // Further advances are no-ops.
    assert!(s.advance_to_next_set(&mut agg).is_empty());
}

#[rstest]
fn details_include_look_ahead(three_rounds: WorkoutPlan) {
    let mut s = session(&three_rounds);
    let mut agg = RepAggregator::new();
    let d = s.get_current_exercise_details().unwrap();
    assert_eq!(d.exercise_name, "Squat");
    assert_eq!(d.next_exercise_name.as_deref(), Some("Push-up"));
    assert_eq!(d.target_reps, 10);
    assert_eq!(d.total_steps, 2);
    let c = d.circuit.unwrap();
    assert_eq!((c.id.as_str(), c.name.as_str()), ("c1", "C1"));
    assert_eq!((c.step, c.steps, c.total_repetitions), (0, 2, 3));

    s.advance_to_next_set(&mut agg);
    let d = s.get_current_exercise_details().unwrap();
    assert_eq!(d.next_exercise_name.as_deref(), Some("Squat"));

    for _ in 0..4 {
        s.advance_to_next_set(&mut agg);
    }
    let d = s.get_current_exercise_details().unwrap();
    assert_eq!(d.exercise_id, "push_up");
    assert_eq!(d.next_exercise_name, None);
}

#[test]
fn mixed_plan_visits_sets_and_circuits_in_order() {
    let plan = WorkoutPlan {
        items: vec![
            PlanItem::Set(set("lateral_raise", 12)),
            circuit("arms", 2, vec![set("bicep_curl", 10), set("shoulder_press", 8)]),
            PlanItem::Set(set("squat", 15)),
        ],
    };
    let steps = flatten(&plan);
    let mut state = CircuitSessionState::initial(&steps);
    let mut order = vec![steps[state.current_index].exercise_id.clone()];
    while !state.is_complete {
        state = advance(&steps, &state);
        if !state.is_complete {
            order.push(steps[state.current_index].exercise_id.clone());
        }
    }
    assert_eq!(
        order,
        [
            "lateral_raise",
            "bicep_curl",
            "shoulder_press",
            "bicep_curl",
            "shoulder_press",
            "squat"
        ]
    );
}

#[test]
fn flatten_leaves_steps_untouched_by_advance() {
    let plan = WorkoutPlan {
        items: vec![circuit("c", 2, vec![set("squat", 5)])],
    };
    let steps = flatten(&plan);
    let snapshot = steps.clone();
    let s0 = CircuitSessionState::initial(&steps);
    let s1 = advance(&steps, &s0);
    assert_eq!(s1.current_index, 0);
    assert_eq!(s1.repetition_of("c").map(|c| c.current), Some(2));
    assert_eq!(s0.repetition_of("c").map(|c| c.current), Some(1));
    assert_eq!(steps, snapshot);
    assert!(advance(&steps, &s1).is_complete);
}

#[rstest]
fn reset_rewinds_everything(three_rounds: WorkoutPlan) {
    let mut s = session(&three_rounds);
    let mut agg = RepAggregator::new();
    s.toggle_workout(&mut agg);
    for _ in 0..3 {
        s.advance_to_next_set(&mut agg);
    }
    assert_eq!(s.state().repetition_of("c1").map(|c| c.current), Some(2));

    s.reset_workout();
    assert_eq!(s.state().current_index, 0);
    assert_eq!(s.state().repetition_of("c1").map(|c| c.current), Some(1));
    assert!(!s.state().is_active);
}

#[rstest]
fn toggle_keeps_position(three_rounds: WorkoutPlan) {
    let mut s = session(&three_rounds);
    let mut agg = RepAggregator::new();
    let events = s.toggle_workout(&mut agg);
    assert!(s.is_active());
    assert!(matches!(&events[..], [SessionEvent::ExerciseChanged(ex)] if ex.id == "squat"));

    s.advance_to_next_set(&mut agg);
    s.toggle_workout(&mut agg);
    assert!(!s.is_active());
    assert_eq!(s.state().current_index, 1);
    s.toggle_workout(&mut agg);
    assert!(s.is_active());
    assert_eq!(s.state().current_index, 1);
}

#[rstest]
fn auto_advance_on_target(three_rounds: WorkoutPlan) {
    let mut s = CircuitSession::new(Arc::new(ExerciseRegistry::builtin())).with_auto_advance(true);
    s.initialize_workout(&three_rounds);
    let mut agg = RepAggregator::new();
    s.toggle_workout(&mut agg);

    agg.update_rep_count(Side::None, 9);
    assert!(s.observe(&mut agg).is_empty());
    agg.update_rep_count(Side::None, 10);
    let events = s.observe(&mut agg);
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], SessionEvent::SetCompleted { reps: 10, .. }));
    assert!(matches!(&events[1], SessionEvent::ExerciseChanged(ex) if ex.id == "push_up"));
    assert_eq!(agg.read().left, 0);
}

#[test]
fn empty_plan_has_no_details() {
    let mut s = session(&WorkoutPlan::default());
    let mut agg = RepAggregator::new();
    assert!(s.get_current_exercise_details().is_none());
    assert!(s.advance_to_next_set(&mut agg).is_empty());
    assert!(s.toggle_workout(&mut agg).is_empty());
    assert!(!s.is_active());
}

#[test]
fn unknown_exercise_falls_back_to_id() {
    let plan = WorkoutPlan {
        items: vec![PlanItem::Set(set("burpee", 10))],
    };
    let s = session(&plan);
    let d = s.get_current_exercise_details().unwrap();
    assert!(d.exercise.is_none());
    assert_eq!(d.exercise_name, "burpee");
}

#[rstest]
fn stop_returns_log_and_is_idempotent(three_rounds: WorkoutPlan) {
    let mut s = session(&three_rounds);
    let mut agg = RepAggregator::new();
    s.toggle_workout(&mut agg);
    agg.update_rep_count(Side::None, 10);
    s.advance_to_next_set(&mut agg);

    let record = s.stop(&mut agg).unwrap();
    assert_eq!(record.set_count, 1);
    let once = s.state().clone();
    assert!(s.stop(&mut agg).is_none());
    assert_eq!(s.state(), &once);
    assert_eq!(once.current_index, 0);
}

#[rstest]
fn current_step_carries_live_repetition(three_rounds: WorkoutPlan) {
    let mut s = session(&three_rounds);
    let mut agg = RepAggregator::new();
    s.toggle_workout(&mut agg);
    for _ in 0..3 {
        s.advance_to_next_set(&mut agg);
    }
    let step = s.current_step().unwrap();
    assert_eq!(step.exercise_id, "push_up");
    assert_eq!(step.parent_circuit.as_ref().map(|c| c.repetition_index), Some(2));
    // The flattened plan itself is not rewritten.
    assert!(s.steps().iter().all(|st| st.parent_circuit.as_ref().unwrap().repetition_index == 1));
}

#[rstest]
fn stepping_through_a_plan_that_never_ran_reports_nothing(three_rounds: WorkoutPlan) {
    let mut s = session(&three_rounds);
    let mut agg = RepAggregator::new();
    let mut events = Vec::new();
    for _ in 0..6 {
        events.extend(s.advance_to_next_set(&mut agg));
    }
    assert!(s.state().is_complete);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::Finished(_))));
}
