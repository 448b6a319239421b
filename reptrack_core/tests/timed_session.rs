use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use reptrack_core::session::{Orchestrator, SessionEvent, SessionPhase, TimedSession};
use reptrack_core::{ExerciseDefinition, ExerciseRegistry, RepAggregator, RepCount, Side, TimedCfg};
use rstest::{fixture, rstest};

fn pool(ids: &[&str]) -> Vec<Arc<ExerciseDefinition>> {
    let reg = ExerciseRegistry::builtin();
    ids.iter().map(|id| reg.require(id).unwrap()).collect()
}

fn cfg(set_secs: u32, rest_secs: u32, total_sets: u32) -> TimedCfg {
    TimedCfg {
        exercise_set_secs: set_secs,
        rest_secs,
        total_sets,
        fixed_exercise: None,
    }
}

#[fixture]
fn session() -> TimedSession<StdRng> {
    TimedSession::new(cfg(3, 2, 2), pool(&["squat", "push_up"]), StdRng::seed_from_u64(7))
}

fn tick_n(s: &mut TimedSession<StdRng>, agg: &mut RepAggregator, n: usize) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    for _ in 0..n {
        let h = s.timer().expect("timer armed");
        out.extend(s.tick(h, agg));
    }
    out
}

#[rstest]
fn start_enters_first_set(mut session: TimedSession<StdRng>) {
    let mut agg = RepAggregator::new();
    agg.update_rep_count(Side::Left, 4);
    let events = session.start(&mut agg);

    let st = session.state();
    assert_eq!(st.phase, SessionPhase::Exercising);
    assert_eq!(st.timer_seconds, 3);
    assert_eq!(st.set_number, 1);
    assert_eq!(st.total_sets, 2);
    let current = st.current_exercise.clone().unwrap();
    let upcoming = st.upcoming_exercise.clone().unwrap();
    assert_ne!(current.id, upcoming.id, "two options must not repeat back to back");
    assert_eq!(agg.read(), RepCount::default());
    assert!(matches!(&events[..], [SessionEvent::ExerciseChanged(ex)] if ex.id == current.id));
}

#[rstest]
fn full_cycle_finishes_after_last_rest(mut session: TimedSession<StdRng>) {
    let mut agg = RepAggregator::new();
    session.start(&mut agg);
    let first_upcoming = session.state().upcoming_exercise.clone().unwrap();

    agg.update_rep_count(Side::None, 6);
    let events = tick_n(&mut session, &mut agg, 3);
    assert_eq!(session.state().phase, SessionPhase::Resting);
    assert_eq!(session.state().timer_seconds, 2);
    assert!(matches!(&events[..], [SessionEvent::SetCompleted { set_number: 1, reps: 6, .. }]));

    let events = tick_n(&mut session, &mut agg, 2);
    let st = session.state();
    assert_eq!(st.phase, SessionPhase::Exercising);
    assert_eq!(st.set_number, 2);
    assert_eq!(st.current_exercise.as_ref().map(|e| e.id.clone()), Some(first_upcoming.id.clone()));
    assert_eq!(agg.read(), RepCount::default());
    assert!(matches!(&events[..], [SessionEvent::ExerciseChanged(_)]));

    tick_n(&mut session, &mut agg, 3);
    let events = tick_n(&mut session, &mut agg, 2);
    let Some(SessionEvent::Finished(record)) = events.last() else {
        panic!("expected Finished, got {events:?}");
    };
    assert_eq!(record.set_count, 2);
    assert_eq!(record.exercises[0].reps, 6);
    assert!(record.end_time >= record.start_time);
    assert_eq!(session.state().phase, SessionPhase::Idle);
    assert!(session.timer().is_none());
}

#[rstest]
fn stop_is_idempotent(mut session: TimedSession<StdRng>) {
    let mut agg = RepAggregator::new();
    session.start(&mut agg);
    tick_n(&mut session, &mut agg, 1);

    let record = session.stop(&mut agg);
    assert!(record.is_some());
    let once = session.state().clone();
    assert!(session.stop(&mut agg).is_none());
    assert_eq!(session.state(), &once);

    assert_eq!(once.phase, SessionPhase::Idle);
    assert_eq!(once.timer_seconds, 0);
    assert!(once.current_exercise.is_none());
    assert!(once.upcoming_exercise.is_none());
    assert_eq!(once.set_number, 0);
}

#[rstest]
fn stale_tick_after_stop_is_ignored(mut session: TimedSession<StdRng>) {
    let mut agg = RepAggregator::new();
    session.start(&mut agg);
    let stale = session.timer().unwrap();
    session.stop(&mut agg);

    assert!(session.tick(stale, &mut agg).is_empty());
    assert_eq!(session.state().phase, SessionPhase::Idle);

    session.start(&mut agg);
    assert!(session.tick(stale, &mut agg).is_empty());
    assert_eq!(session.state().timer_seconds, 3);
}

#[rstest]
fn settings_locked_while_running(mut session: TimedSession<StdRng>) {
    let mut agg = RepAggregator::new();
    assert!(session.set_total_sets(4));
    assert_eq!(session.state().total_sets, 4);

    session.start(&mut agg);
    assert!(!session.set_exercise_set_secs(99));
    assert!(!session.set_rest_secs(99));
    assert!(!session.set_total_sets(1));
    assert!(!session.set_fixed_exercise(Some("squat".into())));
    assert_eq!(session.config().exercise_set_secs, 3);
    assert_eq!(session.config().total_sets, 4);

    session.stop(&mut agg);
    assert!(session.set_rest_secs(10));
    assert_eq!(session.config().rest_secs, 10);
}

#[test]
fn fixed_exercise_overrides_random_pick() {
    let mut c = cfg(1, 1, 3);
    c.fixed_exercise = Some("push_up".into());
    let exercises = pool(&["squat", "push_up", "bicep_curl"]);
    let mut s = TimedSession::new(c, exercises, StdRng::seed_from_u64(1));
    let mut agg = RepAggregator::new();
    s.start(&mut agg);
    for _ in 0..3 {
        assert_eq!(s.state().current_exercise.as_ref().unwrap().id, "push_up");
        assert_eq!(s.state().upcoming_exercise.as_ref().unwrap().id, "push_up");
        tick_n(&mut s, &mut agg, 2);
    }
}

#[test]
fn random_picks_never_repeat_immediately() {
    let exercises = pool(&["squat", "push_up", "lateral_raise"]);
    let mut s = TimedSession::new(cfg(1, 1, 50), exercises, StdRng::seed_from_u64(42));
    let mut agg = RepAggregator::new();
    s.start(&mut agg);
    let mut prev = s.state().current_exercise.as_ref().unwrap().id.clone();
    for _ in 1..50 {
        tick_n(&mut s, &mut agg, 2);
        let cur = s.state().current_exercise.as_ref().unwrap().id.clone();
        assert_ne!(cur, prev);
        prev = cur;
    }
}

#[test]
fn single_exercise_pool_repeats() {
    let mut s = TimedSession::new(cfg(1, 1, 2), pool(&["squat"]), StdRng::seed_from_u64(3));
    let mut agg = RepAggregator::new();
    s.start(&mut agg);
    assert_eq!(s.state().upcoming_exercise.as_ref().unwrap().id, "squat");
}

#[test]
fn empty_pool_does_not_start() {
    let mut s = TimedSession::new(cfg(1, 1, 2), Vec::new(), StdRng::seed_from_u64(3));
    let mut agg = RepAggregator::new();
    assert!(s.start(&mut agg).is_empty());
    assert!(!s.is_active());
    assert!(s.timer().is_none());
}
