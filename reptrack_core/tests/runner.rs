use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use reptrack_core::error::TrackerError;
use reptrack_core::mocks::{NoPoseSource, PoseBuilder, ScriptedSource};
use reptrack_core::session::{LadderSession, SessionRecord, TimedSession};
use reptrack_core::{
    ExerciseRegistry, LadderCfg, RunCfg, RunMode, Runner, SmoothingCfg, TimedCfg, TrackerCfg,
};
use reptrack_traits::PoseFrame;
use rand::SeedableRng;
use rand::rngs::StdRng;

const LEFT_LEG: [&str; 3] = ["left_hip", "left_knee", "left_ankle"];

fn raw_cfg() -> TrackerCfg {
    TrackerCfg {
        smoothing: SmoothingCfg {
            enabled: false,
            window: 0,
        },
        ..TrackerCfg::default()
    }
}

/// `reps` squats at 10 fps, three frames per rep, starting at `t0`.
fn squats(t0: u64, reps: usize) -> Vec<PoseFrame> {
    let mut out = Vec::new();
    let mut t = t0;
    for _ in 0..reps {
        for deg in [170.0, 80.0, 170.0] {
            out.push(PoseBuilder::new().angle(LEFT_LEG, deg).build(t));
            t += 100;
        }
    }
    out
}

/// Standing still for `secs` seconds at 10 fps.
fn standing(t0: u64, secs: u64) -> Vec<PoseFrame> {
    (0..secs * 10)
        .map(|i| PoseBuilder::new().angle(LEFT_LEG, 170.0).build(t0 + i * 100))
        .collect()
}

fn runner(mode: RunMode) -> Runner {
    let reg = ExerciseRegistry::builtin();
    Runner::new(
        reg.require("squat").unwrap(),
        raw_cfg(),
        RunCfg {
            mode,
            ..RunCfg::default()
        },
    )
    .unwrap()
}

#[test]
fn direct_replay_counts_reps() {
    let mut r = runner(RunMode::Direct);
    let mut sink: Vec<SessionRecord> = Vec::new();
    let summary = r.run(ScriptedSource::new(squats(5_000, 4)), None, &mut sink).unwrap();
    assert_eq!(summary.frames, 12);
    assert_eq!(summary.reps_completed, 4);
    assert_eq!(summary.reps.left, 4);
    assert_eq!(summary.duration_ms, 1_100);
    assert!(!summary.finished);
    assert!(sink.is_empty());
}

#[test]
fn feed_replay_processes_frames() {
    let mut r = runner(RunMode::Feed);
    let mut sink: Vec<SessionRecord> = Vec::new();
    let summary = r.run(ScriptedSource::new(squats(0, 3)), None, &mut sink).unwrap();
    // The feed may replace frames the consumer has not taken yet.
    assert_eq!(summary.frames + summary.dropped, 9);
    assert!(summary.reps.left <= 3);
}

#[test]
fn out_of_order_frames_are_skipped() {
    let mut frames = squats(1_000, 1);
    frames.insert(1, PoseBuilder::new().angle(LEFT_LEG, 80.0).build(500));
    let mut r = runner(RunMode::Direct);
    let mut sink: Vec<SessionRecord> = Vec::new();
    let summary = r.run(ScriptedSource::new(frames), None, &mut sink).unwrap();
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.reps.left, 1);
}

#[test]
fn source_error_aborts_direct_run() {
    let mut r = runner(RunMode::Direct);
    let mut sink: Vec<SessionRecord> = Vec::new();
    let err = r.run(NoPoseSource, None, &mut sink).unwrap_err();
    assert!(err.to_string().contains("pose source"));
}

#[test]
fn ladder_auto_advances_on_frame_time() {
    let reg = ExerciseRegistry::builtin();
    let mut r = runner(RunMode::Direct);
    let mut ladder = LadderSession::new(LadderCfg {
        start_reps: 1,
        top_reps: 2,
        end_reps: 1,
        increment: 1,
        rest_secs_per_rep: 1,
        auto_advance: true,
    });
    let mut sink: Vec<SessionRecord> = Vec::new();
    let events = ladder.start(reg.require("squat").unwrap(), r.tracker_mut());
    r.apply(events, &mut sink).unwrap();

    // 1 rep, rest 1 s, 2 reps, rest 2 s, 1 rep, rest 1 s.
    let mut frames = squats(0, 1);
    frames.extend(standing(300, 2));
    frames.extend(squats(2_300, 2));
    frames.extend(standing(2_900, 3));
    frames.extend(squats(5_900, 1));
    frames.extend(standing(6_200, 3));

    let summary = r
        .run(ScriptedSource::new(frames), Some(&mut ladder), &mut sink)
        .unwrap();
    assert!(summary.finished);
    assert_eq!(summary.records, 1);
    assert_eq!(sink.len(), 1);
    let reps: Vec<u32> = sink[0].exercises.iter().map(|e| e.reps).collect();
    assert_eq!(reps, vec![1, 2, 1]);
    assert!(!ladder.is_active());
}

#[test]
fn unfinished_session_is_stopped_at_end_of_stream() {
    let reg = ExerciseRegistry::builtin();
    let mut r = runner(RunMode::Direct);
    let mut timed = TimedSession::new(
        TimedCfg {
            exercise_set_secs: 2,
            rest_secs: 1,
            total_sets: 10,
            fixed_exercise: Some("squat".into()),
        },
        vec![reg.require("squat").unwrap()],
        StdRng::seed_from_u64(0),
    );
    let mut sink: Vec<SessionRecord> = Vec::new();
    let events = timed.start(r.tracker_mut());
    r.apply(events, &mut sink).unwrap();

    let summary = r
        .run(ScriptedSource::new(squats(0, 8)), Some(&mut timed), &mut sink)
        .unwrap();
    assert!(!summary.finished);
    assert_eq!(summary.records, 1);
    assert_eq!(sink.len(), 1);
    assert!(!timed.is_active());
    // 2.4 s of frames: one full 2 s set was logged before the stop.
    assert_eq!(sink[0].set_count, 1);
}

#[test]
fn cancel_check_is_debounced() {
    let polls = Rc::new(Cell::new(0_u32));
    let seen = Rc::clone(&polls);
    let mut r = runner(RunMode::Direct).with_cancel(
        move || {
            seen.set(seen.get() + 1);
            seen.get() > 2
        },
        2,
    );
    let mut sink: Vec<SessionRecord> = Vec::new();
    let summary = r.run(ScriptedSource::new(standing(0, 1)), None, &mut sink).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.frames, 3);
    assert_eq!(polls.get(), 4);
}

#[test]
fn apply_switches_tracker_exercise() {
    let reg = ExerciseRegistry::builtin();
    let mut r = runner(RunMode::Direct);
    let mut sink: Vec<SessionRecord> = Vec::new();
    let curl: Arc<_> = reg.require("bicep_curl").unwrap();
    let finished = r
        .apply(vec![reptrack_core::SessionEvent::ExerciseChanged(curl)], &mut sink)
        .unwrap();
    assert!(!finished);
    assert_eq!(r.tracker().exercise().id, "bicep_curl");
}

/// Delivers its frames, then keeps timing out without ending the stream.
struct GoesQuiet {
    frames: Vec<PoseFrame>,
}

impl reptrack_traits::PoseSource for GoesQuiet {
    fn next_frame(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<PoseFrame>, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(frame) = self.frames.pop() {
            return Ok(Some(frame));
        }
        std::thread::sleep(timeout);
        Err(Box::new(std::io::Error::new(std::io::ErrorKind::TimedOut, "no pose")))
    }
}

#[test]
fn silent_feed_aborts_after_stall_timeout() {
    let reg = ExerciseRegistry::builtin();
    let cfg = RunCfg {
        mode: RunMode::Feed,
        stall_timeout_ms: 100,
        ..RunCfg::default()
    };
    let mut r = Runner::new(reg.require("squat").unwrap(), raw_cfg(), cfg)
        .unwrap()
        .with_read_timeout(std::time::Duration::from_millis(10));
    let mut sink: Vec<SessionRecord> = Vec::new();
    let source = GoesQuiet {
        frames: vec![PoseBuilder::new().angle(LEFT_LEG, 170.0).build(0)],
    };
    let err = r.run(source, None, &mut sink).unwrap_err();
    match err.downcast_ref::<TrackerError>() {
        Some(TrackerError::Source(msg)) => assert!(msg.contains("no frames for")),
        other => panic!("expected Source, got: {other:?}"),
    }
}

#[test]
fn stall_check_is_off_by_default() {
    // Without a stall limit the run only ends through cancellation.
    let polls = Rc::new(Cell::new(0_u32));
    let seen = Rc::clone(&polls);
    let mut r = runner(RunMode::Feed)
        .with_read_timeout(std::time::Duration::from_millis(10))
        .with_cancel(
            move || {
                seen.set(seen.get() + 1);
                seen.get() > 10
            },
            1,
        );
    let mut sink: Vec<SessionRecord> = Vec::new();
    let summary = r.run(GoesQuiet { frames: Vec::new() }, None, &mut sink).unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.frames, 0);
}
