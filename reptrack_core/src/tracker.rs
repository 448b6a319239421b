//! The per-frame repetition pipeline (`RepTracker`).
//!
//! Each frame: visibility gate → raw value per tracked signal → EMA → one
//! phase machine per counting side → aggregator. Frames must be fed in arrival
//! order; `&mut self` keeps a single update in flight.

use std::sync::Arc;
use std::time::Instant;

use reptrack_traits::Landmark;
use reptrack_traits::clock::{Clock, MonotonicClock};

use crate::aggregator::{RepAggregator, RepCount, RepCounter};
use crate::conditioner::{FrameGate, SignalConditioner, SignalSample, evaluate_gate};
use crate::config::TrackerCfg;
use crate::error::{BuildError, Result};
use crate::exercise::{ExerciseDefinition, Side};
use crate::phase::{Phase, PhaseMachine, PhaseState, PhaseStep};

/// A phase machine bound to the signal that drives it.
#[derive(Debug, Clone)]
struct SideTrack {
    signal_idx: usize,
    machine: PhaseMachine,
}

/// Everything that happened in one frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub timestamp_ms: u64,
    /// One sample per tracked signal, in definition order.
    pub samples: Vec<SignalSample>,
    pub gate: FrameGate,
    pub counting_allowed: bool,
    pub left: Option<PhaseStep>,
    pub right: Option<PhaseStep>,
    /// Aggregator counts after this frame.
    pub reps: RepCount,
}

impl FrameReport {
    pub fn rep_completed(&self) -> bool {
        self.left.is_some_and(|s| s.rep_completed) || self.right.is_some_and(|s| s.rep_completed)
    }
}

pub struct RepTracker {
    exercise: Arc<ExerciseDefinition>,
    cfg: TrackerCfg,
    conditioner: SignalConditioner,
    left: Option<SideTrack>,
    right: Option<SideTrack>,
    aggregator: RepAggregator,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    stability_check: Option<Box<dyn Fn() -> bool>>,
    frames: u64,
}

impl core::fmt::Debug for RepTracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RepTracker")
            .field("exercise", &self.exercise.id)
            .field("reps", &self.aggregator.read())
            .field("frames", &self.frames)
            .finish()
    }
}

fn side_track(
    exercise: &ExerciseDefinition,
    sides: &[Side],
    cfg: &TrackerCfg,
) -> Option<SideTrack> {
    let signal_idx = exercise
        .tracked_signals
        .iter()
        .position(|s| s.is_rep_counter && sides.contains(&s.side))?;
    Some(SideTrack {
        signal_idx,
        machine: PhaseMachine::new(cfg.phase),
    })
}

impl RepTracker {
    pub fn builder() -> RepTrackerBuilder {
        RepTrackerBuilder::default()
    }

    pub fn exercise(&self) -> &Arc<ExerciseDefinition> {
        &self.exercise
    }

    pub fn config(&self) -> &TrackerCfg {
        &self.cfg
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    /// Switch to another exercise. Counts, phases and smoothing start over.
    pub fn set_exercise(&mut self, exercise: Arc<ExerciseDefinition>) {
        tracing::debug!(from = %self.exercise.id, to = %exercise.id, "exercise changed");
        self.left = side_track(&exercise, &[Side::Left, Side::None], &self.cfg);
        self.right = side_track(&exercise, &[Side::Right], &self.cfg);
        self.exercise = exercise;
        self.conditioner.reset();
        self.aggregator.reset_rep_counts();
    }

    /// New settings apply from the next frame.
    pub fn set_config(&mut self, cfg: TrackerCfg) {
        self.conditioner.set_smoothing(cfg.smoothing);
        for track in [self.left.as_mut(), self.right.as_mut()].into_iter().flatten() {
            track.machine.set_cfg(cfg.phase);
        }
        self.cfg = cfg;
    }

    /// Zero the counts and rewind every phase machine.
    pub fn reset(&mut self) {
        for track in [self.left.as_mut(), self.right.as_mut()].into_iter().flatten() {
            track.machine.reset();
        }
        self.conditioner.reset();
        self.aggregator.reset_rep_counts();
    }

    pub fn reps(&self) -> RepCount {
        self.aggregator.read()
    }

    /// Current phase per side; `None` when the exercise has no counter there.
    pub fn phases(&self) -> (Option<Phase>, Option<Phase>) {
        (
            self.left.as_ref().map(|t| t.machine.phase()),
            self.right.as_ref().map(|t| t.machine.phase()),
        )
    }

    pub fn side_state(&self, side: Side) -> Option<PhaseState> {
        let track = match side {
            Side::Left | Side::None => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        };
        track.map(|t| t.machine.state())
    }

    /// Milliseconds on the tracker clock since it was built.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Process one frame. An empty slice means no pose was detected.
    pub fn process_frame(&mut self, landmarks: &[Landmark]) -> FrameReport {
        let now = self.now_ms();
        self.frames = self.frames.saturating_add(1);

        let vis = self.cfg.visibility;
        let gate = evaluate_gate(landmarks, &self.exercise, &vis);
        let stable = self.stability_check.as_ref().is_none_or(|check| check());
        let counting_allowed = !landmarks.is_empty() && gate.visible && stable;
        let floor = if vis.require_primary {
            vis.min_visibility()
        } else {
            0.0
        };

        let exercise = Arc::clone(&self.exercise);
        let samples: Vec<SignalSample> = exercise
            .tracked_signals
            .iter()
            .map(|spec| {
                let raw = exercise.signal_type.measure(landmarks, spec, floor);
                self.conditioner.condition(&spec.id, raw, now)
            })
            .collect();

        let drive = |track: Option<&mut SideTrack>, side: Side, agg: &mut RepAggregator| {
            let track = track?;
            let spec = &exercise.tracked_signals[track.signal_idx];
            let value = samples[track.signal_idx].smoothed_value;
            let step = track.machine.update(value, spec, counting_allowed, now);
            agg.update_rep_count(side, track.machine.rep_count());
            Some(step)
        };
        let left = drive(self.left.as_mut(), Side::Left, &mut self.aggregator);
        let right = drive(self.right.as_mut(), Side::Right, &mut self.aggregator);

        FrameReport {
            timestamp_ms: now,
            samples,
            gate,
            counting_allowed,
            left,
            right,
            reps: self.aggregator.read(),
        }
    }
}

impl RepCounter for RepTracker {
    fn rep_count(&self) -> RepCount {
        self.reps()
    }

    fn reset_rep_counts(&mut self) {
        self.reset();
    }
}

/// Builder for `RepTracker`. Only the exercise is required.
#[derive(Default)]
pub struct RepTrackerBuilder {
    exercise: Option<Arc<ExerciseDefinition>>,
    cfg: Option<TrackerCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    stability_check: Option<Box<dyn Fn() -> bool>>,
}

impl RepTrackerBuilder {
    pub fn with_exercise(mut self, exercise: Arc<ExerciseDefinition>) -> Self {
        self.exercise = Some(exercise);
        self
    }

    pub fn with_config(mut self, cfg: TrackerCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Inject a custom clock (e.g. a manual clock for replays and tests).
    pub fn with_clock<C: Clock + Send + Sync + 'static>(mut self, clock: C) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// External "user is steady" check; counting pauses while it returns false.
    pub fn with_stability_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.stability_check = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<RepTracker> {
        let exercise = self
            .exercise
            .ok_or_else(|| eyre::Report::new(BuildError::MissingExercise))?;
        let cfg = self.cfg.unwrap_or_default();
        if cfg.visibility.min_visibility_pct > 100 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "min_visibility_pct must be <= 100",
            )));
        }
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let epoch = clock.now();
        Ok(RepTracker {
            left: side_track(&exercise, &[Side::Left, Side::None], &cfg),
            right: side_track(&exercise, &[Side::Right], &cfg),
            exercise,
            cfg,
            conditioner: SignalConditioner::new(cfg.smoothing),
            aggregator: RepAggregator::new(),
            clock,
            epoch,
            stability_check: self.stability_check,
            frames: 0,
        })
    }
}
