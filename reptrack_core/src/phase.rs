//! Per-side repetition phase machine.
//!
//! Two algorithms share one driver:
//!
//! - **Threshold crossing**: `Idle → Active → Completed → Idle`. Thresholds are
//!   compared in raw value space; `relaxed_is_high` plays no part.
//! - **Phase sequence**: `Relaxed → Concentric → Peak → Eccentric → Relaxed`,
//!   with a minimum dwell in `Peak` before the way down is accepted.
//!
//! A missing value or a closed gate freezes the machine where it is. The
//! machine moves at most one step per frame in sequence mode, so states never
//! skip. `rep_count` never decreases except through [`PhaseMachine::reset`].

use crate::config::{PhaseCfg, PhaseMode};
use crate::exercise::SignalSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThresholdPhase {
    Idle,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequencePhase {
    Relaxed,
    Concentric,
    Peak,
    Eccentric,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Threshold(ThresholdPhase),
    Sequence(SequencePhase),
}

impl Phase {
    pub const fn initial(mode: PhaseMode) -> Self {
        match mode {
            PhaseMode::ThresholdCrossing => Self::Threshold(ThresholdPhase::Idle),
            PhaseMode::PhaseSequence => Self::Sequence(SequencePhase::Relaxed),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Threshold(ThresholdPhase::Idle) => "idle",
            Self::Threshold(ThresholdPhase::Active) => "active",
            Self::Threshold(ThresholdPhase::Completed) => "completed",
            Self::Sequence(SequencePhase::Relaxed) => "relaxed",
            Self::Sequence(SequencePhase::Concentric) => "concentric",
            Self::Sequence(SequencePhase::Peak) => "peak",
            Self::Sequence(SequencePhase::Eccentric) => "eccentric",
        }
    }
}

/// Observable state of one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseState {
    pub phase: Phase,
    pub last_phase_change_ms: u64,
    pub rep_count: u32,
    pub peak_hold_satisfied: bool,
}

/// What one frame did to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStep {
    pub before: Phase,
    pub after: Phase,
    /// Intermediate phase passed through within the same frame, if any.
    pub via: Option<Phase>,
    pub rep_completed: bool,
}

impl PhaseStep {
    fn hold(phase: Phase) -> Self {
        Self {
            before: phase,
            after: phase,
            via: None,
            rep_completed: false,
        }
    }

    pub fn changed(&self) -> bool {
        self.before != self.after || self.via.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Rest,
    Mid,
    Peak,
}

fn zone(v: f64, spec: &SignalSpec) -> Zone {
    let (at_rest, at_peak) = if spec.relaxed_is_high {
        (v >= spec.max_threshold, v <= spec.min_threshold)
    } else {
        (v <= spec.min_threshold, v >= spec.max_threshold)
    };
    if at_rest {
        Zone::Rest
    } else if at_peak {
        Zone::Peak
    } else {
        Zone::Mid
    }
}

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    cfg: PhaseCfg,
    state: PhaseState,
    peak_entered_ms: Option<u64>,
}

impl PhaseMachine {
    pub fn new(cfg: PhaseCfg) -> Self {
        Self {
            cfg,
            state: PhaseState {
                phase: Phase::initial(cfg.mode),
                last_phase_change_ms: 0,
                rep_count: 0,
                peak_hold_satisfied: false,
            },
            peak_entered_ms: None,
        }
    }

    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn rep_count(&self) -> u32 {
        self.state.rep_count
    }

    /// Back to the initial phase with a zero count.
    pub fn reset(&mut self) {
        *self = Self::new(self.cfg);
    }

    /// Apply new settings from the next frame on.
    ///
    /// Switching algorithms restarts the phase but keeps the count.
    pub fn set_cfg(&mut self, cfg: PhaseCfg) {
        if cfg.mode != self.cfg.mode {
            self.state.phase = Phase::initial(cfg.mode);
            self.clear_tracking();
        }
        self.cfg = cfg;
    }

    /// Advance on one conditioned value.
    pub fn update(
        &mut self,
        value: Option<f64>,
        spec: &SignalSpec,
        allowed: bool,
        now_ms: u64,
    ) -> PhaseStep {
        let before = self.state.phase;
        let Some(v) = value.filter(|v| v.is_finite()) else {
            return PhaseStep::hold(before);
        };
        if !allowed {
            return PhaseStep::hold(before);
        }
        let step = match before {
            Phase::Threshold(p) => self.step_threshold(p, v, spec),
            Phase::Sequence(p) => self.step_sequence(p, v, spec, now_ms),
        };
        if step.changed() {
            self.state.last_phase_change_ms = now_ms;
            tracing::trace!(
                signal = %spec.id,
                from = step.before.name(),
                to = step.after.name(),
                value = v,
                "phase change"
            );
        }
        if step.rep_completed {
            tracing::debug!(signal = %spec.id, reps = self.state.rep_count, "rep completed");
        }
        step
    }

    fn step_threshold(&mut self, p: ThresholdPhase, v: f64, spec: &SignalSpec) -> PhaseStep {
        let before = Phase::Threshold(p);
        let mut step = PhaseStep::hold(before);
        match p {
            ThresholdPhase::Idle => {
                if v < spec.min_threshold {
                    step.after = Phase::Threshold(ThresholdPhase::Active);
                }
            }
            ThresholdPhase::Active => {
                if v > spec.max_threshold {
                    self.state.rep_count = self.state.rep_count.saturating_add(1);
                    step.rep_completed = true;
                    step.after = Phase::Threshold(ThresholdPhase::Completed);
                    // Completed re-checks the same value before the frame ends.
                    if v >= spec.min_threshold {
                        step.via = Some(step.after);
                        step.after = Phase::Threshold(ThresholdPhase::Idle);
                    }
                }
            }
            ThresholdPhase::Completed => {
                if v >= spec.min_threshold {
                    step.after = Phase::Threshold(ThresholdPhase::Idle);
                }
            }
        }
        self.state.phase = step.after;
        step
    }

    fn step_sequence(
        &mut self,
        p: SequencePhase,
        v: f64,
        spec: &SignalSpec,
        now_ms: u64,
    ) -> PhaseStep {
        use SequencePhase::*;

        let before = Phase::Sequence(p);
        let z = zone(v, spec);
        let mut rep_completed = false;
        let next = match (p, z) {
            (Relaxed, Zone::Rest) => Relaxed,
            (Relaxed, _) => Concentric,
            (Concentric, Zone::Peak) => {
                self.enter_peak(now_ms);
                Peak
            }
            (Concentric, Zone::Rest) => {
                self.clear_tracking();
                Relaxed
            }
            (Concentric, Zone::Mid) => Concentric,
            (Peak, Zone::Peak) => {
                self.refresh_hold(now_ms);
                Peak
            }
            // Only frames seen inside the peak zone count towards the hold.
            (Peak, _) if self.state.peak_hold_satisfied => Eccentric,
            (Peak, _) => {
                self.clear_tracking();
                Concentric
            }
            (Eccentric, Zone::Rest) => {
                self.state.rep_count = self.state.rep_count.saturating_add(1);
                rep_completed = true;
                self.clear_tracking();
                Relaxed
            }
            (Eccentric, Zone::Peak) => {
                self.enter_peak(now_ms);
                Peak
            }
            (Eccentric, Zone::Mid) => Eccentric,
        };
        self.state.phase = Phase::Sequence(next);
        PhaseStep {
            before,
            after: self.state.phase,
            via: None,
            rep_completed,
        }
    }

    fn enter_peak(&mut self, now_ms: u64) {
        self.peak_entered_ms = Some(now_ms);
        self.state.peak_hold_satisfied = self.cfg.peak_hold_ms == 0;
    }

    fn refresh_hold(&mut self, now_ms: u64) {
        if let Some(since) = self.peak_entered_ms
            && now_ms.saturating_sub(since) >= self.cfg.peak_hold_ms
        {
            self.state.peak_hold_satisfied = true;
        }
    }

    fn clear_tracking(&mut self) {
        self.peak_entered_ms = None;
        self.state.peak_hold_satisfied = false;
    }
}
