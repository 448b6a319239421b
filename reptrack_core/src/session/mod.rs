//! Session orchestrators built on top of the rep counts.
//!
//! Each orchestrator is a plain state machine driven from outside: a 1 Hz
//! `tick` for timers and an `observe` call after every processed frame.
//! Transitions report what happened as [`SessionEvent`]s; the caller applies
//! them (switching the tracker's exercise, persisting records).
//!
//! Timers are guarded by a [`TimerHandle`]. `stop()` invalidates the handle, so
//! a tick scheduled before the stop can never resurrect the session.

use std::sync::Arc;

use crate::aggregator::RepCounter;
use crate::exercise::ExerciseDefinition;

pub mod circuit;
pub mod ladder;
pub mod record;
pub mod timed;

pub use circuit::{CircuitSession, CircuitSessionState};
pub use ladder::{Direction, LadderSession, LadderSessionState};
pub use record::{ExerciseRecord, SessionKind, SessionLog, SessionRecord, SessionSink};
pub use timed::{TimedSession, TimedSessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Exercising,
    Resting,
}

/// Identifies one armed timer. Ticks carrying an older handle are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    generation: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TimerSlot {
    generation: u64,
    armed: bool,
}

impl TimerSlot {
    pub(crate) fn arm(&mut self) -> TimerHandle {
        self.generation = self.generation.wrapping_add(1);
        self.armed = true;
        TimerHandle {
            generation: self.generation,
        }
    }

    pub(crate) fn disarm(&mut self) {
        if self.armed {
            self.generation = self.generation.wrapping_add(1);
            self.armed = false;
        }
    }

    pub(crate) fn current(&self) -> Option<TimerHandle> {
        self.armed.then_some(TimerHandle {
            generation: self.generation,
        })
    }

    pub(crate) fn is_current(&self, handle: TimerHandle) -> bool {
        self.current() == Some(handle)
    }
}

/// Something the caller has to act on.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A new exercise is up; the tracker should switch to it.
    ExerciseChanged(Arc<ExerciseDefinition>),
    /// A set ended and was logged.
    SetCompleted {
        exercise_id: String,
        set_number: u32,
        reps: u32,
    },
    /// The session ran to completion; hand the record to persistence.
    Finished(SessionRecord),
}

/// Common driver interface so one loop can run any orchestrator.
pub trait Orchestrator {
    fn kind(&self) -> SessionKind;

    fn is_active(&self) -> bool;

    /// Handle of the running timer, if the orchestrator currently wants ticks.
    fn timer(&self) -> Option<TimerHandle>;

    /// One second elapsed.
    fn tick(&mut self, handle: TimerHandle, counter: &mut dyn RepCounter) -> Vec<SessionEvent>;

    /// Look at the counts right after a frame was processed.
    fn observe(&mut self, _counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        Vec::new()
    }

    /// Abort. Returns the partial record when anything was logged.
    fn stop(&mut self, counter: &mut dyn RepCounter) -> Option<SessionRecord>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disarmed_handle_is_stale() {
        let mut slot = TimerSlot::default();
        let h = slot.arm();
        assert!(slot.is_current(h));
        slot.disarm();
        assert!(!slot.is_current(h));
        let h2 = slot.arm();
        assert_ne!(h, h2);
        assert!(!slot.is_current(h));
    }
}
