//! Duration-based exercise/rest cycling.
//!
//! `Idle → Exercising → Resting → (Exercising | Idle)`. Exercises come from a
//! pool, picked at random without immediate repeats, unless a fixed exercise is
//! configured. Settings can only change while idle.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use super::record::{SessionKind, SessionLog, SessionRecord};
use super::{Orchestrator, SessionEvent, SessionPhase, TimerHandle, TimerSlot};
use crate::aggregator::RepCounter;
use crate::config::TimedCfg;
use crate::exercise::ExerciseDefinition;

/// Display snapshot of a timed session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimedSessionState {
    pub phase: SessionPhase,
    pub timer_seconds: u32,
    pub current_exercise: Option<Arc<ExerciseDefinition>>,
    pub upcoming_exercise: Option<Arc<ExerciseDefinition>>,
    pub set_number: u32,
    pub total_sets: u32,
}

pub struct TimedSession<R: Rng = StdRng> {
    cfg: TimedCfg,
    pool: Vec<Arc<ExerciseDefinition>>,
    state: TimedSessionState,
    rng: R,
    timer: TimerSlot,
    log: Option<SessionLog>,
}

impl<R: Rng> std::fmt::Debug for TimedSession<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimedSession")
            .field("cfg", &self.cfg)
            .field("pool", &self.pool.iter().map(|e| e.id.as_str()).collect::<Vec<_>>())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TimedSession<StdRng> {
    /// Session seeded from OS entropy.
    pub fn from_entropy(cfg: TimedCfg, pool: Vec<Arc<ExerciseDefinition>>) -> Self {
        Self::new(cfg, pool, StdRng::from_entropy())
    }
}

impl<R: Rng> TimedSession<R> {
    pub fn new(cfg: TimedCfg, pool: Vec<Arc<ExerciseDefinition>>, rng: R) -> Self {
        let state = TimedSessionState {
            total_sets: cfg.total_sets,
            ..TimedSessionState::default()
        };
        Self {
            cfg,
            pool,
            state,
            rng,
            timer: TimerSlot::default(),
            log: None,
        }
    }

    pub fn state(&self) -> &TimedSessionState {
        &self.state
    }

    pub fn config(&self) -> &TimedCfg {
        &self.cfg
    }

    pub fn is_active(&self) -> bool {
        self.state.phase != SessionPhase::Idle
    }

    fn pick(&mut self, avoid: Option<&ExerciseDefinition>) -> Option<Arc<ExerciseDefinition>> {
        if let Some(id) = self.cfg.fixed_exercise.as_deref() {
            if let Some(ex) = self.pool.iter().find(|e| e.id == id) {
                return Some(Arc::clone(ex));
            }
            tracing::warn!(exercise = id, "fixed exercise not in pool; picking at random");
        }
        let candidates: Vec<&Arc<ExerciseDefinition>> = match avoid {
            Some(prev) if self.pool.len() >= 2 => {
                self.pool.iter().filter(|e| e.id != prev.id).collect()
            }
            _ => self.pool.iter().collect(),
        };
        // All entries share the avoided id: fall back to the whole pool.
        let candidates = if candidates.is_empty() {
            self.pool.iter().collect()
        } else {
            candidates
        };
        candidates.choose(&mut self.rng).map(|e| Arc::clone(*e))
    }

    /// Begin set 1. Does nothing when already running or the pool is empty.
    pub fn start(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        if self.is_active() {
            tracing::debug!("timed session already running");
            return Vec::new();
        }
        let Some(current) = self.pick(None) else {
            tracing::warn!("timed session has no exercises to pick from");
            return Vec::new();
        };
        let upcoming = self.pick(Some(current.as_ref()));
        self.state = TimedSessionState {
            phase: SessionPhase::Exercising,
            timer_seconds: self.cfg.exercise_set_secs,
            current_exercise: Some(Arc::clone(&current)),
            upcoming_exercise: upcoming,
            set_number: 1,
            total_sets: self.cfg.total_sets,
        };
        counter.reset_rep_counts();
        self.log = Some(SessionLog::start(SessionKind::Timed));
        self.timer.arm();
        tracing::info!(
            exercise = %current.id,
            total_sets = self.cfg.total_sets,
            set_secs = self.cfg.exercise_set_secs,
            rest_secs = self.cfg.rest_secs,
            "timed session started"
        );
        vec![SessionEvent::ExerciseChanged(current)]
    }

    /// Advance the timer by one second.
    pub fn tick(&mut self, handle: TimerHandle, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        if !self.timer.is_current(handle) {
            tracing::trace!("stale timed-session tick ignored");
            return Vec::new();
        }
        self.state.timer_seconds = self.state.timer_seconds.saturating_sub(1);
        if self.state.timer_seconds > 0 {
            return Vec::new();
        }
        match self.state.phase {
            SessionPhase::Idle => Vec::new(),
            SessionPhase::Exercising => self.end_set(counter),
            SessionPhase::Resting => self.end_rest(counter),
        }
    }

    fn end_set(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let (Some(ex), Some(log)) = (self.state.current_exercise.as_ref(), self.log.as_mut()) {
            let reps = log.record_set(ex, counter.rep_count(), None);
            tracing::debug!(exercise = %ex.id, set = self.state.set_number, reps, "set finished");
            events.push(SessionEvent::SetCompleted {
                exercise_id: ex.id.clone(),
                set_number: self.state.set_number,
                reps,
            });
        }
        self.state.phase = SessionPhase::Resting;
        self.state.timer_seconds = self.cfg.rest_secs;
        events
    }

    fn end_rest(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        if self.state.set_number >= self.state.total_sets {
            let record = self.finish(counter);
            tracing::info!(sets = record.set_count, "timed session finished");
            return vec![SessionEvent::Finished(record)];
        }
        let current = self.state.upcoming_exercise.take().or_else(|| self.pick(None));
        let Some(current) = current else {
            return Vec::new();
        };
        self.state.upcoming_exercise = self.pick(Some(current.as_ref()));
        self.state.current_exercise = Some(Arc::clone(&current));
        self.state.set_number += 1;
        self.state.phase = SessionPhase::Exercising;
        self.state.timer_seconds = self.cfg.exercise_set_secs;
        counter.reset_rep_counts();
        tracing::debug!(exercise = %current.id, set = self.state.set_number, "next set");
        vec![SessionEvent::ExerciseChanged(current)]
    }

    fn finish(&mut self, counter: &mut dyn RepCounter) -> SessionRecord {
        let log = self
            .log
            .take()
            .unwrap_or_else(|| SessionLog::start(SessionKind::Timed));
        self.reset_to_idle(counter);
        log.finish()
    }

    fn reset_to_idle(&mut self, counter: &mut dyn RepCounter) {
        self.timer.disarm();
        self.state = TimedSessionState {
            total_sets: self.cfg.total_sets,
            ..TimedSessionState::default()
        };
        counter.reset_rep_counts();
    }

    /// Return to idle from any phase. Safe to call repeatedly.
    pub fn stop(&mut self, counter: &mut dyn RepCounter) -> Option<SessionRecord> {
        let log = self.log.take();
        if self.is_active() {
            tracing::info!(set = self.state.set_number, "timed session stopped");
        }
        self.reset_to_idle(counter);
        log.map(SessionLog::finish)
    }

    fn configure(&mut self, what: &str, apply: impl FnOnce(&mut TimedCfg)) -> bool {
        if self.is_active() {
            tracing::warn!(setting = what, "ignoring settings change while a session is running");
            return false;
        }
        apply(&mut self.cfg);
        self.state.total_sets = self.cfg.total_sets;
        true
    }

    pub fn set_exercise_set_secs(&mut self, secs: u32) -> bool {
        self.configure("exercise_set_secs", |c| c.exercise_set_secs = secs)
    }

    pub fn set_rest_secs(&mut self, secs: u32) -> bool {
        self.configure("rest_secs", |c| c.rest_secs = secs)
    }

    pub fn set_total_sets(&mut self, sets: u32) -> bool {
        self.configure("total_sets", |c| c.total_sets = sets)
    }

    /// `None` switches back to random selection.
    pub fn set_fixed_exercise(&mut self, id: Option<String>) -> bool {
        self.configure("fixed_exercise", |c| c.fixed_exercise = id)
    }
}

impl<R: Rng> Orchestrator for TimedSession<R> {
    fn kind(&self) -> SessionKind {
        SessionKind::Timed
    }

    fn is_active(&self) -> bool {
        TimedSession::is_active(self)
    }

    fn timer(&self) -> Option<TimerHandle> {
        self.timer.current()
    }

    fn tick(&mut self, handle: TimerHandle, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        TimedSession::tick(self, handle, counter)
    }

    fn stop(&mut self, counter: &mut dyn RepCounter) -> Option<SessionRecord> {
        TimedSession::stop(self, counter)
    }
}
