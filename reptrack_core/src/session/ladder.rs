//! Progressive rep-target protocol: climb from `start_reps` to `top_reps`,
//! then descend to `end_reps`.
//!
//! Sets end either on request ([`LadderSession::complete_current_set`]) or by
//! auto-advance once the counts reach the target. Rest lasts
//! `current_reps × rest_secs_per_rep` seconds; when it runs out the next step
//! starts (or the session ends) and the counts are reset.
//!
//! A misconfigured ladder (`increment == 0`, `start_reps > top_reps` or
//! `end_reps > top_reps`) is treated as already complete.

use std::sync::Arc;

use super::record::{SessionKind, SessionLog, SessionRecord};
use super::{Orchestrator, SessionEvent, SessionPhase, TimerHandle, TimerSlot};
use crate::aggregator::RepCounter;
use crate::config::LadderCfg;
use crate::exercise::ExerciseDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Up,
    Down,
}

fn ceil_div(n: i64, d: i64) -> i64 {
    (n + d - 1).div_euclid(d)
}

impl LadderCfg {
    pub fn is_misconfigured(&self) -> bool {
        self.increment == 0 || self.start_reps > self.top_reps || self.end_reps > self.top_reps
    }

    /// Direction of the first step. Starting at the top goes straight down.
    pub fn initial_direction(&self) -> Direction {
        if self.start_reps >= self.top_reps {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    /// Number of sets in the full ladder, clamped at zero.
    pub fn total_sets(&self) -> u32 {
        if self.is_misconfigured() {
            return 0;
        }
        let inc = i64::from(self.increment);
        let top = i64::from(self.top_reps);
        let up = ceil_div(top - i64::from(self.start_reps), inc) + 1;
        let down = ceil_div(top - i64::from(self.end_reps), inc);
        u32::try_from((up + down).max(0)).unwrap_or(u32::MAX)
    }

    /// Target and direction of the step after `current`.
    pub fn calculate_next_reps(&self, current: u32, direction: Direction) -> (u32, Direction) {
        match direction {
            Direction::Up => {
                let next = current.saturating_add(self.increment).min(self.top_reps);
                let dir = if next >= self.top_reps {
                    Direction::Down
                } else {
                    Direction::Up
                };
                (next, dir)
            }
            Direction::Down => (
                current.saturating_sub(self.increment).max(self.end_reps),
                Direction::Down,
            ),
        }
    }

    /// True once the set at `current` reps is the last one.
    pub fn is_complete(&self, current: u32, direction: Direction) -> bool {
        direction == Direction::Down && current <= self.end_reps
    }

    /// Every target in order, e.g. `[1, 2, 3, 2, 1]`.
    pub fn rep_sequence(&self) -> Vec<u32> {
        let total = self.total_sets() as usize;
        let mut seq = Vec::with_capacity(total);
        if total == 0 {
            return seq;
        }
        let mut reps = self.start_reps;
        let mut dir = self.initial_direction();
        while seq.len() < total {
            seq.push(reps);
            if self.is_complete(reps, dir) {
                break;
            }
            (reps, dir) = self.calculate_next_reps(reps, dir);
        }
        seq
    }
}

/// Display snapshot of a ladder session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LadderSessionState {
    pub phase: SessionPhase,
    pub current_reps: u32,
    pub direction: Direction,
    pub timer_seconds: u32,
    pub set_number: u32,
    pub total_sets: u32,
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct LadderSession {
    cfg: LadderCfg,
    state: LadderSessionState,
    exercise: Option<Arc<ExerciseDefinition>>,
    weight: Option<f32>,
    timer: TimerSlot,
    log: Option<SessionLog>,
}

impl LadderSession {
    pub fn new(cfg: LadderCfg) -> Self {
        Self {
            state: Self::idle_state(&cfg),
            cfg,
            exercise: None,
            weight: None,
            timer: TimerSlot::default(),
            log: None,
        }
    }

    fn idle_state(cfg: &LadderCfg) -> LadderSessionState {
        LadderSessionState {
            current_reps: cfg.start_reps,
            total_sets: cfg.total_sets(),
            ..LadderSessionState::default()
        }
    }

    pub fn state(&self) -> &LadderSessionState {
        &self.state
    }

    pub fn config(&self) -> &LadderCfg {
        &self.cfg
    }

    pub fn exercise(&self) -> Option<&Arc<ExerciseDefinition>> {
        self.exercise.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.state.phase != SessionPhase::Idle
    }

    /// Settings for the next run; ignored while a session is running.
    pub fn set_config(&mut self, cfg: LadderCfg) -> bool {
        if self.is_active() {
            tracing::warn!("ignoring ladder settings change while a session is running");
            return false;
        }
        self.state = Self::idle_state(&cfg);
        self.cfg = cfg;
        true
    }

    /// Weight logged with each set of the next run.
    pub fn set_weight(&mut self, weight: Option<f32>) -> bool {
        if self.is_active() {
            tracing::warn!("ignoring ladder weight change while a session is running");
            return false;
        }
        self.weight = weight;
        true
    }

    pub fn start(
        &mut self,
        exercise: Arc<ExerciseDefinition>,
        counter: &mut dyn RepCounter,
    ) -> Vec<SessionEvent> {
        if self.is_active() {
            tracing::debug!("ladder session already running");
            return Vec::new();
        }
        counter.reset_rep_counts();
        if self.cfg.is_misconfigured() {
            tracing::warn!(cfg = ?self.cfg, "ladder misconfigured; treating as complete");
            self.state = LadderSessionState {
                complete: true,
                ..Self::idle_state(&self.cfg)
            };
            return vec![SessionEvent::Finished(SessionLog::start(SessionKind::Ladder).finish())];
        }
        self.state = LadderSessionState {
            phase: SessionPhase::Exercising,
            current_reps: self.cfg.start_reps,
            direction: self.cfg.initial_direction(),
            timer_seconds: 0,
            set_number: 1,
            total_sets: self.cfg.total_sets(),
            complete: false,
        };
        self.exercise = Some(Arc::clone(&exercise));
        self.log = Some(SessionLog::start(SessionKind::Ladder));
        self.timer.arm();
        tracing::info!(
            exercise = %exercise.id,
            sequence = ?self.cfg.rep_sequence(),
            "ladder session started"
        );
        vec![SessionEvent::ExerciseChanged(exercise)]
    }

    /// End the set in progress and start resting. No-op unless exercising.
    pub fn complete_current_set(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        if self.state.phase != SessionPhase::Exercising {
            return Vec::new();
        }
        let mut events = Vec::new();
        if let (Some(ex), Some(log)) = (self.exercise.as_ref(), self.log.as_mut()) {
            let reps = log.record_set(ex, counter.rep_count(), self.weight);
            tracing::debug!(
                exercise = %ex.id,
                set = self.state.set_number,
                target = self.state.current_reps,
                reps,
                "ladder set finished"
            );
            events.push(SessionEvent::SetCompleted {
                exercise_id: ex.id.clone(),
                set_number: self.state.set_number,
                reps,
            });
        }
        self.state.phase = SessionPhase::Resting;
        self.state.timer_seconds =
            self.state.current_reps.saturating_mul(self.cfg.rest_secs_per_rep);
        if self.state.timer_seconds == 0 {
            events.extend(self.end_rest(counter));
        }
        events
    }

    /// Auto-advance check against the latest counts.
    pub fn observe(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        if !self.cfg.auto_advance || self.state.phase != SessionPhase::Exercising {
            return Vec::new();
        }
        let two_sided = self.exercise.as_ref().is_some_and(|e| e.is_two_sided);
        if counter.rep_count().reached(self.state.current_reps, two_sided) {
            tracing::debug!(target = self.state.current_reps, "target reached; auto-advancing");
            return self.complete_current_set(counter);
        }
        Vec::new()
    }

    pub fn tick(&mut self, handle: TimerHandle, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        if !self.timer.is_current(handle) {
            tracing::trace!("stale ladder tick ignored");
            return Vec::new();
        }
        match self.state.phase {
            SessionPhase::Idle => Vec::new(),
            SessionPhase::Exercising => self.observe(counter),
            SessionPhase::Resting => {
                self.state.timer_seconds = self.state.timer_seconds.saturating_sub(1);
                if self.state.timer_seconds == 0 {
                    self.end_rest(counter)
                } else {
                    Vec::new()
                }
            }
        }
    }

    fn end_rest(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        counter.reset_rep_counts();
        if self.cfg.is_complete(self.state.current_reps, self.state.direction) {
            let log = self
                .log
                .take()
                .unwrap_or_else(|| SessionLog::start(SessionKind::Ladder));
            self.timer.disarm();
            self.state = LadderSessionState {
                complete: true,
                ..Self::idle_state(&self.cfg)
            };
            let record = log.finish();
            tracing::info!(sets = record.set_count, "ladder session finished");
            return vec![SessionEvent::Finished(record)];
        }
        let (next, dir) = self
            .cfg
            .calculate_next_reps(self.state.current_reps, self.state.direction);
        self.state.current_reps = next;
        self.state.direction = dir;
        self.state.set_number += 1;
        self.state.phase = SessionPhase::Exercising;
        self.state.timer_seconds = 0;
        tracing::debug!(target = next, set = self.state.set_number, ?dir, "next ladder step");
        Vec::new()
    }

    /// Back to idle at `start_reps`, climbing. Safe to call repeatedly.
    pub fn stop(&mut self, counter: &mut dyn RepCounter) -> Option<SessionRecord> {
        if self.is_active() {
            tracing::info!(set = self.state.set_number, "ladder session stopped");
        }
        self.timer.disarm();
        self.state = Self::idle_state(&self.cfg);
        counter.reset_rep_counts();
        self.log.take().map(SessionLog::finish)
    }
}

impl Orchestrator for LadderSession {
    fn kind(&self) -> SessionKind {
        SessionKind::Ladder
    }

    fn is_active(&self) -> bool {
        LadderSession::is_active(self)
    }

    fn timer(&self) -> Option<TimerHandle> {
        self.timer.current()
    }

    fn tick(&mut self, handle: TimerHandle, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        LadderSession::tick(self, handle, counter)
    }

    fn observe(&mut self, counter: &mut dyn RepCounter) -> Vec<SessionEvent> {
        LadderSession::observe(self, counter)
    }

    fn stop(&mut self, counter: &mut dyn RepCounter) -> Option<SessionRecord> {
        LadderSession::stop(self, counter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(start: u32, top: u32, end: u32, inc: u32) -> LadderCfg {
        LadderCfg {
            start_reps: start,
            top_reps: top,
            end_reps: end,
            increment: inc,
            ..LadderCfg::default()
        }
    }

    #[test]
    fn uneven_increment_caps_at_top_and_end() {
        let c = cfg(1, 6, 1, 2);
        assert_eq!(c.rep_sequence(), vec![1, 3, 5, 6, 4, 2, 1]);
        assert_eq!(c.total_sets(), 7);
    }

    #[test]
    fn starting_at_top_only_descends() {
        let c = cfg(5, 5, 1, 1);
        assert_eq!(c.rep_sequence(), vec![5, 4, 3, 2, 1]);
        assert_eq!(c.total_sets(), 5);
    }

    #[test]
    fn misconfigured_has_no_sets() {
        for c in [cfg(1, 5, 1, 0), cfg(6, 5, 1, 1), cfg(1, 5, 7, 1)] {
            assert!(c.is_misconfigured());
            assert_eq!(c.total_sets(), 0);
            assert!(c.rep_sequence().is_empty());
        }
    }
}
