//! Session summaries handed to persistence.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregator::RepCount;
use crate::error::Result;
use crate::exercise::ExerciseDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Timed,
    Ladder,
    Circuit,
}

/// One completed set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExerciseRecord {
    pub exercise_id: String,
    /// Reps credited to the set (weaker side for two-sided exercises).
    pub reps: u32,
    pub reps_left: u32,
    pub reps_right: u32,
    pub weight: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub kind: SessionKind,
    pub exercises: Vec<ExerciseRecord>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub set_count: u32,
}

/// Accumulates sets while a session runs.
#[derive(Debug, Clone)]
pub struct SessionLog {
    kind: SessionKind,
    started: DateTime<Utc>,
    exercises: Vec<ExerciseRecord>,
}

impl SessionLog {
    pub fn start(kind: SessionKind) -> Self {
        Self::start_at(kind, Utc::now())
    }

    pub fn start_at(kind: SessionKind, started: DateTime<Utc>) -> Self {
        Self {
            kind,
            started,
            exercises: Vec::new(),
        }
    }

    pub fn record_set(
        &mut self,
        exercise: &ExerciseDefinition,
        counts: RepCount,
        weight: Option<f32>,
    ) -> u32 {
        let reps = counts.completed(exercise.is_two_sided);
        self.exercises.push(ExerciseRecord {
            exercise_id: exercise.id.clone(),
            reps,
            reps_left: counts.left,
            reps_right: counts.right,
            weight,
        });
        reps
    }

    pub fn sets(&self) -> &[ExerciseRecord] {
        &self.exercises
    }

    pub fn finish(self) -> SessionRecord {
        self.finish_at(Utc::now())
    }

    pub fn finish_at(self, end_time: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            kind: self.kind,
            set_count: u32::try_from(self.exercises.len()).unwrap_or(u32::MAX),
            exercises: self.exercises,
            start_time: self.started,
            end_time,
        }
    }
}

/// Opaque append-only store for finished sessions.
pub trait SessionSink {
    fn append(&mut self, record: &SessionRecord) -> Result<()>;
}

impl SessionSink for Vec<SessionRecord> {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        self.push(record.clone());
        Ok(())
    }
}

impl<S: SessionSink + ?Sized> SessionSink for Box<S> {
    fn append(&mut self, record: &SessionRecord) -> Result<()> {
        (**self).append(record)
    }
}
