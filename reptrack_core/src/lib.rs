#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core repetition tracking (pose-engine agnostic).
//!
//! This crate turns per-frame joint positions into repetition counts and runs
//! workout sessions on top of them. Pose input arrives through
//! `reptrack_traits::PoseSource`; nothing here talks to a camera.
//!
//! ## Architecture
//!
//! - **Exercises**: definitions, signal evaluators, registry (`exercise`)
//! - **Conditioning**: EMA smoothing and visibility gating (`conditioner`)
//! - **Phases**: per-side threshold or phase-sequence machine (`phase`)
//! - **Counts**: the `{left, right}` aggregator (`aggregator`)
//! - **Pipeline**: `RepTracker` wiring the above per frame (`tracker`)
//! - **Sessions**: timed, ladder and circuit orchestrators (`session`)
//! - **Driving**: `Runner` and the background `FrameFeed`
//!
//! Per-frame work is synchronous and single-threaded. Orchestrators are
//! ticked once per second by whoever drives them.

pub mod aggregator;
pub mod conditioner;
pub mod config;
pub mod conversions;
pub mod error;
pub mod exercise;
pub mod frame_feed;
pub mod joints;
pub mod mocks;
pub mod phase;
pub mod runner;
pub mod session;
pub mod tracker;
pub mod util;

pub use aggregator::{RepAggregator, RepCount, RepCounter};
pub use conditioner::{FrameGate, GateResult, SignalConditioner, SignalSample};
pub use config::{
    LadderCfg, PhaseCfg, PhaseMode, RunCfg, RunMode, SmoothingCfg, TimedCfg, TrackerCfg,
    VisibilityCfg,
};
pub use error::{BuildError, Result, TrackerError};
pub use exercise::{ExerciseDefinition, ExerciseRegistry, Side, SignalSpec, SignalType};
pub use phase::{Phase, PhaseMachine, PhaseState, PhaseStep, SequencePhase, ThresholdPhase};
pub use runner::{RunSummary, Runner};
pub use session::circuit::{CircuitPlan, PlanItem, PlanStep, PlannedSet, WorkoutPlan};
pub use session::{
    CircuitSession, Direction, LadderSession, Orchestrator, SessionEvent, SessionPhase,
    SessionRecord, SessionSink, TimedSession, TimerHandle,
};
pub use tracker::{FrameReport, RepTracker, RepTrackerBuilder};

/// Registry with the built-ins plus every `[[exercises]]` entry from `cfg`.
pub fn registry_from_config(cfg: &reptrack_config::Config) -> Result<ExerciseRegistry> {
    let mut registry = ExerciseRegistry::builtin();
    for ex in &cfg.exercises {
        registry.insert(ExerciseDefinition::from(ex))?;
    }
    for issue in registry.validate() {
        tracing::warn!(%issue, "exercise registry issue");
    }
    Ok(registry)
}
