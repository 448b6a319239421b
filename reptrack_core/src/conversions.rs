//! `From` implementations bridging `reptrack_config` types to `reptrack_core` types.

use crate::config::{
    LadderCfg, PhaseCfg, PhaseMode, RunCfg, RunMode, SmoothingCfg, TimedCfg, TrackerCfg,
    VisibilityCfg,
};
use crate::exercise::{ExerciseDefinition, Side, SignalSpec, SignalType};
use crate::session::circuit::{CircuitPlan, PlanItem, PlannedSet, WorkoutPlan};

// ── TrackerCfg ───────────────────────────────────────────────────────────────

impl From<&reptrack_config::Config> for TrackerCfg {
    fn from(c: &reptrack_config::Config) -> Self {
        Self {
            smoothing: SmoothingCfg {
                enabled: c.tracking.smoothing_enabled,
                window: c.tracking.smoothing_window,
            },
            phase: PhaseCfg {
                mode: if c.tracking.use_phase_sequence {
                    PhaseMode::PhaseSequence
                } else {
                    PhaseMode::ThresholdCrossing
                },
                peak_hold_ms: c.tracking.peak_hold_ms,
            },
            visibility: VisibilityCfg::from(&c.visibility),
        }
    }
}

impl From<&reptrack_config::VisibilityCfg> for VisibilityCfg {
    fn from(c: &reptrack_config::VisibilityCfg) -> Self {
        Self {
            require_primary: c.require_all_landmarks,
            min_visibility_pct: c.min_visibility_pct,
            require_secondary: c.require_secondary_landmarks,
        }
    }
}

// ── Sessions ─────────────────────────────────────────────────────────────────

impl From<&reptrack_config::TimedCfg> for TimedCfg {
    fn from(c: &reptrack_config::TimedCfg) -> Self {
        Self {
            exercise_set_secs: c.exercise_set_secs,
            rest_secs: c.rest_secs,
            total_sets: c.total_sets,
            fixed_exercise: c.fixed_exercise.clone(),
        }
    }
}

impl From<&reptrack_config::LadderCfg> for LadderCfg {
    fn from(c: &reptrack_config::LadderCfg) -> Self {
        Self {
            start_reps: c.start_reps,
            top_reps: c.top_reps,
            end_reps: c.end_reps,
            increment: c.increment,
            rest_secs_per_rep: c.rest_secs_per_rep,
            auto_advance: c.auto_advance,
        }
    }
}

// ── Runner ───────────────────────────────────────────────────────────────────

impl From<&reptrack_config::RunnerCfg> for RunCfg {
    fn from(c: &reptrack_config::RunnerCfg) -> Self {
        Self {
            mode: match c.mode {
                reptrack_config::RunMode::Direct => RunMode::Direct,
                reptrack_config::RunMode::Feed => RunMode::Feed,
            },
            frame_rate_hz: c.frame_rate_hz,
            stall_timeout_ms: c.stall_timeout_ms,
        }
    }
}

// ── Exercises ────────────────────────────────────────────────────────────────

impl From<&reptrack_config::ExerciseToml> for ExerciseDefinition {
    fn from(c: &reptrack_config::ExerciseToml) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            is_two_sided: c.two_sided,
            has_weight: c.has_weight,
            signal_type: match c.signal_type {
                reptrack_config::SignalKind::Angle => SignalType::Angle,
                reptrack_config::SignalKind::Position => SignalType::Position,
            },
            tracked_signals: c
                .signals
                .iter()
                .map(|s| SignalSpec {
                    id: s.id.clone(),
                    side: match s.side {
                        reptrack_config::SideToml::Left => Side::Left,
                        reptrack_config::SideToml::Right => Side::Right,
                        reptrack_config::SideToml::None => Side::None,
                    },
                    points: s.points.clone(),
                    min_threshold: s.min_threshold,
                    max_threshold: s.max_threshold,
                    is_rep_counter: s.rep_counter,
                    relaxed_is_high: s.relaxed_is_high,
                })
                .collect(),
            primary_joints: c.primary_joints.clone(),
            secondary_joints: c.secondary_joints.clone(),
        }
    }
}

// ── Workout plans ────────────────────────────────────────────────────────────

impl From<&reptrack_config::SetToml> for PlannedSet {
    fn from(c: &reptrack_config::SetToml) -> Self {
        Self {
            exercise_id: c.exercise.clone(),
            target_reps: c.reps,
            weight: c.weight,
        }
    }
}

impl From<&reptrack_config::PlanToml> for WorkoutPlan {
    fn from(c: &reptrack_config::PlanToml) -> Self {
        Self {
            items: c
                .items
                .iter()
                .map(|item| match item {
                    reptrack_config::PlanItemToml::Set(s) => PlanItem::Set(s.into()),
                    reptrack_config::PlanItemToml::Circuit(circ) => PlanItem::Circuit(CircuitPlan {
                        id: circ.id.clone(),
                        name: if circ.name.is_empty() {
                            circ.id.clone()
                        } else {
                            circ.name.clone()
                        },
                        repetitions: circ.repetitions,
                        elements: circ.elements.iter().map(PlannedSet::from).collect(),
                    }),
                })
                .collect(),
        }
    }
}
