//! Exercise definitions, signal evaluators and the exercise registry.
//!
//! Definitions are immutable once registered and shared as
//! `Arc<ExerciseDefinition>`; nothing downstream clones their contents.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use reptrack_traits::Landmark;

use crate::error::{Result, TrackerError};
use crate::joints::{angle_deg, distance, joint_index, resolve, visibility_of};

/// Which rep counter a tracked signal feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    /// Single-sided exercises; counted in the left slot.
    None,
}

/// How a tracked signal's raw value is derived from joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    /// Angle in degrees at the middle of three joints.
    Angle,
    /// Distance between two joints in normalized image units.
    Position,
}

impl SignalType {
    /// Number of joints a signal of this type needs.
    pub const fn point_count(self) -> usize {
        match self {
            Self::Angle => 3,
            Self::Position => 2,
        }
    }

    /// Derive this frame's raw value for `spec`.
    ///
    /// Returns `None` when a point is unknown, missing from the frame, or below
    /// `min_visibility`.
    pub fn measure(
        self,
        landmarks: &[Landmark],
        spec: &SignalSpec,
        min_visibility: f32,
    ) -> Option<f64> {
        if spec.points.len() != self.point_count() {
            return None;
        }
        let point = |name: &str| {
            resolve(landmarks, name).filter(|lm| visibility_of(lm) >= min_visibility)
        };
        match self {
            Self::Angle => {
                let a = point(&spec.points[0])?;
                let b = point(&spec.points[1])?;
                let c = point(&spec.points[2])?;
                Some(angle_deg(a, b, c))
            }
            Self::Position => {
                let a = point(&spec.points[0])?;
                let b = point(&spec.points[1])?;
                Some(distance(a, b))
            }
        }
    }
}

/// One numeric quantity watched for repetition phases.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub id: String,
    pub side: Side,
    pub points: Vec<String>,
    pub min_threshold: f64,
    pub max_threshold: f64,
    pub is_rep_counter: bool,
    /// The rest posture sits at the high end of the range.
    pub relaxed_is_high: bool,
}

impl SignalSpec {
    pub fn new(
        id: &str,
        side: Side,
        points: &[&str],
        min_threshold: f64,
        max_threshold: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            side,
            points: points.iter().map(|p| (*p).to_string()).collect(),
            min_threshold,
            max_threshold,
            is_rep_counter: true,
            relaxed_is_high: false,
        }
    }

    pub fn relaxed_high(mut self) -> Self {
        self.relaxed_is_high = true;
        self
    }

    pub fn display_only(mut self) -> Self {
        self.is_rep_counter = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseDefinition {
    pub id: String,
    pub name: String,
    pub is_two_sided: bool,
    pub has_weight: bool,
    pub signal_type: SignalType,
    pub tracked_signals: Vec<SignalSpec>,
    /// Joints that must be visible for counting (hard requirement).
    pub primary_joints: Vec<String>,
    /// Joints checked only when secondary gating is enabled.
    pub secondary_joints: Vec<String>,
}

impl ExerciseDefinition {
    /// The rep-counting signal feeding `side`, if any.
    pub fn counter_for(&self, side: Side) -> Option<&SignalSpec> {
        self.tracked_signals
            .iter()
            .find(|s| s.is_rep_counter && s.side == side)
    }
}

const LEFT_ARM: [&str; 3] = ["left_shoulder", "left_elbow", "left_wrist"];
const RIGHT_ARM: [&str; 3] = ["right_shoulder", "right_elbow", "right_wrist"];
const LEFT_LEG: [&str; 3] = ["left_hip", "left_knee", "left_ankle"];
const RIGHT_LEG: [&str; 3] = ["right_hip", "right_knee", "right_ankle"];
const LEFT_FLANK: [&str; 3] = ["left_hip", "left_shoulder", "left_elbow"];
const RIGHT_FLANK: [&str; 3] = ["right_hip", "right_shoulder", "right_elbow"];

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_string()).collect()
}

fn bicep_curl() -> ExerciseDefinition {
    ExerciseDefinition {
        id: "bicep_curl".into(),
        name: "Bicep Curl".into(),
        is_two_sided: true,
        has_weight: true,
        signal_type: SignalType::Angle,
        tracked_signals: vec![
            SignalSpec::new("left_elbow", Side::Left, &LEFT_ARM, 45.0, 160.0).relaxed_high(),
            SignalSpec::new("right_elbow", Side::Right, &RIGHT_ARM, 45.0, 160.0).relaxed_high(),
        ],
        primary_joints: names(&[
            "left_shoulder",
            "left_elbow",
            "left_wrist",
            "right_shoulder",
            "right_elbow",
            "right_wrist",
        ]),
        secondary_joints: names(&["left_hip", "right_hip"]),
    }
}

fn squat() -> ExerciseDefinition {
    ExerciseDefinition {
        id: "squat".into(),
        name: "Squat".into(),
        is_two_sided: false,
        has_weight: false,
        signal_type: SignalType::Angle,
        tracked_signals: vec![
            SignalSpec::new("left_knee", Side::None, &LEFT_LEG, 90.0, 160.0).relaxed_high(),
            SignalSpec::new("right_knee", Side::Right, &RIGHT_LEG, 90.0, 160.0)
                .relaxed_high()
                .display_only(),
        ],
        primary_joints: names(&LEFT_LEG),
        secondary_joints: names(&RIGHT_LEG),
    }
}

fn push_up() -> ExerciseDefinition {
    ExerciseDefinition {
        id: "push_up".into(),
        name: "Push-up".into(),
        is_two_sided: false,
        has_weight: false,
        signal_type: SignalType::Angle,
        tracked_signals: vec![
            SignalSpec::new("left_elbow", Side::None, &LEFT_ARM, 90.0, 150.0).relaxed_high(),
        ],
        primary_joints: names(&LEFT_ARM),
        secondary_joints: names(&["left_hip", "left_ankle"]),
    }
}

fn shoulder_press() -> ExerciseDefinition {
    ExerciseDefinition {
        id: "shoulder_press".into(),
        name: "Shoulder Press".into(),
        is_two_sided: true,
        has_weight: true,
        signal_type: SignalType::Angle,
        tracked_signals: vec![
            SignalSpec::new("left_elbow", Side::Left, &LEFT_ARM, 90.0, 160.0),
            SignalSpec::new("right_elbow", Side::Right, &RIGHT_ARM, 90.0, 160.0),
        ],
        primary_joints: names(&[
            "left_shoulder",
            "left_elbow",
            "left_wrist",
            "right_shoulder",
            "right_elbow",
            "right_wrist",
        ]),
        secondary_joints: Vec::new(),
    }
}

fn lateral_raise() -> ExerciseDefinition {
    ExerciseDefinition {
        id: "lateral_raise".into(),
        name: "Lateral Raise".into(),
        is_two_sided: true,
        has_weight: true,
        signal_type: SignalType::Angle,
        tracked_signals: vec![
            SignalSpec::new("left_shoulder", Side::Left, &LEFT_FLANK, 30.0, 80.0),
            SignalSpec::new("right_shoulder", Side::Right, &RIGHT_FLANK, 30.0, 80.0),
        ],
        primary_joints: names(&[LEFT_FLANK, RIGHT_FLANK].concat()),
        secondary_joints: names(&["left_wrist", "right_wrist"]),
    }
}

fn jumping_jack() -> ExerciseDefinition {
    ExerciseDefinition {
        id: "jumping_jack".into(),
        name: "Jumping Jack".into(),
        is_two_sided: false,
        has_weight: false,
        signal_type: SignalType::Position,
        tracked_signals: vec![
            SignalSpec::new("wrist_gap", Side::None, &["left_wrist", "right_wrist"], 0.15, 0.45)
                .relaxed_high(),
        ],
        primary_joints: names(&["left_wrist", "right_wrist"]),
        secondary_joints: names(&["left_ankle", "right_ankle"]),
    }
}

/// Problem found by [`ExerciseRegistry::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum IssueKind {
    UnknownJoint(String),
    PointCount { expected: usize, got: usize },
    InvertedThresholds,
    DuplicateId,
    MissingSide(Side),
    NoRepCounter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistryIssue {
    pub exercise_id: String,
    pub signal_id: Option<String>,
    pub kind: IssueKind,
}

impl fmt::Display for RegistryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.signal_id {
            Some(sig) => write!(f, "{}.{}: ", self.exercise_id, sig)?,
            None => write!(f, "{}: ", self.exercise_id)?,
        }
        match &self.kind {
            IssueKind::UnknownJoint(j) => write!(f, "unknown joint {j:?}"),
            IssueKind::PointCount { expected, got } => {
                write!(f, "expected {expected} points, got {got}")
            }
            IssueKind::InvertedThresholds => write!(f, "min_threshold must be < max_threshold"),
            IssueKind::DuplicateId => write!(f, "duplicate exercise id"),
            IssueKind::MissingSide(side) => write!(f, "two-sided exercise has no {side:?} counter"),
            IssueKind::NoRepCounter => write!(f, "no rep-counting signal"),
        }
    }
}

/// Owner of every exercise definition known to the process.
#[derive(Debug, Clone, Default)]
pub struct ExerciseRegistry {
    exercises: Vec<Arc<ExerciseDefinition>>,
}

impl ExerciseRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in exercise catalogue.
    pub fn builtin() -> Self {
        Self {
            exercises: [
                bicep_curl(),
                squat(),
                push_up(),
                shoulder_press(),
                lateral_raise(),
                jumping_jack(),
            ]
            .into_iter()
            .map(Arc::new)
            .collect(),
        }
    }

    /// Register another definition. Ids must be unique.
    pub fn insert(&mut self, def: ExerciseDefinition) -> Result<Arc<ExerciseDefinition>> {
        if self.get(&def.id).is_some() {
            return Err(eyre::Report::new(TrackerError::Registry(format!(
                "duplicate exercise id {:?}",
                def.id
            ))));
        }
        let def = Arc::new(def);
        self.exercises.push(Arc::clone(&def));
        Ok(def)
    }

    pub fn get(&self, id: &str) -> Option<Arc<ExerciseDefinition>> {
        self.exercises.iter().find(|e| e.id == id).cloned()
    }

    /// Like `get`, but an unknown id is an error.
    pub fn require(&self, id: &str) -> Result<Arc<ExerciseDefinition>> {
        self.get(id)
            .ok_or_else(|| eyre::Report::new(TrackerError::UnknownExercise(id.to_string())))
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.exercises
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ExerciseDefinition>> {
        self.exercises.iter()
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }

    /// Development-time consistency pass over every definition.
    ///
    /// Per-frame evaluation never fails on these problems; a bad joint name
    /// simply resolves to no value. This is where they become visible.
    pub fn validate(&self) -> Vec<RegistryIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        for ex in &self.exercises {
            let issue = |signal_id: Option<&str>, kind| RegistryIssue {
                exercise_id: ex.id.clone(),
                signal_id: signal_id.map(str::to_string),
                kind,
            };
            if !seen.insert(ex.id.as_str()) {
                issues.push(issue(None, IssueKind::DuplicateId));
            }
            for sig in &ex.tracked_signals {
                let expected = ex.signal_type.point_count();
                if sig.points.len() != expected {
                    issues.push(issue(
                        Some(&sig.id),
                        IssueKind::PointCount {
                            expected,
                            got: sig.points.len(),
                        },
                    ));
                }
                for p in &sig.points {
                    if joint_index(p).is_none() {
                        issues.push(issue(Some(&sig.id), IssueKind::UnknownJoint(p.clone())));
                    }
                }
                if !(sig.min_threshold < sig.max_threshold) {
                    issues.push(issue(Some(&sig.id), IssueKind::InvertedThresholds));
                }
            }
            for j in ex.primary_joints.iter().chain(&ex.secondary_joints) {
                if joint_index(j).is_none() {
                    issues.push(issue(None, IssueKind::UnknownJoint(j.clone())));
                }
            }
            if ex.is_two_sided {
                for side in [Side::Left, Side::Right] {
                    if ex.counter_for(side).is_none() {
                        issues.push(issue(None, IssueKind::MissingSide(side)));
                    }
                }
            } else if !ex.tracked_signals.iter().any(|s| s.is_rep_counter) {
                issues.push(issue(None, IssueKind::NoRepCounter));
            }
        }
        issues
    }
}
