#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas for the repetition tracker and its workout plans.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Workout plans live in their own TOML document (`load_plan_toml`).
//! - Every section has defaults, so an empty document is a valid config.
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TrackingCfg {
    /// Apply EMA smoothing to every tracked signal.
    pub smoothing_enabled: bool,
    /// EMA window N (alpha = 2/(N+1)). 0 and 1 pass values through unchanged.
    pub smoothing_window: u32,
    /// Use the four-phase sequence machine instead of threshold crossing.
    pub use_phase_sequence: bool,
    /// Minimum dwell in the peak phase before it counts (phase-sequence mode).
    pub peak_hold_ms: u64,
}

impl Default for TrackingCfg {
    fn default() -> Self {
        Self {
            smoothing_enabled: true,
            smoothing_window: 5,
            use_phase_sequence: false,
            peak_hold_ms: 300,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct VisibilityCfg {
    /// Gate counting on the exercise's primary joints.
    pub require_all_landmarks: bool,
    /// Minimum joint confidence in percent (0..=80).
    pub min_visibility_pct: u8,
    /// Additionally gate on the secondary joints.
    pub require_secondary_landmarks: bool,
}

impl Default for VisibilityCfg {
    fn default() -> Self {
        Self {
            require_all_landmarks: true,
            min_visibility_pct: 50,
            require_secondary_landmarks: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimedCfg {
    pub exercise_set_secs: u32,
    pub rest_secs: u32,
    pub total_sets: u32,
    /// Always use this exercise instead of a random pick.
    pub fixed_exercise: Option<String>,
    /// Exercise ids to pick from; empty means every registered exercise.
    pub exercises: Vec<String>,
}

impl Default for TimedCfg {
    fn default() -> Self {
        Self {
            exercise_set_secs: 40,
            rest_secs: 20,
            total_sets: 5,
            fixed_exercise: None,
            exercises: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LadderCfg {
    pub start_reps: u32,
    pub top_reps: u32,
    pub end_reps: u32,
    pub increment: u32,
    pub rest_secs_per_rep: u32,
    /// Complete a step automatically once the counted reps reach the target.
    pub auto_advance: bool,
}

impl Default for LadderCfg {
    fn default() -> Self {
        Self {
            start_reps: 1,
            top_reps: 5,
            end_reps: 1,
            increment: 1,
            rest_secs_per_rep: 3,
            auto_advance: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Read every frame in order inside the processing loop.
    #[default]
    Direct,
    /// Read frames on a background thread and process only the latest.
    Feed,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    pub mode: RunMode,
    /// Expected pose engine cadence, used to pace the feed.
    pub frame_rate_hz: u32,
    /// Abort a feed run when the source has been silent this long (0 = never).
    pub stall_timeout_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            mode: RunMode::Direct,
            frame_rate_hz: 30,
            stall_timeout_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct History {
    /// JSON-lines file that finished session records are appended to.
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Angle,
    Position,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SideToml {
    Left,
    Right,
    #[default]
    None,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SignalToml {
    pub id: String,
    #[serde(default)]
    pub side: SideToml,
    /// Three joint names for an angle, two for a distance.
    pub points: Vec<String>,
    pub min_threshold: f64,
    pub max_threshold: f64,
    #[serde(default = "default_true")]
    pub rep_counter: bool,
    #[serde(default)]
    pub relaxed_is_high: bool,
}

/// Extra exercise supplied by the user alongside the built-in ones.
#[derive(Debug, Deserialize, Clone)]
pub struct ExerciseToml {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub two_sided: bool,
    #[serde(default)]
    pub has_weight: bool,
    pub signal_type: SignalKind,
    #[serde(default)]
    pub primary_joints: Vec<String>,
    #[serde(default)]
    pub secondary_joints: Vec<String>,
    pub signals: Vec<SignalToml>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingCfg,
    pub visibility: VisibilityCfg,
    pub timed: TimedCfg,
    pub ladder: LadderCfg,
    pub runner: RunnerCfg,
    pub logging: Logging,
    pub history: History,
    pub exercises: Vec<ExerciseToml>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Tracking
        if self.tracking.smoothing_window > 100 {
            eyre::bail!("tracking.smoothing_window must be <= 100");
        }
        if self.tracking.peak_hold_ms > 10_000 {
            eyre::bail!("tracking.peak_hold_ms is unreasonably large (>10s)");
        }

        // Visibility
        if self.visibility.min_visibility_pct > 80 {
            eyre::bail!("visibility.min_visibility_pct must be in [0, 80]");
        }

        // Timed
        if self.timed.exercise_set_secs == 0 {
            eyre::bail!("timed.exercise_set_secs must be >= 1");
        }
        if self.timed.total_sets == 0 {
            eyre::bail!("timed.total_sets must be >= 1");
        }
        if self.timed.rest_secs > 60 * 60 {
            eyre::bail!("timed.rest_secs is unreasonably large (>1h)");
        }
        if let Some(fixed) = &self.timed.fixed_exercise
            && fixed.trim().is_empty()
        {
            eyre::bail!("timed.fixed_exercise must not be empty when set");
        }

        // Ladder
        if self.ladder.increment == 0 {
            eyre::bail!("ladder.increment must be >= 1");
        }
        if self.ladder.top_reps == 0 {
            eyre::bail!("ladder.top_reps must be >= 1");
        }
        if self.ladder.start_reps > self.ladder.top_reps {
            eyre::bail!("ladder.start_reps must be <= ladder.top_reps");
        }
        if self.ladder.end_reps > self.ladder.top_reps {
            eyre::bail!("ladder.end_reps must be <= ladder.top_reps");
        }

        // Runner
        if self.runner.frame_rate_hz == 0 || self.runner.frame_rate_hz > 240 {
            eyre::bail!("runner.frame_rate_hz must be in [1, 240]");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
        }

        // Exercises
        let mut seen = HashSet::new();
        for ex in &self.exercises {
            if ex.id.trim().is_empty() {
                eyre::bail!("exercises: id must not be empty");
            }
            if !seen.insert(ex.id.as_str()) {
                eyre::bail!("exercises: duplicate id {:?}", ex.id);
            }
            if ex.signals.is_empty() {
                eyre::bail!("exercises.{}: at least one signal is required", ex.id);
            }
            let expected_points = match ex.signal_type {
                SignalKind::Angle => 3,
                SignalKind::Position => 2,
            };
            for sig in &ex.signals {
                if sig.points.len() != expected_points {
                    eyre::bail!(
                        "exercises.{}.{}: expected {} points, got {}",
                        ex.id,
                        sig.id,
                        expected_points,
                        sig.points.len()
                    );
                }
                if !(sig.min_threshold.is_finite() && sig.max_threshold.is_finite())
                    || sig.min_threshold >= sig.max_threshold
                {
                    eyre::bail!(
                        "exercises.{}.{}: min_threshold must be < max_threshold",
                        ex.id,
                        sig.id
                    );
                }
            }
        }

        Ok(())
    }
}

// ── Workout plans ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Clone)]
pub struct SetToml {
    pub exercise: String,
    pub reps: u32,
    #[serde(default)]
    pub weight: Option<f32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CircuitToml {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub repetitions: u32,
    #[serde(default)]
    pub elements: Vec<SetToml>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PlanItemToml {
    Set(SetToml),
    Circuit(CircuitToml),
}

/// A user-authored workout plan.
///
/// ```toml
/// [[items]]
/// kind = "set"
/// exercise = "squat"
/// reps = 10
///
/// [[items]]
/// kind = "circuit"
/// id = "c1"
/// repetitions = 3
/// elements = [{ exercise = "push_up", reps = 8 }]
/// ```
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PlanToml {
    pub name: Option<String>,
    pub items: Vec<PlanItemToml>,
}

pub fn load_plan_toml(s: &str) -> Result<PlanToml, toml::de::Error> {
    toml::from_str::<PlanToml>(s)
}

impl PlanToml {
    pub fn validate(&self) -> eyre::Result<()> {
        let mut circuit_ids = HashSet::new();
        for (idx, item) in self.items.iter().enumerate() {
            match item {
                PlanItemToml::Set(set) => validate_set(set, &format!("items[{idx}]"))?,
                PlanItemToml::Circuit(c) => {
                    if c.id.trim().is_empty() {
                        eyre::bail!("items[{idx}]: circuit id must not be empty");
                    }
                    if !circuit_ids.insert(c.id.as_str()) {
                        eyre::bail!("items[{idx}]: duplicate circuit id {:?}", c.id);
                    }
                    if c.repetitions == 0 {
                        eyre::bail!("items[{idx}]: circuit repetitions must be >= 1");
                    }
                    if c.elements.is_empty() {
                        eyre::bail!("items[{idx}]: circuit {:?} has no elements", c.id);
                    }
                    for (j, set) in c.elements.iter().enumerate() {
                        validate_set(set, &format!("items[{idx}].elements[{j}]"))?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_set(set: &SetToml, at: &str) -> eyre::Result<()> {
    if set.exercise.trim().is_empty() {
        eyre::bail!("{at}: exercise must not be empty");
    }
    if set.reps == 0 {
        eyre::bail!("{at}: reps must be >= 1");
    }
    if let Some(w) = set.weight
        && !(w.is_finite() && w >= 0.0)
    {
        eyre::bail!("{at}: weight must be a non-negative number");
    }
    Ok(())
}
