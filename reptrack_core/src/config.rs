//! Runtime configuration for the tracker and session orchestrators.
//!
//! These are the values the core works with. The TOML schema lives in
//! `reptrack_config`; `conversions` maps one onto the other.

/// EMA smoothing of tracked signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingCfg {
    pub enabled: bool,
    /// Window-like parameter N; alpha = 2/(N+1).
    pub window: u32,
}

impl SmoothingCfg {
    /// Effective EMA factor in (0, 1]. 1.0 passes values through unchanged.
    pub fn alpha(&self) -> f64 {
        if !self.enabled || self.window <= 1 {
            return 1.0;
        }
        (2.0 / (f64::from(self.window) + 1.0)).clamp(f64::MIN_POSITIVE, 1.0)
    }
}

impl Default for SmoothingCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            window: 5,
        }
    }
}

/// Which phase machine counts repetitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseMode {
    /// Idle → Active → Completed.
    #[default]
    ThresholdCrossing,
    /// Relaxed → Concentric → Peak → Eccentric.
    PhaseSequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseCfg {
    pub mode: PhaseMode,
    /// Minimum dwell in `Peak` before `Peak → Eccentric` is allowed.
    pub peak_hold_ms: u64,
}

impl Default for PhaseCfg {
    fn default() -> Self {
        Self {
            mode: PhaseMode::ThresholdCrossing,
            peak_hold_ms: 300,
        }
    }
}

/// Visibility gating of primary and secondary joints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityCfg {
    pub require_primary: bool,
    /// Minimum confidence in percent.
    pub min_visibility_pct: u8,
    pub require_secondary: bool,
}

impl VisibilityCfg {
    /// Threshold as a 0..=1 confidence.
    pub fn min_visibility(&self) -> f32 {
        f32::from(self.min_visibility_pct.min(100)) / 100.0
    }
}

impl Default for VisibilityCfg {
    fn default() -> Self {
        Self {
            require_primary: true,
            min_visibility_pct: 50,
            require_secondary: false,
        }
    }
}

/// Everything the per-frame pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackerCfg {
    pub smoothing: SmoothingCfg,
    pub phase: PhaseCfg,
    pub visibility: VisibilityCfg,
}

/// Timed exercise/rest cycling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedCfg {
    pub exercise_set_secs: u32,
    pub rest_secs: u32,
    pub total_sets: u32,
    /// Use this exercise for every set instead of random picks.
    pub fixed_exercise: Option<String>,
}

impl Default for TimedCfg {
    fn default() -> Self {
        Self {
            exercise_set_secs: 40,
            rest_secs: 20,
            total_sets: 5,
            fixed_exercise: None,
        }
    }
}

/// Ladder protocol parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LadderCfg {
    pub start_reps: u32,
    pub top_reps: u32,
    pub end_reps: u32,
    pub increment: u32,
    pub rest_secs_per_rep: u32,
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

/// How the runner pulls frames from a pose source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Read every frame in order on the processing thread.
    #[default]
    Direct,
    /// Read on a background thread; process only the latest frame.
    Feed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunCfg {
    pub mode: RunMode,
    pub frame_rate_hz: u32,
    /// Feed mode only. Zero disables the check.
    pub stall_timeout_ms: u64,
}

impl Default for RunCfg {
    fn default() -> Self {
        Self {
            mode: RunMode::Direct,
            frame_rate_hz: 30,
            stall_timeout_ms: 0,
        }
    }
}
