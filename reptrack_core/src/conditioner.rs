//! Signal conditioning: EMA smoothing per tracked signal and visibility gating.
//!
//! A missing value (`None`) never feeds the average. It ends the current run
//! and the next real sample starts a fresh average, so a single occluded frame
//! cannot drag the trend.

use std::collections::HashMap;

use reptrack_traits::Landmark;

use crate::config::{SmoothingCfg, VisibilityCfg};
use crate::exercise::ExerciseDefinition;
use crate::joints::{resolve, visibility_of};

/// One frame's value for one tracked signal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalSample {
    pub raw_value: Option<f64>,
    pub smoothed_value: Option<f64>,
    pub timestamp_ms: u64,
}

/// Exponential moving average over an optional input stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ema {
    prev: Option<f64>,
}

impl Ema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample. `alpha` is clamped to (0, 1]; 1.0 is the identity.
    pub fn push(&mut self, x: Option<f64>, alpha: f64) -> Option<f64> {
        let Some(x) = x.filter(|v| v.is_finite()) else {
            self.prev = None;
            return None;
        };
        let alpha = if alpha.is_finite() {
            alpha.clamp(f64::MIN_POSITIVE, 1.0)
        } else {
            1.0
        };
        let y = match self.prev {
            None => x,
            Some(prev) => alpha * x + (1.0 - alpha) * prev,
        };
        self.prev = Some(y);
        Some(y)
    }

    pub fn last(&self) -> Option<f64> {
        self.prev
    }

    pub fn reset(&mut self) {
        self.prev = None;
    }
}

/// Smoothing state for every tracked signal of the current exercise.
#[derive(Debug, Clone, Default)]
pub struct SignalConditioner {
    smoothing: SmoothingCfg,
    emas: HashMap<String, Ema>,
}

impl SignalConditioner {
    pub fn new(smoothing: SmoothingCfg) -> Self {
        Self {
            smoothing,
            emas: HashMap::new(),
        }
    }

    /// Condition one raw value for `signal_id`.
    pub fn condition(
        &mut self,
        signal_id: &str,
        raw: Option<f64>,
        timestamp_ms: u64,
    ) -> SignalSample {
        let alpha = self.smoothing.alpha();
        let ema = match self.emas.get_mut(signal_id) {
            Some(ema) => ema,
            None => self.emas.entry(signal_id.to_string()).or_default(),
        };
        let smoothed = ema.push(raw, alpha);
        SignalSample {
            raw_value: raw,
            smoothed_value: smoothed,
            timestamp_ms,
        }
    }

    /// Takes effect from the next sample; existing averages are kept.
    pub fn set_smoothing(&mut self, smoothing: SmoothingCfg) {
        self.smoothing = smoothing;
    }

    pub fn smoothing(&self) -> SmoothingCfg {
        self.smoothing
    }

    pub fn reset(&mut self) {
        self.emas.clear();
    }
}

/// Visibility of one joint set in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateResult {
    pub all_visible: bool,
    /// Lowest confidence in the set; 0 when a joint could not be resolved.
    pub min_visibility: f32,
}

/// Check that every joint in `joints` resolves with confidence ≥ `threshold`.
pub fn gate_joints(landmarks: &[Landmark], joints: &[String], threshold: f32) -> GateResult {
    let mut all_visible = true;
    let mut min_visibility = 1.0_f32;
    for name in joints {
        let Some(lm) = resolve(landmarks, name) else {
            return GateResult {
                all_visible: false,
                min_visibility: 0.0,
            };
        };
        let v = visibility_of(lm);
        min_visibility = min_visibility.min(v);
        if v < threshold {
            all_visible = false;
        }
    }
    GateResult {
        all_visible,
        min_visibility,
    }
}

/// Combined primary/secondary gate for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGate {
    pub primary: GateResult,
    /// Only evaluated when secondary gating is enabled.
    pub secondary: Option<GateResult>,
    /// Counting may proceed as far as visibility is concerned.
    pub visible: bool,
}

pub fn evaluate_gate(
    landmarks: &[Landmark],
    exercise: &ExerciseDefinition,
    cfg: &VisibilityCfg,
) -> FrameGate {
    let threshold = cfg.min_visibility();
    let primary = gate_joints(landmarks, &exercise.primary_joints, threshold);
    let secondary = cfg
        .require_secondary
        .then(|| gate_joints(landmarks, &exercise.secondary_joints, threshold));
    let primary_ok = !cfg.require_primary || primary.all_visible;
    let secondary_ok = secondary.is_none_or(|g| g.all_visible);
    FrameGate {
        primary,
        secondary,
        visible: primary_ok && secondary_ok,
    }
}
