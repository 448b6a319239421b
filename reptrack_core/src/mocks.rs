//! Test and helper sources for reptrack_core

use std::collections::VecDeque;

use reptrack_traits::{Landmark, POSE_JOINT_COUNT, PoseFrame, PoseSource};

use crate::joints::joint_index;

/// A source that fails every read; useful for exercising error paths.
pub struct NoPoseSource;

impl PoseSource for NoPoseSource {
    fn next_frame(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<Option<PoseFrame>, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("no pose engine")))
    }
}

/// Replays a fixed list of frames, then reports end of stream.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    frames: VecDeque<PoseFrame>,
}

impl ScriptedSource {
    pub fn new(frames: impl IntoIterator<Item = PoseFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl PoseSource for ScriptedSource {
    fn next_frame(
        &mut self,
        _timeout: std::time::Duration,
    ) -> Result<Option<PoseFrame>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.frames.pop_front())
    }
}

const ARM: f64 = 0.2;

/// Synthesizes full-body frames with chosen joint angles and gaps.
///
/// Every joint starts at the image centre with confidence 0.9. Placing an
/// angle moves the two outer joints around the middle one.
#[derive(Debug, Clone)]
pub struct PoseBuilder {
    landmarks: Vec<Landmark>,
}

impl Default for PoseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseBuilder {
    pub fn new() -> Self {
        Self {
            landmarks: vec![Landmark::new(0.5, 0.5, 0.0).with_visibility(0.9); POSE_JOINT_COUNT],
        }
    }

    fn slot(&mut self, name: &str) -> Option<&mut Landmark> {
        joint_index(name).and_then(|i| self.landmarks.get_mut(i))
    }

    /// Set the angle at `points[1]` to `deg`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn angle(mut self, points: [&str; 3], deg: f64) -> Self {
        let Some(b) = joint_index(points[1]).and_then(|i| self.landmarks.get(i).copied()) else {
            return self;
        };
        let (bx, by) = (f64::from(b.x), f64::from(b.y));
        let theta = deg.to_radians();
        if let Some(a) = self.slot(points[0]) {
            a.x = bx as f32;
            a.y = (by - ARM) as f32;
        }
        if let Some(c) = self.slot(points[2]) {
            c.x = (bx + ARM * theta.sin()) as f32;
            c.y = (by - ARM * theta.cos()) as f32;
        }
        self
    }

    /// Place `b` horizontally `dist` away from `a`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn gap(mut self, a: &str, b: &str, dist: f64) -> Self {
        let Some(anchor) = joint_index(a).and_then(|i| self.landmarks.get(i).copied()) else {
            return self;
        };
        if let Some(lm) = self.slot(b) {
            lm.x = (f64::from(anchor.x) + dist) as f32;
            lm.y = anchor.y;
        }
        self
    }

    pub fn visibility(mut self, joint: &str, v: f32) -> Self {
        if let Some(lm) = self.slot(joint) {
            lm.visibility = Some(v);
        }
        self
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    pub fn build(self, timestamp_ms: u64) -> PoseFrame {
        PoseFrame::new(timestamp_ms, self.landmarks)
    }
}
