//! Collaborator seams for the repetition tracker.
//!
//! The pose-estimation engine is outside this workspace; it is reached only
//! through [`PoseSource`] and the plain data types below.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Number of joints produced by the pose engine per frame.
pub const POSE_JOINT_COUNT: usize = 33;

/// One joint position as reported by the pose engine.
///
/// `x`/`y` are normalized to the image (0..=1), `z` is unconstrained depth.
/// `visibility` is the engine's confidence in 0..=1 when it reports one.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub visibility: Option<f32>,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub const fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }
}

/// All joints detected in a single video frame.
///
/// An empty `landmarks` vector means no pose was detected.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoseFrame {
    pub timestamp_ms: u64,
    pub landmarks: Vec<Landmark>,
}

impl PoseFrame {
    pub fn new(timestamp_ms: u64, landmarks: Vec<Landmark>) -> Self {
        Self {
            timestamp_ms,
            landmarks,
        }
    }

    /// A frame in which the engine found nobody.
    pub fn empty(timestamp_ms: u64) -> Self {
        Self::new(timestamp_ms, Vec::new())
    }

    pub fn has_pose(&self) -> bool {
        !self.landmarks.is_empty()
    }
}

pub trait PoseSource {
    /// Block up to `timeout` for the next frame.
    ///
    /// `Ok(None)` signals the end of the stream.
    fn next_frame(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<Option<PoseFrame>, Box<dyn std::error::Error + Send + Sync>>;
}
