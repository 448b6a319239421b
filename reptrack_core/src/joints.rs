//! Joint naming and planar geometry over pose landmarks.
//!
//! Joint indices follow the 33-point body topology emitted by the pose
//! engine. Names are matched case-insensitively (`left_elbow`, `LEFT_ELBOW`).

use reptrack_traits::{Landmark, POSE_JOINT_COUNT};

pub const JOINT_NAMES: [&str; POSE_JOINT_COUNT] = [
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

/// Index of a joint name in the landmark array, if the name is known.
pub fn joint_index(name: &str) -> Option<usize> {
    JOINT_NAMES
        .iter()
        .position(|known| known.eq_ignore_ascii_case(name.trim()))
}

/// Confidence of a landmark in 0..=1. Engines that report no confidence are trusted.
#[inline]
pub fn visibility_of(lm: &Landmark) -> f32 {
    lm.visibility.map_or(1.0, |v| if v.is_finite() { v } else { 0.0 })
}

/// Look up a joint by name in one frame.
///
/// Unknown names, indices past the end of the frame and non-finite
/// coordinates all resolve to `None`.
pub fn resolve<'a>(landmarks: &'a [Landmark], name: &str) -> Option<&'a Landmark> {
    let lm = landmarks.get(joint_index(name)?)?;
    (lm.x.is_finite() && lm.y.is_finite()).then_some(lm)
}

/// Angle at `b` formed by `a-b-c`, in degrees within [0, 180].
pub fn angle_deg(a: &Landmark, b: &Landmark, c: &Landmark) -> f64 {
    let (ax, ay) = (f64::from(a.x), f64::from(a.y));
    let (bx, by) = (f64::from(b.x), f64::from(b.y));
    let (cx, cy) = (f64::from(c.x), f64::from(c.y));
    let rad = (cy - by).atan2(cx - bx) - (ay - by).atan2(ax - bx);
    let deg = rad.abs().to_degrees();
    if deg > 180.0 { 360.0 - deg } else { deg }
}

/// Planar distance between two landmarks in normalized image units.
pub fn distance(a: &Landmark, b: &Landmark) -> f64 {
    let dx = f64::from(a.x) - f64::from(b.x);
    let dy = f64::from(a.y) - f64::from(b.y);
    dx.hypot(dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_lookup_is_case_insensitive() {
        assert_eq!(joint_index("left_elbow"), Some(13));
        assert_eq!(joint_index("RIGHT_KNEE"), Some(26));
        assert_eq!(joint_index("left_tail"), None);
    }

    #[test]
    fn right_angle() {
        let a = Landmark::new(0.0, 1.0, 0.0);
        let b = Landmark::new(0.0, 0.0, 0.0);
        let c = Landmark::new(1.0, 0.0, 0.0);
        assert!((angle_deg(&a, &b, &c) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn straight_line_is_180() {
        let a = Landmark::new(-1.0, 0.0, 0.0);
        let b = Landmark::new(0.0, 0.0, 0.0);
        let c = Landmark::new(1.0, 0.0, 0.0);
        assert!((angle_deg(&a, &b, &c) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn reflex_angles_fold_back() {
        let a = Landmark::new(1.0, 0.1, 0.0);
        let b = Landmark::new(0.0, 0.0, 0.0);
        let c = Landmark::new(1.0, -0.1, 0.0);
        let deg = angle_deg(&a, &b, &c);
        assert!(deg < 20.0, "expected acute angle, got {deg}");
    }

    #[test]
    fn resolve_rejects_short_frames_and_nan() {
        let mut frame = vec![Landmark::default(); 14];
        assert!(resolve(&frame, "left_elbow").is_some());
        assert!(resolve(&frame, "right_elbow").is_none());
        frame[13].x = f32::NAN;
        assert!(resolve(&frame, "left_elbow").is_none());
    }

    #[test]
    fn missing_visibility_is_trusted() {
        let lm = Landmark::new(0.5, 0.5, 0.0);
        assert_eq!(visibility_of(&lm), 1.0);
        assert_eq!(visibility_of(&lm.with_visibility(0.25)), 0.25);
    }
}
