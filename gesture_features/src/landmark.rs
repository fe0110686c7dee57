//! Landmark data model shared by every stage of the pipeline.
//!
//! Landmarks are owned by the upstream detector; the extractor only borrows
//! them for the duration of one frame.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// A normalized keypoint.  `x` and `y` are fractions of the frame width and
/// height; `y` increases downward.  `z` is relative depth and is optional in
/// recorded frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }

    /// Same point shifted by `(dx, dy)`.
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Landmark { x: self.x + dx, y: self.y + dy, z: self.z }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark counts and well-known indices
// ════════════════════════════════════════════════════════════════════════════

/// Points in a full body pose.
pub const POSE_POINTS: usize = 33;
/// Points in one hand.
pub const HAND_POINTS: usize = 21;
/// Minimum points in a refined face mesh.
pub const FACE_POINTS: usize = 468;

/// Hand landmark indices.
pub mod hand {
    pub const WRIST:      usize = 0;
    pub const INDEX_PIP:  usize = 6;
    pub const INDEX_TIP:  usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP:   usize = 14;
    pub const RING_TIP:   usize = 16;
    pub const PINKY_PIP:  usize = 18;
    pub const PINKY_TIP:  usize = 20;

    /// `(tip, proximal joint)` pairs for the four non-thumb fingers, in
    /// index → pinky order.
    pub const FINGERS: [(usize, usize); 4] = [
        (INDEX_TIP,  INDEX_PIP),
        (MIDDLE_TIP, MIDDLE_PIP),
        (RING_TIP,   RING_PIP),
        (PINKY_TIP,  PINKY_PIP),
    ];
}

/// Face mesh indices.
pub mod face {
    /// Right eye, upper eyelid.
    pub const RIGHT_UPPER_LID: usize = 159;
    /// Right eye, lower eyelid.
    pub const RIGHT_LOWER_LID: usize = 145;
}

/// The 33-point body landmark enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum PoseLandmark {
    Nose           = 0,
    LeftEyeInner   = 1,
    LeftEye        = 2,
    LeftEyeOuter   = 3,
    RightEyeInner  = 4,
    RightEye       = 5,
    RightEyeOuter  = 6,
    LeftEar        = 7,
    RightEar       = 8,
    MouthLeft      = 9,
    MouthRight     = 10,
    LeftShoulder   = 11,
    RightShoulder  = 12,
    LeftElbow      = 13,
    RightElbow     = 14,
    LeftWrist      = 15,
    RightWrist     = 16,
    LeftPinky      = 17,
    RightPinky     = 18,
    LeftIndex      = 19,
    RightIndex     = 20,
    LeftThumb      = 21,
    RightThumb     = 22,
    LeftHip        = 23,
    RightHip       = 24,
    LeftKnee       = 25,
    RightKnee      = 26,
    LeftAnkle      = 27,
    RightAnkle     = 28,
    LeftHeel       = 29,
    RightHeel      = 30,
    LeftFootIndex  = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    pub const fn index(self) -> usize { self as usize }
}

// ════════════════════════════════════════════════════════════════════════════
// Handedness
// ════════════════════════════════════════════════════════════════════════════

/// Which hand a detection belongs to, as classified by the detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// Parse a detector label (`"Left"` / `"Right"`, any case).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "left"  => Some(Handedness::Left),
            "right" => Some(Handedness::Right),
            _       => None,
        }
    }

    /// Lower-case suffix used in side-indexed feature names.
    pub fn suffix(self) -> &'static str {
        match self {
            Handedness::Left  => "left",
            Handedness::Right => "right",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Frame
// ════════════════════════════════════════════════════════════════════════════

/// Everything the detector reported for one video frame.
///
/// `hands[i]` is paired with `hand_labels[i]`.  A frame with no landmarks at
/// all is valid and simply yields an empty feature map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub pose: Option<Vec<Landmark>>,
    #[serde(default)]
    pub hands: Vec<Vec<Landmark>>,
    #[serde(default)]
    pub hand_labels: Vec<String>,
    #[serde(default)]
    pub face: Option<Vec<Landmark>>,
}

impl Frame {
    /// True when the detector saw nothing at all.
    pub fn is_empty(&self) -> bool {
        self.pose.is_none() && self.hands.is_empty() && self.face.is_none()
    }

    /// Handedness of hand `i`, if its label is present and recognised.
    pub fn handedness(&self, i: usize) -> Option<Handedness> {
        self.hand_labels.get(i).and_then(|l| Handedness::from_label(l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handedness_parses_any_case() {
        assert_eq!(Handedness::from_label("Left"),   Some(Handedness::Left));
        assert_eq!(Handedness::from_label(" RIGHT"), Some(Handedness::Right));
        assert_eq!(Handedness::from_label("both"),   None);
    }

    #[test]
    fn pose_indices_match_body_enumeration() {
        assert_eq!(PoseLandmark::RightEye.index(),      5);
        assert_eq!(PoseLandmark::LeftShoulder.index(),  11);
        assert_eq!(PoseLandmark::RightWrist.index(),    16);
        assert_eq!(PoseLandmark::RightFootIndex.index(), POSE_POINTS - 1);
    }

    #[test]
    fn frame_deserializes_with_missing_fields() {
        let frame: Frame = serde_json::from_str(
            r#"{"hands": [[{"x": 0.1, "y": 0.2}]], "hand_labels": ["Left"]}"#,
        ).unwrap();
        assert!(frame.pose.is_none());
        assert_eq!(frame.hands[0][0], Landmark::new(0.1, 0.2));
        assert_eq!(frame.handedness(0), Some(Handedness::Left));
        assert_eq!(frame.handedness(1), None);
    }

    #[test]
    fn default_frame_is_empty() {
        assert!(Frame::default().is_empty());
    }
}
