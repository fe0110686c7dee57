//! Feature extraction: one frame of landmarks in, one [`FeatureMap`] out.
//!
//! Extraction never fails.  Missing or short landmark sets simply suppress the
//! features that depend on them.

use serde::Deserialize;
use tracing::debug;

use crate::features::FeatureMap;
use crate::geometry::{distance, is_curled, is_extended};
use crate::landmark::{
    face, hand, Frame, Handedness, Landmark, PoseLandmark,
    FACE_POINTS, HAND_POINTS, POSE_POINTS,
};
use crate::stillness::StillnessTracker;

// ════════════════════════════════════════════════════════════════════════════
// Feature names
// ════════════════════════════════════════════════════════════════════════════

pub const PEACE_SIGN:     &str = "peace_sign";
pub const POINTING:       &str = "pointing";
pub const SALUTE:         &str = "salute";
pub const ARMS_CROSSED:   &str = "arms_crossed";
pub const TPOSE:          &str = "tpose";
pub const FACE_STILLNESS: &str = "face_stillness";
pub const EYES_WIDE:      &str = "eyes_wide";

pub fn hand_raised(side: Handedness) -> String {
    format!("hand_raised_{}", side.suffix())
}

pub fn open_palm(side: Handedness) -> String {
    format!("open_palm_{}", side.suffix())
}

// ════════════════════════════════════════════════════════════════════════════
// Thresholds
// ════════════════════════════════════════════════════════════════════════════

/// Tunable constants.  Defaults are the empirically chosen values every
/// existing rule set is written against.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Wrist `y` below this (upper part of frame) counts as raised.
    pub hand_raised_y:     f32,
    /// Right wrist to right eye distance for a salute.
    pub salute_distance:   f32,
    /// Max `|Δx|` between a wrist and the opposite shoulder.
    pub arms_crossed_x:    f32,
    /// Max `|Δy|` between a wrist and its own shoulder in a T-pose.
    pub tpose_level_y:     f32,
    /// Min `|Δx|` between a wrist and its own shoulder in a T-pose.
    pub tpose_reach_x:     f32,
    /// Eyelid gap above which eyes count as wide.
    pub eyes_wide_gap:     f32,
    /// Extended fingers (of 4) needed for an open palm.
    pub open_palm_fingers: usize,
    /// Face snapshots kept for stillness.
    pub stillness_window:  usize,
    /// RMS wobble at which stillness reaches zero.
    pub stillness_range:   f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Thresholds {
            hand_raised_y:     0.5,
            salute_distance:   0.15,
            arms_crossed_x:    0.2,
            tpose_level_y:     0.1,
            tpose_reach_x:     0.3,
            eyes_wide_gap:     0.02,
            open_palm_fingers: 3,
            stillness_window:  15,
            stillness_range:   0.01,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FeatureExtractor
// ════════════════════════════════════════════════════════════════════════════

/// Stateless apart from the face stillness history, which belongs to this
/// instance alone.
#[derive(Debug)]
pub struct FeatureExtractor {
    thresholds: Thresholds,
    stillness:  StillnessTracker,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        FeatureExtractor::new(Thresholds::default())
    }
}

impl FeatureExtractor {
    pub fn new(thresholds: Thresholds) -> Self {
        let stillness = StillnessTracker::new(
            thresholds.stillness_window,
            thresholds.stillness_range,
        );
        FeatureExtractor { thresholds, stillness }
    }

    pub fn thresholds(&self) -> &Thresholds { &self.thresholds }

    /// Derive the feature map for one frame.
    pub fn extract(&mut self, frame: &Frame) -> FeatureMap {
        let mut features = FeatureMap::new();

        for (i, landmarks) in frame.hands.iter().enumerate() {
            if landmarks.len() < HAND_POINTS {
                debug!(hand = i, points = landmarks.len(), "short hand landmark set ignored");
                continue;
            }
            self.hand_features(landmarks, frame.handedness(i), &mut features);
        }

        match frame.pose.as_deref() {
            Some(pose) if pose.len() >= POSE_POINTS => self.pose_features(pose, &mut features),
            Some(pose) => debug!(points = pose.len(), "partial pose ignored"),
            None => {}
        }

        match frame.face.as_deref() {
            Some(mesh) if mesh.len() >= FACE_POINTS => self.face_features(mesh, &mut features),
            Some(mesh) => {
                debug!(points = mesh.len(), "partial face mesh ignored");
                self.stillness.reset();
            }
            None => self.stillness.reset(),
        }

        features
    }

    // ── hands ─────────────────────────────────────────────────────────────

    fn hand_features(
        &self,
        lm:       &[Landmark],
        side:     Option<Handedness>,
        features: &mut FeatureMap,
    ) {
        let t = &self.thresholds;

        if let Some(side) = side {
            features.set_if(hand_raised(side), lm[hand::WRIST].y < t.hand_raised_y);
            features.set_if(open_palm(side), is_open_palm(lm, t.open_palm_fingers));
        }

        features.set_if(PEACE_SIGN, is_peace_sign(lm));
        features.set_if(POINTING,   is_pointing(lm));
    }

    // ── pose ──────────────────────────────────────────────────────────────

    fn pose_features(&self, lm: &[Landmark], features: &mut FeatureMap) {
        let t = &self.thresholds;
        let at = |p: PoseLandmark| lm[p.index()];

        let l_wrist    = at(PoseLandmark::LeftWrist);
        let r_wrist    = at(PoseLandmark::RightWrist);
        let l_shoulder = at(PoseLandmark::LeftShoulder);
        let r_shoulder = at(PoseLandmark::RightShoulder);
        let r_eye      = at(PoseLandmark::RightEye);

        features.set_if(SALUTE, distance(r_wrist, r_eye) < t.salute_distance);

        let crossed = (l_wrist.x - r_shoulder.x).abs() < t.arms_crossed_x
                   && (r_wrist.x - l_shoulder.x).abs() < t.arms_crossed_x;
        features.set_if(ARMS_CROSSED, crossed);

        let level = (l_wrist.y - l_shoulder.y).abs() < t.tpose_level_y
                 && (r_wrist.y - r_shoulder.y).abs() < t.tpose_level_y;
        let reach = (l_wrist.x - l_shoulder.x).abs() > t.tpose_reach_x
                 && (r_wrist.x - r_shoulder.x).abs() > t.tpose_reach_x;
        features.set_if(TPOSE, level && reach);
    }

    // ── face ──────────────────────────────────────────────────────────────

    fn face_features(&mut self, mesh: &[Landmark], features: &mut FeatureMap) {
        let stillness = self.stillness.observe(mesh);
        features.insert(FACE_STILLNESS, stillness);

        let gap = (mesh[face::RIGHT_UPPER_LID].y - mesh[face::RIGHT_LOWER_LID].y).abs();
        features.insert(EYES_WIDE, gap > self.thresholds.eyes_wide_gap);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hand shape tests
// ════════════════════════════════════════════════════════════════════════════

fn finger_extended(lm: &[Landmark], finger: usize) -> bool {
    let (tip, joint) = hand::FINGERS[finger];
    is_extended(lm[tip], lm[joint])
}

fn finger_curled(lm: &[Landmark], finger: usize) -> bool {
    let (tip, joint) = hand::FINGERS[finger];
    is_curled(lm[tip], lm[joint])
}

/// Index and middle extended, ring and pinky curled.
pub fn is_peace_sign(lm: &[Landmark]) -> bool {
    finger_extended(lm, 0)
        && finger_extended(lm, 1)
        && finger_curled(lm, 2)
        && finger_curled(lm, 3)
}

/// Index extended, middle, ring and pinky curled.
pub fn is_pointing(lm: &[Landmark]) -> bool {
    finger_extended(lm, 0)
        && finger_curled(lm, 1)
        && finger_curled(lm, 2)
        && finger_curled(lm, 3)
}

/// At least `min_fingers` of the four non-thumb fingers extended.
pub fn is_open_palm(lm: &[Landmark], min_fingers: usize) -> bool {
    (0..4).filter(|&f| finger_extended(lm, f)).count() >= min_fingers
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
