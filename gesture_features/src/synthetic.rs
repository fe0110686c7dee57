//! Synthetic landmark sets for canonical poses, hand shapes and faces.
//!
//! Drives the keyboard simulation source when no detector is attached, and
//! gives tests readable fixtures.  Geometry is a front-facing person roughly
//! centred in frame: the person's left side appears at larger `x`.

use crate::landmark::{
    face, hand as hand_idx, Landmark, PoseLandmark, FACE_POINTS, HAND_POINTS, POSE_POINTS,
};

// ════════════════════════════════════════════════════════════════════════════
// Poses
// ════════════════════════════════════════════════════════════════════════════

/// Standing, arms hanging at the sides.
pub fn neutral_pose() -> Vec<Landmark> {
    use PoseLandmark::*;
    let mut lm = vec![Landmark::new(0.5, 0.5); POSE_POINTS];
    let mut set = |p: PoseLandmark, x: f32, y: f32| lm[p.index()] = Landmark::new(x, y);

    set(Nose,           0.50, 0.20);
    set(LeftEyeInner,   0.51, 0.18);
    set(LeftEye,        0.53, 0.18);
    set(LeftEyeOuter,   0.54, 0.18);
    set(RightEyeInner,  0.49, 0.18);
    set(RightEye,       0.47, 0.18);
    set(RightEyeOuter,  0.46, 0.18);
    set(LeftEar,        0.56, 0.19);
    set(RightEar,       0.44, 0.19);
    set(MouthLeft,      0.52, 0.24);
    set(MouthRight,     0.48, 0.24);
    set(LeftShoulder,   0.60, 0.35);
    set(RightShoulder,  0.40, 0.35);
    set(LeftElbow,      0.64, 0.50);
    set(RightElbow,     0.36, 0.50);
    set(LeftWrist,      0.66, 0.65);
    set(RightWrist,     0.34, 0.65);
    set(LeftHip,        0.56, 0.65);
    set(RightHip,       0.44, 0.65);
    set(LeftKnee,       0.56, 0.80);
    set(RightKnee,      0.44, 0.80);
    set(LeftAnkle,      0.56, 0.95);
    set(RightAnkle,     0.44, 0.95);
    set(LeftHeel,       0.55, 0.97);
    set(RightHeel,      0.45, 0.97);
    set(LeftFootIndex,  0.58, 0.98);
    set(RightFootIndex, 0.42, 0.98);

    attach_hands(&mut lm);
    lm
}

/// Arms straight out at shoulder height.
pub fn tpose() -> Vec<Landmark> {
    use PoseLandmark::*;
    let mut lm = neutral_pose();
    lm[LeftElbow.index()]  = Landmark::new(0.78, 0.35);
    lm[RightElbow.index()] = Landmark::new(0.22, 0.35);
    lm[LeftWrist.index()]  = Landmark::new(0.95, 0.35);
    lm[RightWrist.index()] = Landmark::new(0.05, 0.35);
    attach_hands(&mut lm);
    lm
}

/// Each wrist resting in front of the opposite shoulder.
pub fn arms_crossed_pose() -> Vec<Landmark> {
    use PoseLandmark::*;
    let mut lm = neutral_pose();
    lm[LeftElbow.index()]  = Landmark::new(0.60, 0.52);
    lm[RightElbow.index()] = Landmark::new(0.40, 0.52);
    lm[LeftWrist.index()]  = Landmark::new(0.42, 0.50);
    lm[RightWrist.index()] = Landmark::new(0.58, 0.50);
    attach_hands(&mut lm);
    lm
}

/// Right hand up at the right brow.
pub fn salute_pose() -> Vec<Landmark> {
    use PoseLandmark::*;
    let mut lm = neutral_pose();
    lm[RightElbow.index()] = Landmark::new(0.30, 0.30);
    lm[RightWrist.index()] = Landmark::new(0.44, 0.22);
    attach_hands(&mut lm);
    lm
}

/// Place the pose's pinky/index/thumb points around their wrists.
fn attach_hands(lm: &mut [Landmark]) {
    use PoseLandmark::*;
    for (wrist, pinky, index, thumb, dir) in [
        (LeftWrist,  LeftPinky,  LeftIndex,  LeftThumb,   1.0_f32),
        (RightWrist, RightPinky, RightIndex, RightThumb, -1.0_f32),
    ] {
        let w = lm[wrist.index()];
        lm[pinky.index()] = w.offset(0.02 * dir, 0.02);
        lm[index.index()] = w.offset(0.01 * dir, 0.03);
        lm[thumb.index()] = w.offset(-0.01 * dir, 0.02);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hands
// ════════════════════════════════════════════════════════════════════════════

/// Which of the four non-thumb fingers are extended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandShape {
    Fist,
    Peace,
    Pointing,
    Open,
}

impl HandShape {
    /// Extension of index, middle, ring, pinky.
    pub fn extended(self) -> [bool; 4] {
        match self {
            HandShape::Fist     => [false, false, false, false],
            HandShape::Peace    => [true,  true,  false, false],
            HandShape::Pointing => [true,  false, false, false],
            HandShape::Open     => [true,  true,  true,  true],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            HandShape::Fist     => "fist",
            HandShape::Peace    => "peace",
            HandShape::Pointing => "point",
            HandShape::Open     => "open",
        }
    }

    /// Next shape in a fixed cycle, for key toggles.
    pub fn next(self) -> Self {
        match self {
            HandShape::Fist     => HandShape::Peace,
            HandShape::Peace    => HandShape::Pointing,
            HandShape::Pointing => HandShape::Open,
            HandShape::Open     => HandShape::Fist,
        }
    }
}

/// A 21-point upright hand with its wrist at `(wrist_x, wrist_y)`.
pub fn hand(shape: HandShape, wrist_x: f32, wrist_y: f32) -> Vec<Landmark> {
    let wrist = Landmark::new(wrist_x, wrist_y);
    let mut lm = vec![wrist; HAND_POINTS];

    // thumb: 1..=4, splayed to the side
    for (k, i) in (1..=4).enumerate() {
        let k = k as f32 + 1.0;
        lm[i] = wrist.offset(-0.02 * k, -0.015 * k);
    }

    // fingers: mcp, pip, dip, tip  (5..=8, 9..=12, 13..=16, 17..=20)
    for (f, &extended) in shape.extended().iter().enumerate() {
        let (tip, pip) = hand_idx::FINGERS[f];
        let mcp = pip - 1;
        let dip = tip - 1;
        let fx  = wrist_x - 0.03 + f as f32 * 0.02;

        lm[mcp] = Landmark::new(fx, wrist_y - 0.08);
        lm[pip] = Landmark::new(fx, wrist_y - 0.11);
        if extended {
            lm[dip] = Landmark::new(fx, wrist_y - 0.14);
            lm[tip] = Landmark::new(fx, wrist_y - 0.17);
        } else {
            lm[dip] = Landmark::new(fx, wrist_y - 0.10);
            lm[tip] = Landmark::new(fx, wrist_y - 0.09);
        }
    }
    lm
}

// ════════════════════════════════════════════════════════════════════════════
// Face
// ════════════════════════════════════════════════════════════════════════════

/// A 468-point face mesh laid out on a grid around the upper centre of the
/// frame, shifted horizontally by `dx`.
pub fn face_mesh(eyes_wide: bool, dx: f32) -> Vec<Landmark> {
    let mut lm: Vec<Landmark> = (0..FACE_POINTS)
        .map(|i| Landmark::new(
            0.40 + (i % 26) as f32 * 0.008 + dx,
            0.10 + (i / 26) as f32 * 0.012,
        ))
        .collect();

    let gap = if eyes_wide { 0.03 } else { 0.01 };
    lm[face::RIGHT_UPPER_LID] = Landmark::new(0.46 + dx, 0.18);
    lm[face::RIGHT_LOWER_LID] = Landmark::new(0.46 + dx, 0.18 + gap);
    lm
}
