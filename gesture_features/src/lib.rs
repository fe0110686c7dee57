//! # gesture_features
//!
//! Turns one frame of raw detector output (a body pose, up to two hands with
//! handedness labels, and a face mesh) into a [`FeatureMap`] of named gesture
//! signals.  All coordinates are normalized to `[0, 1]` with `y` growing
//! downward, exactly as the upstream detector reports them.
//!
//! ## Features
//!
//! | Feature | Source | Value |
//! |---|---|---|
//! | `hand_raised_left` / `hand_raised_right` | hand wrist above mid-frame | flag |
//! | `peace_sign` | index + middle extended, ring + pinky curled | flag |
//! | `pointing` | index extended, the rest curled | flag |
//! | `open_palm_left` / `open_palm_right` | ≥ 3 of 4 fingers extended | flag |
//! | `salute` | right wrist near right eye | flag |
//! | `arms_crossed` | each wrist over the opposite shoulder | flag |
//! | `tpose` | both arms level and extended | flag |
//! | `face_stillness` | inverse positional variance over recent frames | level in `[0, 1]` |
//! | `eyes_wide` | right eyelid gap | flag |
//!
//! Flag features are only inserted when their test passes, so an absent key
//! means "not detected".  `face_stillness` and `eyes_wide` are always present
//! while a face is visible.
//!
//! ## Quick start
//!
//! ```rust
//! use gesture_features::{FeatureExtractor, Frame};
//! use gesture_features::synthetic::{HandShape, hand, neutral_pose};
//!
//! let frame = Frame {
//!     pose:        Some(neutral_pose()),
//!     hands:       vec![hand(HandShape::Peace, 0.3, 0.3)],
//!     hand_labels: vec!["Right".to_string()],
//!     face:        None,
//! };
//!
//! let mut extractor = FeatureExtractor::default();
//! let features = extractor.extract(&frame);
//! assert!(features.is_truthy("peace_sign"));
//! assert!(features.is_truthy("hand_raised_right"));
//! ```

pub mod landmark;
pub mod features;
pub mod geometry;
pub mod stillness;
pub mod extractor;
pub mod synthetic;

pub use extractor::{FeatureExtractor, Thresholds};
pub use features::{FeatureMap, FeatureValue};
pub use landmark::{Frame, Handedness, Landmark, PoseLandmark};
