//! Meme definitions as loaded from configuration.

use std::fmt;
use std::path::PathBuf;

use crate::trigger::TriggerRule;

// ════════════════════════════════════════════════════════════════════════════
// Anchor
// ════════════════════════════════════════════════════════════════════════════

/// Where on the frame an overlay is placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Anchor {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    TopCenter,
    BottomCenter,
}

impl Anchor {
    pub const ALL: [Anchor; 7] = [
        Anchor::Center,
        Anchor::TopLeft,
        Anchor::TopRight,
        Anchor::BottomLeft,
        Anchor::BottomRight,
        Anchor::TopCenter,
        Anchor::BottomCenter,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        Anchor::ALL.into_iter().find(|a| a.name() == s)
    }

    pub fn name(self) -> &'static str {
        match self {
            Anchor::Center       => "center",
            Anchor::TopLeft      => "top-left",
            Anchor::TopRight     => "top-right",
            Anchor::BottomLeft   => "bottom-left",
            Anchor::BottomRight  => "bottom-right",
            Anchor::TopCenter    => "top-center",
            Anchor::BottomCenter => "bottom-center",
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RenderHints
// ════════════════════════════════════════════════════════════════════════════

pub const DEFAULT_SCALE:   f32 = 0.5;
pub const DEFAULT_OPACITY: f32 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderHints {
    pub anchor:  Anchor,
    /// Overlay width as a fraction of frame width, in `(0, 1]`.
    pub scale:   f32,
    /// `0.0` transparent … `1.0` opaque.
    pub opacity: f32,
}

impl Default for RenderHints {
    fn default() -> Self {
        RenderHints {
            anchor:  Anchor::Center,
            scale:   DEFAULT_SCALE,
            opacity: DEFAULT_OPACITY,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AssetRef
// ════════════════════════════════════════════════════════════════════════════

/// An image or sound file named in configuration, resolved against its asset
/// directory.  Whether the file exists is the renderer's or player's concern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRef {
    pub file: String,
    pub path: PathBuf,
}

// ════════════════════════════════════════════════════════════════════════════
// MemeDefinition
// ════════════════════════════════════════════════════════════════════════════

/// One immutable meme entry.  Shared as `Arc<MemeDefinition>` between the
/// matcher snapshot and the lifecycle slot.
#[derive(Clone, Debug, PartialEq)]
pub struct MemeDefinition {
    pub name:       String,
    pub trigger:    TriggerRule,
    pub image:      Option<AssetRef>,
    pub sound:      Option<AssetRef>,
    /// Loop the sound while active instead of playing it once.
    pub loop_sound: bool,
    pub hints:      RenderHints,
}

impl MemeDefinition {
    /// A definition with no assets and default render hints.
    pub fn new(name: impl Into<String>, trigger: TriggerRule) -> Self {
        MemeDefinition {
            name: name.into(),
            trigger,
            image:      None,
            sound:      None,
            loop_sound: false,
            hints:      RenderHints::default(),
        }
    }
}
