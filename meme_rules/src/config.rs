//! Configuration document loading and validation.
//!
//! ```json
//! {
//!   "thresholds": { "salute_distance": 0.15 },
//!   "memes": [
//!     {
//!       "name": "peace_out",
//!       "triggers": { "gesture": "peace_sign" },
//!       "image": "peace_sign.png",
//!       "sound": "peace.wav",
//!       "position": "top-right",
//!       "scale": 0.3,
//!       "opacity": 0.9,
//!       "loop": false
//!     }
//!   ]
//! }
//! ```
//!
//! Loading never fails.  An unreadable document yields an empty catalog;
//! a bad entry is dropped and the rest are kept, in order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gesture_features::Thresholds;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::definition::{
    Anchor, AssetRef, MemeDefinition, RenderHints, DEFAULT_OPACITY, DEFAULT_SCALE,
};
use crate::error::{ConfigError, ValidationError};
use crate::trigger::TriggerRule;

// ════════════════════════════════════════════════════════════════════════════
// Asset directories
// ════════════════════════════════════════════════════════════════════════════

/// Directories image and sound filenames are resolved against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetDirs {
    pub images: PathBuf,
    pub sounds: PathBuf,
}

impl AssetDirs {
    /// `<root>/memes` for images, `<root>/sounds` for sounds.
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        AssetDirs {
            images: root.join("memes"),
            sounds: root.join("sounds"),
        }
    }
}

impl Default for AssetDirs {
    fn default() -> Self { AssetDirs::under("assets") }
}

// ════════════════════════════════════════════════════════════════════════════
// LoadReport
// ════════════════════════════════════════════════════════════════════════════

/// Result of loading one configuration document.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Accepted definitions, in document order.
    pub definitions: Vec<Arc<MemeDefinition>>,
    /// Entries that were dropped, with the reason.
    pub rejected:    Vec<ValidationError>,
    /// Extractor thresholds from the document, or the defaults.
    pub thresholds:  Thresholds,
}

// ════════════════════════════════════════════════════════════════════════════
// Loading
// ════════════════════════════════════════════════════════════════════════════

/// Load and validate the document at `path`.  Any document-level failure is
/// logged and produces an empty report.
pub fn load(path: &Path, assets: &AssetDirs) -> LoadReport {
    match read_document(path).and_then(|doc| parse_document(&doc, assets)) {
        Ok(report) => {
            info!(
                path     = %path.display(),
                loaded   = report.definitions.len(),
                rejected = report.rejected.len(),
                "meme definitions loaded",
            );
            report
        }
        Err(e) => {
            warn!(error = %e, "using empty meme list");
            LoadReport::default()
        }
    }
}

/// Read and parse the raw JSON document.
pub fn read_document(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound(path.to_path_buf())
        } else {
            ConfigError::Read { path: path.to_path_buf(), source }
        }
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate a parsed document.  Fails only when there is no `memes` list.
pub fn parse_document(doc: &Value, assets: &AssetDirs) -> Result<LoadReport, ConfigError> {
    let entries = doc.get("memes").and_then(Value::as_array).ok_or(ConfigError::Shape)?;

    let mut report = LoadReport {
        thresholds: parse_thresholds(doc.get("thresholds")),
        ..LoadReport::default()
    };
    let mut seen: HashSet<String> = HashSet::new();

    for (index, raw) in entries.iter().enumerate() {
        let parsed = parse_entry(index, raw, assets).and_then(|def| {
            if seen.insert(def.name.clone()) {
                Ok(def)
            } else {
                Err(ValidationError::DuplicateName { name: def.name })
            }
        });
        match parsed {
            Ok(def) => report.definitions.push(Arc::new(def)),
            Err(e)  => {
                warn!(error = %e, "skipping meme definition");
                report.rejected.push(e);
            }
        }
    }
    Ok(report)
}

fn parse_thresholds(raw: Option<&Value>) -> Thresholds {
    let Some(raw) = raw else { return Thresholds::default() };
    Thresholds::deserialize(raw).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring malformed thresholds, using defaults");
        Thresholds::default()
    })
}

// ════════════════════════════════════════════════════════════════════════════
// Entries
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct RawEntry {
    name:     Option<String>,
    triggers: Option<Value>,
    image:    Option<String>,
    sound:    Option<String>,
    position: Option<String>,
    scale:    Option<f32>,
    opacity:  Option<f32>,
    #[serde(rename = "loop", default)]
    looping:  bool,
}

/// Validate one entry of the `memes` list.
pub fn parse_entry(
    index:  usize,
    raw:    &Value,
    assets: &AssetDirs,
) -> Result<MemeDefinition, ValidationError> {
    let entry = RawEntry::deserialize(raw).map_err(|e| ValidationError::MalformedEntry {
        index,
        reason: e.to_string(),
    })?;

    let name = match entry.name {
        Some(n) if !n.trim().is_empty() => n,
        _ => return Err(ValidationError::MissingName { index }),
    };
    let raw_trigger = entry.triggers
        .ok_or_else(|| ValidationError::MissingTrigger { name: name.clone() })?;
    let trigger = TriggerRule::parse(&name, &raw_trigger)?;

    let hints = RenderHints {
        anchor:  parse_anchor(&name, entry.position.as_deref()),
        scale:   parse_scale(&name, entry.scale),
        opacity: parse_opacity(&name, entry.opacity),
    };

    Ok(MemeDefinition {
        image:      entry.image.map(|f| resolve(&assets.images, f)),
        sound:      entry.sound.map(|f| resolve(&assets.sounds, f)),
        loop_sound: entry.looping,
        name,
        trigger,
        hints,
    })
}

fn resolve(dir: &Path, file: String) -> AssetRef {
    AssetRef { path: dir.join(&file), file }
}

fn parse_anchor(name: &str, position: Option<&str>) -> Anchor {
    match position {
        None => Anchor::default(),
        Some(p) => Anchor::parse(p).unwrap_or_else(|| {
            warn!(meme = name, position = p, "unknown position, using center");
            Anchor::Center
        }),
    }
}

fn parse_scale(name: &str, scale: Option<f32>) -> f32 {
    match scale {
        None => DEFAULT_SCALE,
        Some(s) if s > 0.0 && s <= 1.0 => s,
        Some(s) if s > 1.0 => {
            warn!(meme = name, scale = s, "scale above 1, clamping");
            1.0
        }
        Some(s) => {
            warn!(meme = name, scale = s, "scale must be positive, using default");
            DEFAULT_SCALE
        }
    }
}

fn parse_opacity(name: &str, opacity: Option<f32>) -> f32 {
    match opacity {
        None => DEFAULT_OPACITY,
        Some(o) if (0.0..=1.0).contains(&o) => o,
        Some(o) => {
            warn!(meme = name, opacity = o, "opacity outside 0–1, clamping");
            if o.is_nan() { DEFAULT_OPACITY } else { o.clamp(0.0, 1.0) }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
