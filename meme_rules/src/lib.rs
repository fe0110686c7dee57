//! # meme_rules
//!
//! Declarative meme definitions and the matcher that picks one per frame.
//!
//! A configuration document is a JSON object with a `memes` list.  Each entry
//! names a meme, its trigger, and optional assets and render hints:
//!
//! ```json
//! {
//!   "memes": [
//!     { "name": "victory", "triggers": { "gesture": "peace_sign" },
//!       "image": "victory.png", "sound": "airhorn.mp3", "position": "top-right" },
//!     { "name": "double",  "triggers": { "gestures": ["hand_raised_left", "hand_raised_right"] } },
//!     { "name": "either",  "triggers": { "any_of": ["salute", "pointing"] } },
//!     { "name": "sigma",   "triggers": { "conditions": { "face_stillness": { ">": 0.7 } } },
//!       "loop": true, "scale": 0.4, "opacity": 0.8 }
//!   ]
//! }
//! ```
//!
//! ## Trigger forms
//!
//! | Key | Rule | Holds when |
//! |---|---|---|
//! | `gesture` | [`TriggerRule::Single`] | the feature is truthy |
//! | `gestures` | [`TriggerRule::All`] | every listed feature is truthy |
//! | `any_of` | [`TriggerRule::Any`] | at least one listed feature is truthy |
//! | `conditions` | [`TriggerRule::Conditions`] | every comparison or equality holds |
//!
//! Exactly one form per entry.  Entries that break this are dropped at load
//! time with a warning and never reach the matcher.
//!
//! ## Matching
//!
//! [`RuleMatcher::matches`] returns the first definition, in file order,
//! whose trigger holds.  An empty feature map matches nothing.
//! [`RuleMatcher::reload`] re-reads the file and swaps the whole list at
//! once; a match in flight sees either the old list or the new one.

pub mod error;
pub mod trigger;
pub mod definition;
pub mod config;
pub mod matcher;

pub use config::{AssetDirs, LoadReport};
pub use definition::{Anchor, AssetRef, MemeDefinition, RenderHints};
pub use error::{ConfigError, ValidationError};
pub use matcher::{Catalog, RuleMatcher};
pub use trigger::{CmpOp, Condition, Literal, TriggerRule};
