//! Error taxonomy for configuration loading.
//!
//! Neither kind is fatal.  A [`ConfigError`] means the whole document is
//! unusable and the catalog falls back to empty; a [`ValidationError`] drops
//! only the offending entry.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config {}: {source}", .path.display())]
    Parse {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config has no `memes` list")]
    Shape,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("entry #{index} is malformed: {reason}")]
    MalformedEntry { index: usize, reason: String },

    #[error("entry #{index} has no name")]
    MissingName { index: usize },

    #[error("meme `{name}` has no triggers")]
    MissingTrigger { name: String },

    #[error("meme `{name}` duplicates an earlier definition")]
    DuplicateName { name: String },

    #[error("meme `{name}`: unrecognized trigger keys {keys:?}")]
    UnrecognizedTrigger { name: String, keys: Vec<String> },

    #[error("meme `{name}`: ambiguous trigger, found {keys:?}")]
    AmbiguousTrigger { name: String, keys: Vec<String> },

    #[error("meme `{name}`: malformed `{key}` trigger: {reason}")]
    MalformedTrigger { name: String, key: String, reason: String },

    #[error("meme `{name}`: `{key}` names no features")]
    EmptyFeatureSet { name: String, key: String },

    #[error("meme `{name}`: unknown operator `{op}` on `{feature}`")]
    UnknownOperator { name: String, feature: String, op: String },
}

impl ValidationError {
    /// Name of the rejected entry, if it had one.
    pub fn meme_name(&self) -> Option<&str> {
        match self {
            ValidationError::MalformedEntry { .. }
            | ValidationError::MissingName { .. } => None,
            ValidationError::MissingTrigger { name }
            | ValidationError::DuplicateName { name }
            | ValidationError::UnrecognizedTrigger { name, .. }
            | ValidationError::AmbiguousTrigger { name, .. }
            | ValidationError::MalformedTrigger { name, .. }
            | ValidationError::EmptyFeatureSet { name, .. }
            | ValidationError::UnknownOperator { name, .. } => Some(name),
        }
    }
}
