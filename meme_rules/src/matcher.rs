//! Rule matcher: the first satisfied definition wins.
//!
//! The definition list lives in an immutable [`Catalog`] snapshot behind an
//! `RwLock<Arc<_>>`.  A match clones the `Arc` and evaluates without holding
//! the lock, so a concurrent [`RuleMatcher::reload`] is seen either entirely
//! or not at all.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use gesture_features::{FeatureMap, Thresholds};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::config::{self, AssetDirs, LoadReport};
use crate::definition::MemeDefinition;

// ════════════════════════════════════════════════════════════════════════════
// Catalog
// ════════════════════════════════════════════════════════════════════════════

/// One loaded generation of meme definitions, in evaluation order.
#[derive(Debug, Default)]
pub struct Catalog {
    pub definitions: Vec<Arc<MemeDefinition>>,
    pub thresholds:  Thresholds,
    /// Incremented on every swap.
    pub generation:  u64,
}

impl Catalog {
    /// First definition whose trigger holds.  Empty features match nothing.
    pub fn first_match(&self, features: &FeatureMap) -> Option<&Arc<MemeDefinition>> {
        if features.is_empty() {
            return None;
        }
        self.definitions.iter().find(|d| d.trigger.evaluate(features))
    }

    pub fn len(&self) -> usize { self.definitions.len() }
    pub fn is_empty(&self) -> bool { self.definitions.is_empty() }
}

// ════════════════════════════════════════════════════════════════════════════
// RuleMatcher
// ════════════════════════════════════════════════════════════════════════════

/// Where reloads read definitions from.
#[derive(Clone, Debug)]
struct Source {
    path:   PathBuf,
    assets: AssetDirs,
}

#[derive(Debug)]
pub struct RuleMatcher {
    source:       Option<Source>,
    catalog:      RwLock<Arc<Catalog>>,
    /// Diagnostics only; never consulted when deciding a match.
    last_matched: Mutex<Option<Arc<MemeDefinition>>>,
}

impl RuleMatcher {
    /// A matcher over a fixed list, with no file to reload from.
    pub fn from_definitions(definitions: Vec<MemeDefinition>) -> Self {
        let catalog = Catalog {
            definitions: definitions.into_iter().map(Arc::new).collect(),
            ..Catalog::default()
        };
        RuleMatcher {
            source:       None,
            catalog:      RwLock::new(Arc::new(catalog)),
            last_matched: Mutex::new(None),
        }
    }

    /// Load from a configuration file.  A missing or unparsable file gives an
    /// empty matcher; `reload` can pick the file up later.
    pub fn from_path(path: impl Into<PathBuf>, assets: AssetDirs) -> Self {
        let source = Source { path: path.into(), assets };
        let report = config::load(&source.path, &source.assets);
        let matcher = RuleMatcher {
            source:       Some(source),
            catalog:      RwLock::new(Arc::new(Catalog::default())),
            last_matched: Mutex::new(None),
        };
        matcher.install(report);
        matcher
    }

    /// Evaluate the current snapshot against `features`.
    pub fn matches(&self, features: &FeatureMap) -> Option<Arc<MemeDefinition>> {
        let catalog = self.snapshot();
        let found = catalog.first_match(features).cloned();
        if let Some(def) = &found {
            debug!(meme = %def.name, trigger = %def.trigger, "rule matched");
            *self.last_matched.lock() = Some(Arc::clone(def));
        }
        found
    }

    /// Re-read the source file and swap the catalog in one step.  Returns the
    /// new definition count.  Without a source this is a no-op.
    pub fn reload(&self) -> usize {
        let Some(source) = &self.source else {
            return self.snapshot().len();
        };
        info!(path = %source.path.display(), "reloading meme config");
        let report = config::load(&source.path, &source.assets);
        self.install(report)
    }

    /// Build the next catalog from `report` and publish it.
    fn install(&self, report: LoadReport) -> usize {
        let mut slot = self.catalog.write();
        let next = Catalog {
            definitions: report.definitions,
            thresholds:  report.thresholds,
            generation:  slot.generation + 1,
        };
        let count = next.len();
        *slot = Arc::new(next);
        count
    }

    /// The current catalog.  Stays valid across later reloads.
    pub fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog.read())
    }

    /// Number of catalog swaps so far; `1` after loading from a file.
    pub fn generation(&self) -> u64 {
        self.catalog.read().generation
    }

    pub fn last_matched(&self) -> Option<Arc<MemeDefinition>> {
        self.last_matched.lock().clone()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_ref().map(|s| s.path.as_path())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
