//! Lifecycle coordinator: the Idle/Active state machine that turns per-frame
//! match results into activate/deactivate intents.
//!
//! Intents are emitted only on change.  Holding the same gesture for many
//! frames produces one `Activate`, and switching straight from one meme to
//! another produces `Deactivate` followed by `Activate`.

use std::fmt;
use std::sync::Arc;

use meme_rules::MemeDefinition;
use tracing::info;

// ════════════════════════════════════════════════════════════════════════════
// Intent
// ════════════════════════════════════════════════════════════════════════════

/// A side-effect request for the render and audio collaborators.
#[derive(Clone, Debug, PartialEq)]
pub enum Intent {
    /// Start showing the image and playing the sound of this meme.
    Activate(Arc<MemeDefinition>),
    /// Stop whatever is showing.
    Deactivate,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Activate(m) => write!(f, "activate({})", m.name),
            Intent::Deactivate  => f.write_str("deactivate()"),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// IntentSink: anything that reacts to intents
// ════════════════════════════════════════════════════════════════════════════

/// A collaborator driven by intents.  Sinks only read the definition.
pub trait IntentSink {
    fn activate(&mut self, meme: &MemeDefinition);
    fn deactivate(&mut self);
}

/// Deliver `intents` to every sink, in order.
pub fn dispatch(intents: &[Intent], sinks: &mut [&mut dyn IntentSink]) {
    for intent in intents {
        for sink in sinks.iter_mut() {
            match intent {
                Intent::Activate(m) => sink.activate(m),
                Intent::Deactivate  => sink.deactivate(),
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MemeState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq)]
pub enum MemeState {
    #[default]
    Idle,
    Active(Arc<MemeDefinition>),
}

impl MemeState {
    pub fn meme(&self) -> Option<&Arc<MemeDefinition>> {
        match self {
            MemeState::Active(m) => Some(m),
            MemeState::Idle      => None,
        }
    }
}

/// Two matches name the same meme when they are the same allocation, or when
/// a reload produced an identical definition.
fn same_meme(a: &Arc<MemeDefinition>, b: &Arc<MemeDefinition>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

// ════════════════════════════════════════════════════════════════════════════
// LifecycleCoordinator
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Default)]
pub struct LifecycleCoordinator {
    state:       MemeState,
    activations: u64,
}

impl LifecycleCoordinator {
    pub fn new() -> Self { Self::default() }

    /// Advance one frame with this frame's match result.
    pub fn transition(&mut self, matched: Option<Arc<MemeDefinition>>) -> Vec<Intent> {
        let current = std::mem::take(&mut self.state);
        let (next, intents) = match (current, matched) {
            (MemeState::Idle, None) => (MemeState::Idle, Vec::new()),

            (MemeState::Idle, Some(m)) => {
                info!(meme = %m.name, "meme activated");
                (MemeState::Active(Arc::clone(&m)), vec![Intent::Activate(m)])
            }

            (MemeState::Active(old), None) => {
                info!(meme = %old.name, "meme deactivated");
                (MemeState::Idle, vec![Intent::Deactivate])
            }

            (MemeState::Active(old), Some(m)) if same_meme(&old, &m) => {
                (MemeState::Active(old), Vec::new())
            }

            (MemeState::Active(old), Some(m)) => {
                info!(from = %old.name, to = %m.name, "meme swapped");
                (
                    MemeState::Active(Arc::clone(&m)),
                    vec![Intent::Deactivate, Intent::Activate(m)],
                )
            }
        };
        self.activations += intents.iter()
            .filter(|i| matches!(i, Intent::Activate(_)))
            .count() as u64;
        self.state = next;
        intents
    }

    /// Drop the active meme, if any.  Used on shutdown.
    pub fn clear(&mut self) -> Vec<Intent> {
        self.transition(None)
    }

    pub fn state(&self) -> &MemeState { &self.state }

    pub fn current(&self) -> Option<&Arc<MemeDefinition>> {
        self.state.meme()
    }

    /// Total activations since start.
    pub fn activations(&self) -> u64 { self.activations }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_features::FeatureMap;
    use meme_rules::{RuleMatcher, TriggerRule};

    fn meme(name: &str, feature: &str) -> Arc<MemeDefinition> {
        Arc::new(MemeDefinition::new(name, TriggerRule::Single(feature.into())))
    }

    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
    }

    impl IntentSink for Recorder {
        fn activate(&mut self, meme: &MemeDefinition) {
            self.log.push(format!("on:{}", meme.name));
        }
        fn deactivate(&mut self) {
            self.log.push("off".to_string());
        }
    }

    #[test]
    fn scenario_hold_then_release() {
        let matcher = RuleMatcher::from_definitions(vec![
            MemeDefinition::new("tpose_meme", TriggerRule::Single("tpose".into())),
        ]);
        let mut lc = LifecycleCoordinator::new();

        let held: FeatureMap = [("tpose", true)].into_iter().collect();
        let frames = [held.clone(), held, FeatureMap::new()];
        let emitted: Vec<Vec<Intent>> = frames.iter()
            .map(|f| lc.transition(matcher.matches(f)))
            .collect();

        assert_eq!(emitted[0].len(), 1);
        assert!(matches!(&emitted[0][0], Intent::Activate(m) if m.name == "tpose_meme"));
        assert!(emitted[1].is_empty());
        assert_eq!(emitted[2], vec![Intent::Deactivate]);
        assert_eq!(lc.state(), &MemeState::Idle);
    }

    #[test]
    fn idle_stays_idle_silently() {
        let mut lc = LifecycleCoordinator::new();
        assert!(lc.transition(None).is_empty());
        assert!(lc.transition(None).is_empty());
        assert!(lc.current().is_none());
    }

    #[test]
    fn swap_is_deactivate_then_activate() {
        let mut lc = LifecycleCoordinator::new();
        let a = meme("a", "tpose");
        let b = meme("b", "salute");
        lc.transition(Some(a));
        let intents = lc.transition(Some(Arc::clone(&b)));
        assert_eq!(intents, vec![Intent::Deactivate, Intent::Activate(Arc::clone(&b))]);
        assert!(Arc::ptr_eq(lc.current().unwrap(), &b));
        assert_eq!(lc.activations(), 2);
    }

    #[test]
    fn same_name_different_trigger_is_a_swap() {
        let mut lc = LifecycleCoordinator::new();
        lc.transition(Some(meme("x", "tpose")));
        let intents = lc.transition(Some(meme("x", "salute")));
        assert_eq!(intents.len(), 2);
    }

    #[test]
    fn identical_definition_after_reload_is_not_reactivated() {
        let mut lc = LifecycleCoordinator::new();
        lc.transition(Some(meme("a", "tpose")));
        // a fresh allocation with equal contents, as a reload would produce
        assert!(lc.transition(Some(meme("a", "tpose"))).is_empty());
    }

    #[test]
    fn dispatch_preserves_order_per_sink() {
        let mut audio = Recorder::default();
        let mut overlay = Recorder::default();
        let intents = vec![Intent::Deactivate, Intent::Activate(meme("b", "tpose"))];
        dispatch(&intents, &mut [&mut audio, &mut overlay]);
        assert_eq!(audio.log, ["off", "on:b"]);
        assert_eq!(overlay.log, audio.log);
    }

    #[test]
    fn clear_releases_active_meme() {
        let mut lc = LifecycleCoordinator::new();
        lc.transition(Some(meme("a", "tpose")));
        assert_eq!(lc.clear(), vec![Intent::Deactivate]);
        assert!(lc.clear().is_empty());
    }

    #[test]
    fn intent_display() {
        assert_eq!(Intent::Activate(meme("doge", "tpose")).to_string(), "activate(doge)");
        assert_eq!(Intent::Deactivate.to_string(), "deactivate()");
    }
}
