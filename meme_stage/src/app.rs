//! Top-level application state machine.
//!
//! `AppState` owns the feature extractor, the rule matcher, the lifecycle
//! coordinator and both intent sinks.  Each landmark frame runs
//! extract → match → transition → dispatch exactly once.

use std::path::PathBuf;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use gesture_features::{FeatureExtractor, FeatureMap, Frame};
use meme_rules::{AssetDirs, MemeDefinition, RuleMatcher};
use tracing::{debug, info, warn};

use crate::audio::{SoundBackend, SoundPlayer};
use crate::error::StageError;
use crate::lifecycle::{dispatch, Intent, LifecycleCoordinator};
use crate::overlay::Overlay;
use crate::source::{spawn_landmark_source, ReplaySource, SimLandmarkSource, SIM_FRAME};
use crate::visualizer::{FpsCounter, StageView, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Meme definition document.
    pub config_path:    PathBuf,
    pub assets:         AssetDirs,
    /// Recorded frames to play instead of the keyboard simulator.
    pub replay:         Option<PathBuf>,
    /// No window; requires `replay`.
    pub headless:       bool,
    pub sound:          SoundBackend,
    pub show_landmarks: bool,
    /// Replay pacing.  `None` paces windowed replay at the simulator rate
    /// and runs headless replay flat out.
    pub frame_interval: Option<Duration>,
    /// Where `S` saves screenshots.
    pub screenshot_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            config_path:    PathBuf::from("config/memes.json"),
            assets:         AssetDirs::default(),
            replay:         None,
            headless:       false,
            sound:          SoundBackend::preferred(),
            show_landmarks: true,
            frame_interval: None,
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── per-frame pipeline ───────────────────────────────────────────────
    extractor: FeatureExtractor,
    matcher:   RuleMatcher,
    lifecycle: LifecycleCoordinator,

    // ── intent sinks ─────────────────────────────────────────────────────
    audio:     SoundPlayer,
    overlay:   Overlay,

    // ── diagnostics ──────────────────────────────────────────────────────
    features:  FeatureMap,
    frames:    u64,
    /// Last thing the sound thread reported.
    sound_status: Option<String>,
}

impl AppState {
    pub fn new(matcher: RuleMatcher, sound: SoundBackend) -> Self {
        let thresholds = matcher.snapshot().thresholds.clone();
        AppState {
            extractor: FeatureExtractor::new(thresholds),
            matcher,
            lifecycle: LifecycleCoordinator::new(),
            audio:     SoundPlayer::spawn(sound),
            overlay:   Overlay::new(),
            features:  FeatureMap::new(),
            frames:    0,
            sound_status: None,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        let matcher = RuleMatcher::from_path(&cfg.config_path, cfg.assets.clone());
        AppState::new(matcher, cfg.sound)
    }

    // ── process one landmark frame ───────────────────────────────────────

    pub fn process_frame(&mut self, frame: &Frame) -> Vec<Intent> {
        let features = self.extractor.extract(frame);
        let matched = self.matcher.matches(&features);
        let intents = self.lifecycle.transition(matched);

        dispatch(&intents, &mut [&mut self.audio, &mut self.overlay]);

        self.frames += 1;
        debug!(frame = self.frames, features = features.len(), intents = intents.len(), "frame processed");
        self.features = features;
        intents
    }

    /// Re-read the meme configuration.  The extractor is rebuilt only when
    /// the thresholds changed, so stillness history survives a plain edit.
    pub fn reload(&mut self) -> usize {
        let count = self.matcher.reload();
        let snapshot = self.matcher.snapshot();
        let thresholds = &snapshot.thresholds;
        if thresholds != self.extractor.thresholds() {
            info!("thresholds changed, resetting feature extractor");
            self.extractor = FeatureExtractor::new(thresholds.clone());
        }
        self.overlay.invalidate_images();
        info!(memes = count, generation = self.matcher.generation(), "configuration reloaded");
        count
    }

    /// Per-frame step, independent of landmark input: advance the overlay
    /// fade and collect what the sound thread did since the last tick.
    pub fn tick(&mut self) {
        self.overlay.tick();
        if let Some(last) = self.audio.drain_events().last() {
            self.sound_status = Some(last.to_string());
        }
    }

    /// Deactivate whatever is showing and stop the sound thread.
    pub fn shutdown(&mut self) {
        let intents = self.lifecycle.clear();
        dispatch(&intents, &mut [&mut self.audio, &mut self.overlay]);
        self.audio.shutdown();
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn features(&self)    -> &FeatureMap  { &self.features }
    pub fn active(&self)      -> Option<&Arc<MemeDefinition>> { self.lifecycle.current() }
    pub fn matcher(&self)     -> &RuleMatcher { &self.matcher }
    pub fn overlay_mut(&mut self) -> &mut Overlay { &mut self.overlay }
    pub fn frames(&self)      -> u64          { self.frames }
    pub fn sound_status(&self) -> Option<&str> { self.sound_status.as_deref() }
    pub fn activations(&self) -> u64          { self.lifecycle.activations() }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the windowed application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Opens the stage window, starts the landmark source (replay when a file is
/// given, keyboard simulation otherwise) and drives the event/render loop.
pub fn run(cfg: AppConfig) -> Result<(), StageError> {
    if cfg.headless {
        return run_headless(&cfg).map(|_| ());
    }

    let mut app = AppState::from_config(&cfg);

    // ── Landmark source ──────────────────────────────────────────────────
    let (sim_tx, frame_rx, source_label) = match &cfg.replay {
        Some(path) => {
            let pace = cfg.frame_interval.or(Some(SIM_FRAME));
            let source = ReplaySource::open(path, pace)?;
            (None, spawn_landmark_source(source), format!("replay {}", path.display()))
        }
        None => {
            let (tx, rx) = mpsc::channel();
            (Some(tx), spawn_landmark_source(SimLandmarkSource::new(rx)), "simulation".to_string())
        }
    };

    let mut vis = Visualizer::new(sim_tx)?;
    let mut fps = FpsCounter::default();
    let mut last = Frame::default();
    let mut source_open = true;

    // ── Main loop ─────────────────────────────────────────────────────────
    while vis.is_open() {
        // 1. Window input
        let input = vis.poll_input();
        if input.quit { break; }
        if input.reload { app.reload(); }

        // 2. Drain landmark frames
        while source_open {
            match frame_rx.try_recv() {
                Ok(frame) => {
                    app.process_frame(&frame);
                    fps.tick(Instant::now());
                    last = frame;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    info!("landmark source finished");
                    source_open = false;
                }
            }
        }

        // 3. Per-frame logic
        app.tick();
        if input.screenshot {
            // the previous frame is still in the canvas
            if let Err(e) = vis.screenshot(&cfg.screenshot_dir) {
                warn!(error = %e, "screenshot failed");
            }
        }

        // 4. Render
        let features = app.features().clone();
        let active = app.active().map(|m| m.name.clone());
        let detail = match app.sound_status() {
            Some(sound) => format!("{source_label}  {sound}"),
            None        => source_label.clone(),
        };
        let view = StageView {
            frame:          &last,
            features:       &features,
            active:         active.as_deref(),
            fps:            fps.fps(),
            detail:         &detail,
            show_landmarks: cfg.show_landmarks,
        };
        vis.render(&view, app.overlay_mut())?;
    }

    app.shutdown();
    info!(frames = app.frames(), activations = app.activations(), "stage closed");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// run_headless(): replay without a window
// ════════════════════════════════════════════════════════════════════════════

/// Totals from a headless replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames:      u64,
    pub activations: u64,
}

/// Replay a recorded file through the pipeline, logging every intent.
pub fn run_headless(cfg: &AppConfig) -> Result<ReplaySummary, StageError> {
    let path = cfg.replay.as_ref().ok_or(StageError::HeadlessWithoutReplay)?;
    let source = ReplaySource::open(path, cfg.frame_interval)?;
    let pace = source.interval();

    let mut app = AppState::from_config(cfg);
    for frame in source.frames() {
        for intent in app.process_frame(&frame) {
            info!(frame = app.frames(), "{intent}");
        }
        app.tick();
        if let Some(pause) = pace {
            thread::sleep(pause);
        }
    }
    app.shutdown();

    let summary = ReplaySummary { frames: app.frames(), activations: app.activations() };
    info!(frames = summary.frames, activations = summary.activations, "replay complete");
    Ok(summary)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_features::synthetic::{hand, neutral_pose, tpose, HandShape};
    use serde_json::json;
    use std::io::Write;

    fn config_file(doc: serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{doc}").unwrap();
        file
    }

    fn app_for(file: &tempfile::NamedTempFile) -> AppState {
        let matcher = RuleMatcher::from_path(file.path(), AssetDirs::under("/nonexistent"));
        AppState::new(matcher, SoundBackend::Silent)
    }

    fn tpose_frame() -> Frame {
        Frame { pose: Some(tpose()), ..Frame::default() }
    }

    fn raised_right(y: f32) -> Frame {
        Frame {
            pose:        Some(neutral_pose()),
            hands:       vec![hand(HandShape::Open, 0.3, y)],
            hand_labels: vec!["Right".to_string()],
            face:        None,
        }
    }

    #[test]
    fn hold_then_release_emits_on_change_only() {
        let file = config_file(json!({"memes": [
            {"name": "tpose_meme", "triggers": {"gesture": "tpose"}},
        ]}));
        let mut app = app_for(&file);

        let a = app.process_frame(&tpose_frame());
        let b = app.process_frame(&tpose_frame());
        let c = app.process_frame(&Frame::default());

        assert!(matches!(a.as_slice(), [Intent::Activate(m)] if m.name == "tpose_meme"));
        assert!(b.is_empty());
        assert_eq!(c, vec![Intent::Deactivate]);
        assert_eq!(app.frames(), 3);
        assert_eq!(app.activations(), 1);
    }

    #[test]
    fn features_are_exposed_for_display() {
        let file = config_file(json!({"memes": []}));
        let mut app = app_for(&file);
        app.process_frame(&tpose_frame());
        assert!(app.features().is_truthy("tpose"));
        assert!(app.active().is_none());
    }

    #[test]
    fn missing_config_runs_with_no_memes() {
        let matcher = RuleMatcher::from_path("/no/such/memes.json", AssetDirs::default());
        let mut app = AppState::new(matcher, SoundBackend::Silent);
        assert!(app.process_frame(&tpose_frame()).is_empty());
    }

    #[test]
    fn overlay_follows_intents() {
        let file = config_file(json!({"memes": [
            {"name": "tpose_meme", "triggers": {"gesture": "tpose"}, "image": "t.png"},
        ]}));
        let mut app = app_for(&file);
        app.process_frame(&tpose_frame());
        assert_eq!(app.overlay_mut().showing(), Some("tpose_meme"));
        app.process_frame(&Frame::default());
        for _ in 0..20 {
            app.tick();
        }
        assert!(app.overlay_mut().showing().is_none());
    }

    #[test]
    fn tick_drains_sound_events() {
        let assets = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(assets.path().join("sounds")).unwrap();
        std::fs::write(assets.path().join("sounds/t.wav"), b"").unwrap();
        let file = config_file(json!({"memes": [
            {"name": "tpose_meme", "triggers": {"gesture": "tpose"}, "sound": "t.wav"},
        ]}));
        let matcher = RuleMatcher::from_path(file.path(), AssetDirs::under(assets.path()));
        let mut app = AppState::new(matcher, SoundBackend::Silent);
        assert!(app.sound_status().is_none());

        for _ in 0..500 {
            app.process_frame(&tpose_frame());
            app.process_frame(&Frame::default());
            app.tick();
        }
        // every command has been handled once the thread is joined
        app.audio.shutdown();
        app.tick();

        assert!(app.audio.drain_events().is_empty());
        assert_eq!(app.sound_status(), Some("sound: stopped"));
        assert_eq!(app.activations(), 500);
    }

    #[test]
    fn reload_applies_new_rules_and_thresholds() {
        let file = config_file(json!({"memes": [
            {"name": "hi", "triggers": {"gesture": "hand_raised_right"}},
        ]}));
        let mut app = app_for(&file);
        assert_eq!(app.process_frame(&raised_right(0.4)).len(), 1);

        std::fs::write(file.path(), json!({
            "thresholds": {"hand_raised_y": 0.3},
            "memes": [{"name": "hi", "triggers": {"gesture": "hand_raised_right"}}],
        }).to_string()).unwrap();
        assert_eq!(app.reload(), 1);
        assert_eq!(app.matcher().generation(), 2);

        // wrist at 0.4 no longer counts as raised
        assert_eq!(app.process_frame(&raised_right(0.4)), vec![Intent::Deactivate]);
        assert!(app.features().get("hand_raised_right").is_none());
    }

    #[test]
    fn headless_replay_counts_activations() {
        let config = config_file(json!({"memes": [
            {"name": "tpose_meme", "triggers": {"gesture": "tpose"}},
        ]}));
        let line = serde_json::to_string(&tpose_frame()).unwrap();
        let mut replay = tempfile::NamedTempFile::new().unwrap();
        writeln!(replay, "{line}\n{line}\n{{}}\ngarbage\n{line}").unwrap();

        let cfg = AppConfig {
            config_path: config.path().to_path_buf(),
            assets:      AssetDirs::under("/nonexistent"),
            replay:      Some(replay.path().to_path_buf()),
            headless:    true,
            sound:       SoundBackend::Silent,
            ..AppConfig::default()
        };
        let summary = run_headless(&cfg).unwrap();
        assert_eq!(summary, ReplaySummary { frames: 4, activations: 2 });
    }

    #[test]
    fn headless_without_replay_is_an_error() {
        let cfg = AppConfig { headless: true, ..AppConfig::default() };
        assert!(matches!(run_headless(&cfg), Err(StageError::HeadlessWithoutReplay)));
    }
}
