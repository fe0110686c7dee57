//! Landmark sources: keyboard simulation and JSON-lines replay.
//!
//! The public interface is a stream of [`Frame`]s delivered over an `mpsc`
//! channel.  Consumers don't need to know whether frames came from a
//! detector recording or the keyboard simulator.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use gesture_features::synthetic::{
    arms_crossed_pose, face_mesh, hand, neutral_pose, salute_pose, tpose, HandShape,
};
use gesture_features::Frame;
use tracing::{debug, info, warn};

use crate::error::StageError;

/// Frame period of the simulator, about 30 fps.
pub const SIM_FRAME: Duration = Duration::from_millis(33);

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait: unified interface for sim and replay
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`Frame`]s over a channel.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<Frame>);
}

/// Spawn a landmark source on its own thread and return the receiving end.
pub fn spawn_landmark_source<S: LandmarkSource>(source: S) -> Receiver<Frame> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource: keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimInput {
    Key(SimKey),
    Quit,
}

/// Simulated key codes (mapped from minifb Key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    PoseNeutral,    // 1
    PoseT,          // 2
    PoseCrossed,    // 3
    PoseSalute,     // 4
    LeftShape,      // Z
    RightShape,     // X
    RaiseLeft,      // A
    RaiseRight,     // D
    Face,           // F
    EyesWide,       // W
    Jitter,         // J
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SimPose {
    #[default]
    Neutral,
    TPose,
    ArmsCrossed,
    Salute,
}

/// What the simulated person is doing.
#[derive(Clone, Debug, PartialEq)]
pub struct SimState {
    pub pose:        SimPose,
    pub left:        Option<HandShape>,
    pub right:       Option<HandShape>,
    pub left_up:     bool,
    pub right_up:    bool,
    pub face:        bool,
    pub eyes_wide:   bool,
    pub jitter:      bool,
}

impl Default for SimState {
    fn default() -> Self {
        SimState {
            pose:      SimPose::Neutral,
            left:      None,
            right:     None,
            left_up:   false,
            right_up:  false,
            face:      true,
            eyes_wide: false,
            jitter:    false,
        }
    }
}

/// Hidden → fist → peace → point → open → hidden.
fn cycle_shape(shape: Option<HandShape>) -> Option<HandShape> {
    match shape {
        None                 => Some(HandShape::Fist),
        Some(HandShape::Open) => None,
        Some(s)              => Some(s.next()),
    }
}

impl SimState {
    pub fn apply(&mut self, key: SimKey) {
        match key {
            SimKey::PoseNeutral => self.pose = SimPose::Neutral,
            SimKey::PoseT       => self.pose = SimPose::TPose,
            SimKey::PoseCrossed => self.pose = SimPose::ArmsCrossed,
            SimKey::PoseSalute  => self.pose = SimPose::Salute,
            SimKey::LeftShape   => self.left  = cycle_shape(self.left),
            SimKey::RightShape  => self.right = cycle_shape(self.right),
            SimKey::RaiseLeft   => self.left_up  = !self.left_up,
            SimKey::RaiseRight  => self.right_up = !self.right_up,
            SimKey::Face        => self.face      = !self.face,
            SimKey::EyesWide    => self.eyes_wide = !self.eyes_wide,
            SimKey::Jitter      => self.jitter    = !self.jitter,
        }
    }

    /// Build frame number `tick`.
    pub fn frame(&self, tick: u64) -> Frame {
        let pose = match self.pose {
            SimPose::Neutral     => neutral_pose(),
            SimPose::TPose       => tpose(),
            SimPose::ArmsCrossed => arms_crossed_pose(),
            SimPose::Salute      => salute_pose(),
        };

        let mut hands = Vec::new();
        let mut hand_labels = Vec::new();
        // the person's left hand shows on the right of the image
        let wrist_y = |up: bool| if up { 0.30 } else { 0.75 };
        if let Some(shape) = self.left {
            hands.push(hand(shape, 0.70, wrist_y(self.left_up)));
            hand_labels.push("Left".to_string());
        }
        if let Some(shape) = self.right {
            hands.push(hand(shape, 0.30, wrist_y(self.right_up)));
            hand_labels.push("Right".to_string());
        }

        let face = self.face.then(|| {
            let dx = if self.jitter { 0.008 * (tick as f32 * 1.7).sin() } else { 0.0 };
            face_mesh(self.eyes_wide, dx)
        });

        Frame { pose: Some(pose), hands, hand_labels, face }
    }

    /// Short description for the status line.
    pub fn describe(&self) -> String {
        let shape = |s: Option<HandShape>| s.map_or("-", HandShape::name);
        format!(
            "sim {:?} L:{}{} R:{}{} face:{}",
            self.pose,
            shape(self.left),  if self.left_up  { "^" } else { "" },
            shape(self.right), if self.right_up { "^" } else { "" },
            if !self.face { "off" } else if self.eyes_wide { "wide" } else { "on" },
        )
    }
}

/// Landmark source driven by [`SimInput`] events from the visualizer window.
pub struct SimLandmarkSource {
    pub rx:     Receiver<SimInput>,
    pub period: Duration,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimLandmarkSource { rx, period: SIM_FRAME }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn run(self: Box<Self>, tx: Sender<Frame>) {
        let mut state = SimState::default();
        let mut tick = 0u64;
        loop {
            // ── drain key input ───────────────────────────────────────────
            loop {
                match self.rx.try_recv() {
                    Ok(SimInput::Key(key)) => {
                        state.apply(key);
                        debug!(state = %state.describe(), "sim input");
                    }
                    Ok(SimInput::Quit) | Err(TryRecvError::Disconnected) => return,
                    Err(TryRecvError::Empty) => break,
                }
            }

            if tx.send(state.frame(tick)).is_err() { return; }
            tick += 1;
            thread::sleep(self.period);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ReplaySource: recorded frames, one JSON object per line
// ════════════════════════════════════════════════════════════════════════════

pub struct ReplaySource {
    path:     PathBuf,
    reader:   Box<dyn BufRead + Send>,
    /// Pause between frames; `None` replays as fast as the consumer reads.
    interval: Option<Duration>,
}

impl ReplaySource {
    pub fn open(path: &Path, interval: Option<Duration>) -> Result<Self, StageError> {
        let file = File::open(path).map_err(|source| StageError::Replay {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "replaying recorded frames");
        Ok(Self::from_reader(path, BufReader::new(file), interval))
    }

    pub fn from_reader(
        path:     &Path,
        reader:   impl BufRead + Send + 'static,
        interval: Option<Duration>,
    ) -> Self {
        ReplaySource { path: path.to_path_buf(), reader: Box::new(reader), interval }
    }

    pub fn interval(&self) -> Option<Duration> { self.interval }

    /// The frames in file order.  Blank lines are ignored; a line that is not
    /// a valid frame is logged and skipped.
    pub fn frames(self) -> impl Iterator<Item = Frame> {
        let path = self.path;
        self.reader
            .lines()
            .enumerate()
            .filter_map(move |(i, line)| {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        warn!(path = %path.display(), line = i + 1, error = %e, "unreadable replay line");
                        return None;
                    }
                };
                if line.trim().is_empty() {
                    return None;
                }
                match serde_json::from_str::<Frame>(&line) {
                    Ok(frame) => Some(frame),
                    Err(e) => {
                        warn!(path = %path.display(), line = i + 1, error = %e, "skipping malformed frame");
                        None
                    }
                }
            })
    }
}

impl LandmarkSource for ReplaySource {
    fn run(self: Box<Self>, tx: Sender<Frame>) {
        let interval = self.interval;
        for frame in self.frames() {
            if tx.send(frame).is_err() { return; }
            if let Some(pause) = interval {
                thread::sleep(pause);
            }
        }
        info!("replay finished");
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_features::FeatureExtractor;
    use std::io::Cursor;

    fn replay(text: &str) -> Vec<Frame> {
        ReplaySource::from_reader(Path::new("test.jsonl"), Cursor::new(text.to_string()), None)
            .frames()
            .collect()
    }

    #[test]
    fn default_sim_frame_has_pose_and_face_only() {
        let frame = SimState::default().frame(0);
        assert!(frame.pose.is_some());
        assert!(frame.face.is_some());
        assert!(frame.hands.is_empty());
    }

    #[test]
    fn sim_keys_reach_the_extractor() {
        let mut state = SimState::default();
        state.apply(SimKey::PoseT);
        let mut ex = FeatureExtractor::default();
        assert!(ex.extract(&state.frame(0)).is_truthy("tpose"));

        state.apply(SimKey::PoseNeutral);
        state.apply(SimKey::RightShape); // fist
        state.apply(SimKey::RightShape); // peace
        state.apply(SimKey::RaiseRight);
        let features = ex.extract(&state.frame(1));
        assert!(features.is_truthy("peace_sign"));
        assert!(features.is_truthy("hand_raised_right"));
        assert!(!features.is_truthy("tpose"));
    }

    #[test]
    fn hand_shape_cycle_includes_hidden() {
        let mut shape = None;
        let mut seen = Vec::new();
        for _ in 0..5 {
            shape = cycle_shape(shape);
            seen.push(shape);
        }
        assert_eq!(seen.first(), Some(&Some(HandShape::Fist)));
        assert_eq!(seen.last(), Some(&None));
    }

    #[test]
    fn face_toggle_removes_face() {
        let mut state = SimState::default();
        state.apply(SimKey::Face);
        assert!(state.frame(0).face.is_none());
    }

    #[test]
    fn jitter_moves_the_face() {
        let mut state = SimState::default();
        state.apply(SimKey::Jitter);
        let a = state.frame(1).face.unwrap();
        let b = state.frame(2).face.unwrap();
        assert_ne!(a[0].x, b[0].x);
    }

    #[test]
    fn replay_skips_bad_lines() {
        let text = concat!(
            "{\"pose\": null, \"hands\": [], \"hand_labels\": []}\n",
            "not json\n",
            "\n",
            "{\"hands\": [[{\"x\": 0.1, \"y\": 0.2}]], \"hand_labels\": [\"Left\"]}\n",
        );
        let frames = replay(text);
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_empty());
        assert_eq!(frames[1].hands[0][0].y, 0.2);
        assert_eq!(frames[1].hand_labels, ["Left"]);
    }

    #[test]
    fn replay_source_streams_over_channel() {
        let text = "{}\n{}\n{}\n";
        let source = ReplaySource::from_reader(Path::new("mem"), Cursor::new(text.to_string()), None);
        let rx = spawn_landmark_source(source);
        assert_eq!(rx.iter().count(), 3);
    }

    #[test]
    fn sim_source_stops_on_quit() {
        let (tx, rx) = mpsc::channel();
        let mut source = SimLandmarkSource::new(rx);
        source.period = Duration::from_millis(1);
        let frames = spawn_landmark_source(source);
        tx.send(SimInput::Key(SimKey::PoseT)).unwrap();
        let first = frames.recv().unwrap();
        assert!(first.pose.is_some());
        tx.send(SimInput::Quit).unwrap();
        // the channel closes once the thread returns
        while frames.recv().is_ok() {}
    }

    #[test]
    fn open_missing_replay_fails() {
        let err = ReplaySource::open(Path::new("/no/such/replay.jsonl"), None).err().unwrap();
        assert!(matches!(err, StageError::Replay { .. }));
    }
}
