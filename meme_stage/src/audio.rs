//! Meme sound playback thread.
//!
//! Sounds are started and stopped through a command channel so the frame loop
//! never waits on the output device.  The thread reports what it did on a
//! second channel; the app drains it every tick for the status line.
//!
//! Real playback goes through `rodio` and is compiled only with the `audio`
//! feature.  Without it, or when no output device opens, sounds are logged or
//! dropped.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use meme_rules::MemeDefinition;
use tracing::{debug, info};

use crate::lifecycle::IntentSink;

// ════════════════════════════════════════════════════════════════════════════
// SoundCommand: sent to the playback thread
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum SoundCommand {
    /// Start `path`, replacing whatever is playing.
    Play { path: PathBuf, looping: bool },
    /// Silence the current sound.
    Stop,
    /// Output gain, clamped to `0.0..=1.0`.
    SetVolume(f32),
    /// Terminate the thread.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// SoundEvent: sent back from the playback thread
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum SoundEvent {
    Started { path: PathBuf, looping: bool },
    Stopped { path: PathBuf },
    /// The file named by a `Play` was not there.
    Skipped { path: PathBuf },
    Volume(f32),
}

impl fmt::Display for SoundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundEvent::Started { path, looping: true } => write!(f, "sound: {} (loop)", file_name(path)),
            SoundEvent::Started { path, .. } => write!(f, "sound: {}", file_name(path)),
            SoundEvent::Stopped { .. }       => write!(f, "sound: stopped"),
            SoundEvent::Skipped { path }     => write!(f, "sound: missing {}", file_name(path)),
            SoundEvent::Volume(v)            => write!(f, "volume: {:.0}%", v * 100.0),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ════════════════════════════════════════════════════════════════════════════
// SoundOut: abstraction over the output device
// ════════════════════════════════════════════════════════════════════════════

/// Opened on the player thread, so implementations need not be `Send`.
pub trait SoundOut {
    fn start(&mut self, path: &Path, looping: bool, volume: f32);
    fn stop(&mut self, path: &Path);
    fn set_volume(&mut self, volume: f32);
}

// ── silent backend (--no-sound) ───────────────────────────────────────────

pub struct NullOut;
impl SoundOut for NullOut {
    fn start(&mut self, _p: &Path, _l: bool, _v: f32) {}
    fn stop(&mut self, _p: &Path)                      {}
    fn set_volume(&mut self, _v: f32)                  {}
}

// ── tracing backend ───────────────────────────────────────────────────────

/// Logs every sound operation instead of driving a device.
pub struct TraceOut;
impl SoundOut for TraceOut {
    fn start(&mut self, path: &Path, looping: bool, volume: f32) {
        info!(path = %path.display(), looping, volume, "sound start");
    }
    fn stop(&mut self, path: &Path) {
        info!(path = %path.display(), "sound stop");
    }
    fn set_volume(&mut self, volume: f32) {
        debug!(volume, "sound volume");
    }
}

// ── rodio backend ─────────────────────────────────────────────────────────

#[cfg(feature = "audio")]
mod device {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;

    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
    use tracing::{info, warn};

    use super::SoundOut;

    /// Plays through the default output device.  One sink per sound.
    pub struct RodioOut {
        _stream: OutputStream,
        handle:  OutputStreamHandle,
        sink:    Option<Sink>,
    }

    impl RodioOut {
        pub fn open() -> Option<Self> {
            match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    info!("audio output device opened");
                    Some(RodioOut { _stream: stream, handle, sink: None })
                }
                Err(e) => {
                    warn!(error = %e, "no audio output device, sound disabled");
                    None
                }
            }
        }
    }

    impl SoundOut for RodioOut {
        fn start(&mut self, path: &Path, looping: bool, volume: f32) {
            self.stop(path);

            let file = match File::open(path) {
                Ok(f)  => f,
                Err(e) => { warn!(path = %path.display(), error = %e, "cannot open sound"); return; }
            };
            let source = match Decoder::new(BufReader::new(file)) {
                Ok(s)  => s,
                Err(e) => { warn!(path = %path.display(), error = %e, "cannot decode sound"); return; }
            };
            let sink = match Sink::try_new(&self.handle) {
                Ok(s)  => s,
                Err(e) => { warn!(error = %e, "cannot create audio sink"); return; }
            };

            sink.set_volume(volume);
            if looping {
                sink.append(source.repeat_infinite());
            } else {
                sink.append(source);
            }
            self.sink = Some(sink);
        }

        fn stop(&mut self, _path: &Path) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }

        fn set_volume(&mut self, volume: f32) {
            if let Some(sink) = &self.sink {
                sink.set_volume(volume);
            }
        }
    }
}

/// Which [`SoundOut`] the player thread drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SoundBackend {
    Silent,
    Trace,
    /// The default output device; needs the `audio` feature.
    Device,
}

impl SoundBackend {
    /// What "sound on" means for this build.
    pub fn preferred() -> Self {
        if cfg!(feature = "audio") { SoundBackend::Device } else { SoundBackend::Trace }
    }

    fn open(self) -> Box<dyn SoundOut> {
        match self {
            SoundBackend::Silent => Box::new(NullOut),
            SoundBackend::Trace  => Box::new(TraceOut),
            SoundBackend::Device => open_device(),
        }
    }
}

#[cfg(feature = "audio")]
fn open_device() -> Box<dyn SoundOut> {
    match device::RodioOut::open() {
        Some(out) => Box::new(out),
        None      => Box::new(NullOut),
    }
}

#[cfg(not(feature = "audio"))]
fn open_device() -> Box<dyn SoundOut> {
    tracing::warn!("built without the `audio` feature, logging sounds instead");
    Box::new(TraceOut)
}

// ════════════════════════════════════════════════════════════════════════════
// SoundPlayer: handle to the playback thread
// ════════════════════════════════════════════════════════════════════════════

pub const DEFAULT_VOLUME: f32 = 0.7;

pub struct SoundPlayer {
    cmd_tx:   Sender<SoundCommand>,
    event_rx: Receiver<SoundEvent>,
    thread:   Option<JoinHandle<()>>,
}

impl SoundPlayer {
    /// The backend is opened on the player thread itself.
    pub fn spawn(backend: SoundBackend) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<SoundCommand>();
        let (event_tx, event_rx) = mpsc::channel::<SoundEvent>();
        let thread = thread::spawn(move || player_thread(backend.open(), cmd_rx, event_tx));
        SoundPlayer { cmd_tx, event_rx, thread: Some(thread) }
    }

    pub fn play(&self, path: impl Into<PathBuf>, looping: bool) {
        let _ = self.cmd_tx.send(SoundCommand::Play { path: path.into(), looping });
    }
    pub fn stop(&self) { let _ = self.cmd_tx.send(SoundCommand::Stop); }

    pub fn set_volume(&self, volume: f32) {
        let _ = self.cmd_tx.send(SoundCommand::SetVolume(volume));
    }

    /// Drain pending events (non-blocking).
    pub fn drain_events(&self) -> Vec<SoundEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Stop the thread and wait for it.  Events sent before exit stay
    /// readable through [`drain_events`](Self::drain_events).
    pub fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(SoundCommand::Quit);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SoundPlayer {
    fn drop(&mut self) { self.shutdown(); }
}

impl IntentSink for SoundPlayer {
    fn activate(&mut self, meme: &MemeDefinition) {
        if let Some(sound) = &meme.sound {
            self.play(&sound.path, meme.loop_sound);
        }
    }

    fn deactivate(&mut self) { self.stop(); }
}

// ════════════════════════════════════════════════════════════════════════════
// player_thread: the command loop
// ════════════════════════════════════════════════════════════════════════════

fn player_thread(
    mut out:  Box<dyn SoundOut>,
    cmd_rx:   Receiver<SoundCommand>,
    event_tx: Sender<SoundEvent>,
) {
    let mut volume = DEFAULT_VOLUME;
    let mut current: Option<PathBuf> = None;

    out.set_volume(volume);

    for cmd in cmd_rx {
        match cmd {
            SoundCommand::Play { path, looping } => {
                if let Some(prev) = current.take() {
                    out.stop(&prev);
                    let _ = event_tx.send(SoundEvent::Stopped { path: prev });
                }
                if !path.is_file() {
                    debug!(path = %path.display(), "sound file missing, skipping");
                    let _ = event_tx.send(SoundEvent::Skipped { path });
                    continue;
                }
                out.start(&path, looping, volume);
                let _ = event_tx.send(SoundEvent::Started { path: path.clone(), looping });
                current = Some(path);
            }
            SoundCommand::Stop => {
                if let Some(prev) = current.take() {
                    out.stop(&prev);
                    let _ = event_tx.send(SoundEvent::Stopped { path: prev });
                }
            }
            SoundCommand::SetVolume(v) => {
                volume = clamp_volume(v);
                out.set_volume(volume);
                let _ = event_tx.send(SoundEvent::Volume(volume));
            }
            SoundCommand::Quit => break,
        }
    }

    if let Some(prev) = current {
        out.stop(&prev);
    }
}

fn clamp_volume(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
