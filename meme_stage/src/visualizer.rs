//! Software-rendered stage using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ ACTIVE: DOGE                                        FPS 30   │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │      landmark dots              [meme overlay at anchor]     │
//! │                                                              │
//! │ peace_sign                                                   │
//! │ face_stillness 0.82                                          │
//! │ 1-4=pose  Z/X=hands  A/D=raise  F=face  W=eyes  R=reload ... │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use gesture_features::{FeatureMap, Frame, Handedness, Landmark};
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use tracing::info;

use crate::error::StageError;
use crate::overlay::{Drawn, Overlay};
use crate::source::{SimInput, SimKey};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:      usize = 960;
pub const WIN_H:      usize = 720;
const STATUS_H:       usize = 28;
const FEATURE_ROWS:   usize = 5;
const TEXT_SCALE:     usize = 2;
const BG_COLOR:       u32   = 0xFF1A1A2E;
const STATUS_BG:      u32   = 0xFF0F3460;
const ACTIVE_COLOR:   u32   = 0xFF7CFC00;
const IDLE_COLOR:     u32   = 0xFFAAAAAA;
const POSE_COLOR:     u32   = 0xFF33DD88;
const LEFT_COLOR:     u32   = 0xFF44CCFF;
const RIGHT_COLOR:    u32   = 0xFFFFAA44;
const FACE_COLOR:     u32   = 0xFF8888AA;
const LEGEND:         &str  =
    "1-4=pose  Z/X=hands  A/D=raise  F=face  W=eyes  J=jitter  R=reload  S=shot  Q=quit";

// ════════════════════════════════════════════════════════════════════════════
// Text helpers
// ════════════════════════════════════════════════════════════════════════════

/// Top status bar text.
pub fn status_line(active: Option<&str>) -> String {
    match active {
        Some(name) => format!("ACTIVE: {}", name.to_uppercase()),
        None       => "NO GESTURE DETECTED".to_string(),
    }
}

/// The first `limit` features in name order, as `name: value`.
pub fn feature_lines(features: &FeatureMap, limit: usize) -> Vec<String> {
    features.iter()
        .take(limit)
        .map(|(name, value)| format!("{name}: {value}"))
        .collect()
}

/// Write the canvas as a PNG into `dir`, creating it if needed.
pub fn save_screenshot(canvas: &Canvas, dir: &Path) -> Result<PathBuf, StageError> {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let path = dir.join(format!("meme_stage_{stamp}.png"));
    let fail = |source| StageError::Screenshot { path: path.clone(), source };

    std::fs::create_dir_all(dir).map_err(|e| fail(image::ImageError::IoError(e)))?;
    let rgba: Vec<u8> = canvas.buf.iter()
        .flat_map(|&p| [(p >> 16) as u8, (p >> 8) as u8, p as u8, 0xFF])
        .collect();
    image::save_buffer(&path, &rgba, canvas.width as u32, canvas.height as u32, image::ColorType::Rgba8)
        .map_err(fail)?;
    info!(path = %path.display(), "screenshot saved");
    Ok(path)
}

// ════════════════════════════════════════════════════════════════════════════
// FpsCounter
// ════════════════════════════════════════════════════════════════════════════

/// Frames per second over the most recent frame instants.
#[derive(Debug)]
pub struct FpsCounter {
    stamps: VecDeque<Instant>,
    window: usize,
}

impl Default for FpsCounter {
    fn default() -> Self { FpsCounter::new(30) }
}

impl FpsCounter {
    pub fn new(window: usize) -> Self {
        FpsCounter { stamps: VecDeque::with_capacity(window + 1), window: window.max(2) }
    }

    pub fn tick(&mut self, now: Instant) {
        self.stamps.push_back(now);
        while self.stamps.len() > self.window {
            self.stamps.pop_front();
        }
    }

    pub fn fps(&self) -> f32 {
        let (Some(first), Some(last)) = (self.stamps.front(), self.stamps.back()) else {
            return 0.0;
        };
        let span = last.duration_since(*first).as_secs_f32();
        if self.stamps.len() < 2 || span <= 0.0 {
            return 0.0;
        }
        (self.stamps.len() - 1) as f32 / span
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Canvas: ARGB frame buffer with drawing primitives
// ════════════════════════════════════════════════════════════════════════════

pub struct Canvas {
    pub width:  usize,
    pub height: usize,
    pub buf:    Vec<u32>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        Canvas { width, height, buf: vec![BG_COLOR; width * height] }
    }

    pub fn clear(&mut self, color: u32) { self.buf.fill(color); }

    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    /// A square dot centred on a normalized landmark.
    pub fn draw_landmark(&mut self, lm: Landmark, radius: usize, color: u32) {
        if !(0.0..=1.0).contains(&lm.x) || !(0.0..=1.0).contains(&lm.y) {
            return;
        }
        let cx = (lm.x * (self.width - 1) as f32) as usize;
        let cy = (lm.y * (self.height - 1) as f32) as usize;
        let x0 = cx.saturating_sub(radius);
        let y0 = cy.saturating_sub(radius);
        self.fill_rect(x0, y0, cx + radius + 1 - x0, cy + radius + 1 - y0, color);
    }

    /// Text in the 3×5 font, each font pixel drawn as a `scale × scale` block.
    pub fn draw_label(&mut self, text: &str, x: usize, y: usize, scale: usize, color: u32) {
        let advance = 4 * scale;
        let mut cx = x;
        for ch in text.chars() {
            if cx + advance > self.width { break; }
            for (row, bits) in glyph(ch).iter().enumerate() {
                for col in 0..3 {
                    if bits & (0b100 >> col) != 0 {
                        self.fill_rect(cx + col * scale, y + row * scale, scale, scale, color);
                    }
                }
            }
            cx += advance;
        }
    }

    /// Pixel width of `text` at `scale`.
    pub fn label_width(text: &str, scale: usize) -> usize {
        text.chars().count() * 4 * scale
    }
}

// ────────────────────────────────────────────────────────────────────────────
// 3×5 bitmap font, rows top to bottom, bit 2 = left column
// ────────────────────────────────────────────────────────────────────────────

fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [7, 5, 5, 5, 7], '1' => [2, 6, 2, 2, 7], '2' => [7, 1, 7, 4, 7],
        '3' => [7, 1, 7, 1, 7], '4' => [5, 5, 7, 1, 1], '5' => [7, 4, 7, 1, 7],
        '6' => [7, 4, 7, 5, 7], '7' => [7, 1, 1, 1, 1], '8' => [7, 5, 7, 5, 7],
        '9' => [7, 5, 7, 1, 7],
        'A' => [7, 5, 7, 5, 5], 'B' => [6, 5, 6, 5, 6], 'C' => [7, 4, 4, 4, 7],
        'D' => [6, 5, 5, 5, 6], 'E' => [7, 4, 7, 4, 7], 'F' => [7, 4, 7, 4, 4],
        'G' => [7, 4, 5, 5, 7], 'H' => [5, 5, 7, 5, 5], 'I' => [7, 2, 2, 2, 7],
        'J' => [1, 1, 1, 5, 7], 'K' => [5, 5, 6, 5, 5], 'L' => [4, 4, 4, 4, 7],
        'M' => [5, 7, 5, 5, 5], 'N' => [7, 5, 5, 5, 5], 'O' => [7, 5, 5, 5, 7],
        'P' => [7, 5, 7, 4, 4], 'Q' => [7, 5, 5, 7, 1], 'R' => [6, 5, 6, 5, 5],
        'S' => [7, 4, 7, 1, 7], 'T' => [7, 2, 2, 2, 2], 'U' => [5, 5, 5, 5, 7],
        'V' => [5, 5, 5, 2, 2], 'W' => [5, 5, 5, 7, 5], 'X' => [5, 5, 2, 5, 5],
        'Y' => [5, 5, 7, 2, 2], 'Z' => [7, 1, 2, 4, 7],
        '_' => [0, 0, 0, 0, 7], '-' => [0, 0, 7, 0, 0], '.' => [0, 0, 0, 0, 2],
        ':' => [0, 2, 0, 2, 0], '=' => [0, 7, 0, 7, 0], '/' => [1, 1, 2, 4, 4],
        '^' => [2, 5, 0, 0, 0], '(' => [1, 2, 2, 2, 1], ')' => [4, 2, 2, 2, 4],
        '!' => [2, 2, 2, 0, 2], ' ' => [0, 0, 0, 0, 0],
        _   => [0, 0, 2, 0, 0],
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

/// What the window asked the application to do this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UiInput {
    pub quit:       bool,
    pub reload:     bool,
    pub screenshot: bool,
}

/// Everything one rendered frame shows.
pub struct StageView<'a> {
    pub frame:          &'a Frame,
    pub features:       &'a FeatureMap,
    pub active:         Option<&'a str>,
    pub fps:            f32,
    /// Source or sound status, shown under the status bar.
    pub detail:         &'a str,
    pub show_landmarks: bool,
}

pub struct Visualizer {
    window: Window,
    canvas: Canvas,
    sim_tx: Option<Sender<SimInput>>,
}

impl Visualizer {
    /// Open the window.  Simulation keys go to `sim_tx` when given.
    pub fn new(sim_tx: Option<Sender<SimInput>>) -> Result<Self, StageError> {
        let mut window = Window::new(
            "Meme Stage",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;
        window.set_target_fps(60);

        Ok(Visualizer { window, canvas: Canvas::new(WIN_W, WIN_H), sim_tx })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard input, forwarding simulation keys.
    pub fn poll_input(&mut self) -> UiInput {
        let mut input = UiInput { quit: !self.window.is_open(), ..UiInput::default() };
        let pressed = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);

        if pressed(Key::Q) || pressed(Key::Escape) {
            input.quit = true;
        }
        input.reload     = pressed(Key::R);
        input.screenshot = pressed(Key::S);

        const SIM_KEYS: [(Key, SimKey); 11] = [
            (Key::Key1, SimKey::PoseNeutral),
            (Key::Key2, SimKey::PoseT),
            (Key::Key3, SimKey::PoseCrossed),
            (Key::Key4, SimKey::PoseSalute),
            (Key::Z,    SimKey::LeftShape),
            (Key::X,    SimKey::RightShape),
            (Key::A,    SimKey::RaiseLeft),
            (Key::D,    SimKey::RaiseRight),
            (Key::F,    SimKey::Face),
            (Key::W,    SimKey::EyesWide),
            (Key::J,    SimKey::Jitter),
        ];
        let keys: Vec<SimKey> = SIM_KEYS.iter()
            .filter(|(k, _)| pressed(*k))
            .map(|(_, s)| *s)
            .collect();

        if let Some(tx) = &self.sim_tx {
            for key in keys {
                let _ = tx.send(SimInput::Key(key));
            }
            if input.quit {
                let _ = tx.send(SimInput::Quit);
            }
        }
        input
    }

    /// Render one frame.
    pub fn render(&mut self, view: &StageView<'_>, overlay: &mut Overlay) -> Result<(), StageError> {
        let c = &mut self.canvas;
        c.clear(BG_COLOR);

        // ── Landmarks ─────────────────────────────────────────────────────
        if view.show_landmarks {
            draw_frame(c, view.frame);
        }

        // ── Meme overlay ──────────────────────────────────────────────────
        if let Some(drawn) = overlay.render(&mut c.buf, c.width, c.height) {
            draw_placeholder_label(c, &drawn);
        }

        // ── Status bar ────────────────────────────────────────────────────
        c.fill_rect(0, 0, WIN_W, STATUS_H, STATUS_BG);
        let color = if view.active.is_some() { ACTIVE_COLOR } else { IDLE_COLOR };
        c.draw_label(&status_line(view.active), 10, 8, TEXT_SCALE, color);
        let fps = format!("FPS {:.0}", view.fps);
        let fps_x = WIN_W.saturating_sub(Canvas::label_width(&fps, TEXT_SCALE) + 10);
        c.draw_label(&fps, fps_x, 8, TEXT_SCALE, 0xFFEEEEEE);
        c.draw_label(view.detail, 10, STATUS_H + 6, 1, 0xFF888888);

        // ── Detected features ─────────────────────────────────────────────
        let lines = feature_lines(view.features, FEATURE_ROWS);
        if !lines.is_empty() {
            let line_h = 6 * TEXT_SCALE + 4;
            let top = WIN_H - 24 - (FEATURE_ROWS + 1) * line_h;
            c.draw_label("DETECTED:", 10, top, TEXT_SCALE, 0xFFCCCCCC);
            for (i, line) in lines.iter().enumerate() {
                c.draw_label(line, 10, top + (i + 1) * line_h, TEXT_SCALE, 0xFFFFD700);
            }
        }

        // ── Key legend ────────────────────────────────────────────────────
        c.draw_label(LEGEND, 10, WIN_H - 14, 1, 0xFF888888);

        self.window.update_with_buffer(&c.buf, WIN_W, WIN_H)?;
        Ok(())
    }

    /// Save what was last rendered.
    pub fn screenshot(&self, dir: &Path) -> Result<PathBuf, StageError> {
        save_screenshot(&self.canvas, dir)
    }
}

fn draw_frame(c: &mut Canvas, frame: &Frame) {
    if let Some(face) = &frame.face {
        for lm in face.iter().step_by(3) {
            c.draw_landmark(*lm, 0, FACE_COLOR);
        }
    }
    if let Some(pose) = &frame.pose {
        for lm in pose {
            c.draw_landmark(*lm, 2, POSE_COLOR);
        }
    }
    for (i, hand) in frame.hands.iter().enumerate() {
        let color = match frame.handedness(i) {
            Some(Handedness::Left)  => LEFT_COLOR,
            Some(Handedness::Right) => RIGHT_COLOR,
            None                    => IDLE_COLOR,
        };
        for lm in hand {
            c.draw_landmark(*lm, 1, color);
        }
    }
}

fn draw_placeholder_label(c: &mut Canvas, drawn: &Drawn) {
    if !drawn.placeholder { return; }
    let text = drawn.name.to_uppercase();
    let w = Canvas::label_width(&text, TEXT_SCALE);
    let x = drawn.at.x + (drawn.at.w as i32 - w as i32) / 2;
    let y = drawn.at.y + drawn.at.h as i32 / 2 - 5;
    if x >= 0 && y >= 0 {
        c.draw_label(&text, x as usize, y as usize, TEXT_SCALE, 0xFF000000);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_line_names_active_meme() {
        assert_eq!(status_line(Some("doge")), "ACTIVE: DOGE");
        assert_eq!(status_line(None), "NO GESTURE DETECTED");
    }

    #[test]
    fn feature_lines_show_first_five_with_values() {
        let mut f = FeatureMap::new();
        f.insert("eyes_wide", false);
        f.insert("face_stillness", 0.825_f32);
        for name in ["a", "b", "c", "d"] {
            f.insert(name, true);
        }
        let lines = feature_lines(&f, 5);
        assert_eq!(lines, ["a: true", "b: true", "c: true", "d: true", "eyes_wide: false"]);
        assert!(feature_lines(&FeatureMap::new(), 5).is_empty());
    }

    #[test]
    fn screenshot_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Canvas::new(8, 4);
        c.clear(0xFF102030);
        let path = save_screenshot(&c, &dir.path().join("shots")).unwrap();
        let img = image::open(&path).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (8, 4));
        assert_eq!(img.get_pixel(0, 0).0, [0x10, 0x20, 0x30, 0xFF]);
    }

    #[test]
    fn fps_over_window() {
        let mut fps = FpsCounter::new(30);
        assert_eq!(fps.fps(), 0.0);
        let t0 = Instant::now();
        for i in 0..40u64 {
            fps.tick(t0 + Duration::from_millis(i * 50));
        }
        assert!((fps.fps() - 20.0).abs() < 0.01);
    }

    #[test]
    fn label_draws_inside_canvas_only() {
        let mut c = Canvas::new(20, 10);
        c.clear(0);
        c.draw_label("HELLO WORLD", 0, 0, 1, 0xFFFFFFFF);
        // five glyphs fit in 20 pixels
        assert!(c.buf.iter().any(|&p| p == 0xFFFFFFFF));
        assert_eq!(c.buf.len(), 200);
    }

    #[test]
    fn landmark_dot_is_clipped_at_edges() {
        let mut c = Canvas::new(10, 10);
        c.clear(0);
        c.draw_landmark(Landmark::new(1.0, 0.0), 2, 7);
        assert_eq!(c.buf[9], 7);
        assert_eq!(c.buf.iter().filter(|&&p| p == 7).count(), 9);
        c.draw_landmark(Landmark::new(1.5, 0.5), 2, 8);
        assert!(c.buf.iter().all(|&p| p != 8));
    }

    #[test]
    fn lowercase_and_uppercase_share_glyphs() {
        assert_eq!(glyph('q'), glyph('Q'));
        assert_eq!(glyph('~'), [0, 0, 2, 0, 0]);
    }
}
