//! Meme overlay: placement, compositing and the fade-out after a meme ends.
//!
//! The overlay reacts to intents like the sound player does.  `activate`
//! picks the image to show, `deactivate` starts a short fade, and every
//! frame [`Overlay::render`] composites the current image into the frame
//! buffer at its anchor.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use meme_rules::{Anchor, MemeDefinition, RenderHints};
use tracing::{debug, warn};

use crate::error::StageError;
use crate::lifecycle::IntentSink;

// ════════════════════════════════════════════════════════════════════════════
// Placement
// ════════════════════════════════════════════════════════════════════════════

/// Distance kept between an anchored overlay and the frame edge.
pub const MARGIN: i32 = 20;

/// Where an overlay lands in the frame.  The origin may be negative or the
/// rectangle may run past the frame; compositing clips it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub w: usize,
    pub h: usize,
}

/// Size an `img_w × img_h` image to `scale` of the frame width, keeping its
/// aspect ratio, and anchor it.
pub fn place(
    hints:   &RenderHints,
    frame_w: usize,
    frame_h: usize,
    img_w:   usize,
    img_h:   usize,
) -> Placement {
    let w = ((frame_w as f32 * hints.scale).round() as usize).max(1);
    let h = if img_w == 0 {
        w
    } else {
        ((w as f32 * img_h as f32 / img_w as f32).round() as usize).max(1)
    };

    let (fw, fh) = (frame_w as i32, frame_h as i32);
    let (wi, hi) = (w as i32, h as i32);
    let center_x = (fw - wi) / 2;
    let center_y = (fh - hi) / 2;
    let right    = fw - wi - MARGIN;
    let bottom   = fh - hi - MARGIN;

    let (x, y) = match hints.anchor {
        Anchor::Center       => (center_x, center_y),
        Anchor::TopLeft      => (MARGIN,   MARGIN),
        Anchor::TopRight     => (right,    MARGIN),
        Anchor::BottomLeft   => (MARGIN,   bottom),
        Anchor::BottomRight  => (right,    bottom),
        Anchor::TopCenter    => (center_x, MARGIN),
        Anchor::BottomCenter => (center_x, bottom),
    };
    Placement { x, y, w, h }
}

// ════════════════════════════════════════════════════════════════════════════
// Colors
// ════════════════════════════════════════════════════════════════════════════

/// Blend two ARGB colors. `t` = 0.0 → all `a`, `t` = 1.0 → all `b`.
pub fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    let lerp = |ca: u32, cb: u32| (ca as f32 * (1.0 - t) + cb as f32 * t).round() as u32;
    let ar = (a >> 16) & 0xFF; let br = (b >> 16) & 0xFF;
    let ag = (a >>  8) & 0xFF; let bg = (b >>  8) & 0xFF;
    let ab =  a        & 0xFF; let bb =  b        & 0xFF;
    0xFF000000 | (lerp(ar, br) << 16) | (lerp(ag, bg) << 8) | lerp(ab, bb)
}

/// Convert HSV to packed ARGB (0xAARRGGBB, A=0xFF).
pub fn hsv_to_argb(h: f32, s: f32, v: f32) -> u32 {
    let h  = h.rem_euclid(360.0);
    let hi = (h / 60.0) as u32;
    let f  = h / 60.0 - hi as f32;
    let p  = v * (1.0 - s);
    let q  = v * (1.0 - s * f);
    let t  = v * (1.0 - s * (1.0 - f));
    let (r, g, b) = match hi {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    let ri = (r * 255.0) as u32;
    let gi = (g * 255.0) as u32;
    let bi = (b * 255.0) as u32;
    0xFF000000 | (ri << 16) | (gi << 8) | bi
}

/// A stable color per meme name, for the placeholder panel.
pub fn name_color(name: &str) -> u32 {
    // FNV-1a
    let hash = name.bytes().fold(0x811c_9dc5_u32, |h, b| {
        (h ^ u32::from(b)).wrapping_mul(0x0100_0193)
    });
    hsv_to_argb((hash % 360) as f32, 0.65, 0.85)
}

// ════════════════════════════════════════════════════════════════════════════
// Sprite: decoded ARGB pixels
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub width:  usize,
    pub height: usize,
    /// Row-major 0xAARRGGBB, alpha meaningful.
    pub pixels: Vec<u32>,
}

impl Sprite {
    pub fn solid(width: usize, height: usize, color: u32) -> Self {
        Sprite { width, height, pixels: vec![color; width * height] }
    }

    /// Decode a PNG, JPEG or GIF file.
    pub fn load(path: &Path) -> Result<Self, StageError> {
        let img = image::open(path)
            .map_err(|source| StageError::Image { path: path.to_path_buf(), source })?
            .to_rgba8();
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(StageError::EmptyImage(path.to_path_buf()));
        }
        let pixels = img.pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
            })
            .collect();
        Ok(Sprite { width: w as usize, height: h as usize, pixels })
    }

    /// A 4:3 panel in the meme's color with a darker rim.
    pub fn placeholder(name: &str) -> Self {
        const W: usize = 160;
        const H: usize = 120;
        const RIM: usize = 4;
        let fill = name_color(name);
        let rim  = blend(fill, 0xFF000000, 0.45);
        let mut sprite = Sprite::solid(W, H, fill);
        for y in 0..H {
            for x in 0..W {
                if x < RIM || y < RIM || x >= W - RIM || y >= H - RIM {
                    sprite.pixels[y * W + x] = rim;
                }
            }
        }
        sprite
    }

    /// Nearest-neighbor sample for output pixel `(col, row)` of a `w × h` target.
    fn sample(&self, col: usize, row: usize, w: usize, h: usize) -> u32 {
        let sx = (col * self.width / w.max(1)).min(self.width - 1);
        let sy = (row * self.height / h.max(1)).min(self.height - 1);
        self.pixels[sy * self.width + sx]
    }
}

/// Composite `sprite`, scaled to `at`, over `buf` with `opacity`.
/// Pixels outside the `buf_w × buf_h` frame are dropped.
pub fn composite(
    buf:     &mut [u32],
    buf_w:   usize,
    buf_h:   usize,
    sprite:  &Sprite,
    at:      Placement,
    opacity: f32,
) {
    if sprite.pixels.is_empty() || opacity <= 0.0 {
        return;
    }
    for row in 0..at.h {
        let y = at.y + row as i32;
        if y < 0 { continue; }
        if y as usize >= buf_h { break; }
        for col in 0..at.w {
            let x = at.x + col as i32;
            if x < 0 { continue; }
            if x as usize >= buf_w { break; }

            let src   = sprite.sample(col, row, at.w, at.h);
            let alpha = ((src >> 24) & 0xFF) as f32 / 255.0 * opacity;
            let i     = y as usize * buf_w + x as usize;
            buf[i] = blend(buf[i], src | 0xFF000000, alpha);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ImageCache
// ════════════════════════════════════════════════════════════════════════════

/// Decoded images keyed by path.  A failed load is remembered so it is
/// reported once, not every frame.
#[derive(Debug, Default)]
pub struct ImageCache {
    sprites: HashMap<PathBuf, Option<Arc<Sprite>>>,
}

impl ImageCache {
    pub fn get(&mut self, path: &Path) -> Option<Arc<Sprite>> {
        self.sprites
            .entry(path.to_path_buf())
            .or_insert_with(|| match Sprite::load(path) {
                Ok(sprite) => {
                    debug!(path = %path.display(), w = sprite.width, h = sprite.height, "image loaded");
                    Some(Arc::new(sprite))
                }
                Err(e) => {
                    warn!(error = %e, "meme image unavailable, using placeholder");
                    None
                }
            })
            .clone()
    }

    /// Forget everything, so edited files are decoded again.
    pub fn clear(&mut self) { self.sprites.clear(); }

    pub fn len(&self) -> usize { self.sprites.len() }
    pub fn is_empty(&self) -> bool { self.sprites.is_empty() }
}

// ════════════════════════════════════════════════════════════════════════════
// FadePhase: visibility of the overlay
// ════════════════════════════════════════════════════════════════════════════

/// Fade progress per frame; about a third of a second at 30 fps.
const FADE_STEP: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FadePhase {
    /// Nothing on screen.
    Hidden,
    /// Meme active, full opacity.
    Shown,
    /// Meme ended, fading toward hidden.
    FadingOut { progress: f32 },
}

impl FadePhase {
    /// Advance one frame.  Returns true when the fade completes.
    pub fn tick(&mut self) -> bool {
        if let FadePhase::FadingOut { progress } = self {
            *progress += FADE_STEP;
            if *progress >= 1.0 {
                *self = FadePhase::Hidden;
                return true;
            }
        }
        false
    }

    /// Multiplier applied to the meme's configured opacity.
    pub fn alpha(&self) -> f32 {
        match self {
            FadePhase::Hidden                => 0.0,
            FadePhase::Shown                 => 1.0,
            FadePhase::FadingOut { progress } => (1.0 - progress).max(0.0),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Overlay
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
struct ShownMeme {
    name:  String,
    image: Option<PathBuf>,
    hints: RenderHints,
}

/// What [`Overlay::render`] drew this frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Drawn {
    pub name:        String,
    pub at:          Placement,
    /// True when the placeholder panel stood in for the image.
    pub placeholder: bool,
}

#[derive(Debug)]
pub struct Overlay {
    shown: Option<ShownMeme>,
    phase: FadePhase,
    cache: ImageCache,
}

impl Default for Overlay {
    fn default() -> Self {
        Overlay { shown: None, phase: FadePhase::Hidden, cache: ImageCache::default() }
    }
}

impl Overlay {
    pub fn new() -> Self { Self::default() }

    pub fn phase(&self) -> FadePhase { self.phase }

    /// Name of the meme on screen, including one that is fading out.
    pub fn showing(&self) -> Option<&str> {
        self.shown.as_ref().map(|s| s.name.as_str())
    }

    /// Per-frame animation step.
    pub fn tick(&mut self) {
        if self.phase.tick() {
            self.shown = None;
        }
    }

    /// Drop cached images, e.g. after the configuration was reloaded.
    pub fn invalidate_images(&mut self) { self.cache.clear(); }

    /// Composite the current meme into `buf`.
    pub fn render(&mut self, buf: &mut [u32], buf_w: usize, buf_h: usize) -> Option<Drawn> {
        let shown = self.shown.as_ref()?;
        let opacity = shown.hints.opacity * self.phase.alpha();
        if opacity <= 0.0 {
            return None;
        }

        let loaded = shown.image.as_deref().and_then(|p| self.cache.get(p));
        let placeholder = loaded.is_none();
        let sprite = loaded.unwrap_or_else(|| Arc::new(Sprite::placeholder(&shown.name)));

        let at = place(&shown.hints, buf_w, buf_h, sprite.width, sprite.height);
        composite(buf, buf_w, buf_h, &sprite, at, opacity);
        Some(Drawn { name: shown.name.clone(), at, placeholder })
    }
}

impl IntentSink for Overlay {
    fn activate(&mut self, meme: &MemeDefinition) {
        let image = meme.image.as_ref().map(|a| a.path.clone());
        if let Some(path) = &image {
            // decode now rather than on the first rendered frame
            self.cache.get(path);
        }
        self.shown = Some(ShownMeme { name: meme.name.clone(), image, hints: meme.hints });
        self.phase = FadePhase::Shown;
    }

    fn deactivate(&mut self) {
        if self.phase == FadePhase::Shown {
            self.phase = FadePhase::FadingOut { progress: 0.0 };
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use meme_rules::{AssetRef, TriggerRule};

    fn hints(anchor: Anchor, scale: f32) -> RenderHints {
        RenderHints { anchor, scale, opacity: 1.0 }
    }

    fn meme(name: &str) -> MemeDefinition {
        MemeDefinition::new(name, TriggerRule::Single("tpose".into()))
    }

    #[test]
    fn width_follows_scale_and_height_keeps_aspect() {
        let p = place(&hints(Anchor::Center, 0.5), 640, 480, 200, 100);
        assert_eq!((p.w, p.h), (320, 160));
        assert_eq!((p.x, p.y), (160, 160));
    }

    #[test]
    fn anchors_respect_margin() {
        let at = |a| place(&hints(a, 0.25), 640, 480, 100, 100);
        assert_eq!(at(Anchor::TopLeft),      Placement { x: 20,  y: 20,  w: 160, h: 160 });
        assert_eq!(at(Anchor::TopRight),     Placement { x: 460, y: 20,  w: 160, h: 160 });
        assert_eq!(at(Anchor::BottomLeft),   Placement { x: 20,  y: 300, w: 160, h: 160 });
        assert_eq!(at(Anchor::BottomRight),  Placement { x: 460, y: 300, w: 160, h: 160 });
        assert_eq!(at(Anchor::TopCenter),    Placement { x: 240, y: 20,  w: 160, h: 160 });
        assert_eq!(at(Anchor::BottomCenter), Placement { x: 240, y: 300, w: 160, h: 160 });
    }

    #[test]
    fn tall_image_can_overflow_and_is_clipped() {
        let p = place(&hints(Anchor::Center, 1.0), 40, 20, 10, 40);
        assert_eq!((p.w, p.h), (40, 160));
        assert!(p.y < 0);

        let mut buf = vec![0xFF000000; 40 * 20];
        composite(&mut buf, 40, 20, &Sprite::solid(10, 40, 0xFFFFFFFF), p, 1.0);
        assert!(buf.iter().all(|&c| c == 0xFFFFFFFF));
    }

    #[test]
    fn composite_honours_opacity_and_alpha() {
        let mut buf = vec![0xFF000000; 4];
        let at = Placement { x: 0, y: 0, w: 2, h: 2 };
        composite(&mut buf, 2, 2, &Sprite::solid(1, 1, 0xFFFFFFFF), at, 0.5);
        assert_eq!(buf[0], 0xFF808080);

        let mut buf = vec![0xFF000000; 4];
        composite(&mut buf, 2, 2, &Sprite::solid(1, 1, 0x00FFFFFF), at, 1.0);
        assert_eq!(buf[0], 0xFF000000);
    }

    #[test]
    fn composite_off_frame_is_a_no_op() {
        let mut buf = vec![0xFF000000; 16];
        let at = Placement { x: -10, y: 10, w: 4, h: 4 };
        composite(&mut buf, 4, 4, &Sprite::solid(1, 1, 0xFFFFFFFF), at, 1.0);
        assert!(buf.iter().all(|&c| c == 0xFF000000));
    }

    #[test]
    fn name_colors_are_stable_and_opaque() {
        assert_eq!(name_color("doge"), name_color("doge"));
        assert_eq!(name_color("doge") >> 24, 0xFF);
    }

    #[test]
    fn fade_runs_to_hidden() {
        let mut phase = FadePhase::FadingOut { progress: 0.0 };
        let mut frames = 0;
        while !phase.tick() {
            frames += 1;
            assert!(frames < 50);
        }
        assert_eq!(phase, FadePhase::Hidden);
        assert_eq!(phase.alpha(), 0.0);
    }

    #[test]
    fn missing_image_draws_placeholder() {
        let mut overlay = Overlay::new();
        let mut m = meme("ghost");
        m.image = Some(AssetRef { file: "ghost.png".into(), path: "/no/such/ghost.png".into() });
        overlay.activate(&m);

        let mut buf = vec![0xFF000000; 320 * 240];
        let drawn = overlay.render(&mut buf, 320, 240).unwrap();
        assert!(drawn.placeholder);
        assert_eq!(drawn.name, "ghost");
        assert!(buf.iter().any(|&c| c != 0xFF000000));
    }

    #[test]
    fn loaded_image_is_cached_and_drawn() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        image::RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]))
            .save(file.path())
            .unwrap();

        let mut overlay = Overlay::new();
        let mut m = meme("red");
        m.image = Some(AssetRef { file: "red.png".into(), path: file.path().to_path_buf() });
        m.hints = hints(Anchor::TopLeft, 0.5);
        overlay.activate(&m);
        assert_eq!(overlay.cache.len(), 1);

        let mut buf = vec![0xFF000000; 100 * 100];
        let drawn = overlay.render(&mut buf, 100, 100).unwrap();
        assert!(!drawn.placeholder);
        assert_eq!(drawn.at, Placement { x: 20, y: 20, w: 50, h: 25 });
        assert_eq!(buf[30 * 100 + 30], 0xFFFF0000);
    }

    #[test]
    fn deactivate_fades_then_clears() {
        let mut overlay = Overlay::new();
        overlay.activate(&meme("a"));
        overlay.deactivate();
        assert!(matches!(overlay.phase(), FadePhase::FadingOut { .. }));
        assert_eq!(overlay.showing(), Some("a"));
        for _ in 0..20 {
            overlay.tick();
        }
        assert_eq!(overlay.phase(), FadePhase::Hidden);
        assert!(overlay.showing().is_none());

        let mut buf = vec![0; 64];
        assert!(overlay.render(&mut buf, 8, 8).is_none());
    }

    #[test]
    fn activate_during_fade_replaces_meme() {
        let mut overlay = Overlay::new();
        overlay.activate(&meme("a"));
        overlay.deactivate();
        overlay.tick();
        overlay.activate(&meme("b"));
        assert_eq!(overlay.phase(), FadePhase::Shown);
        assert_eq!(overlay.showing(), Some("b"));
    }
}
