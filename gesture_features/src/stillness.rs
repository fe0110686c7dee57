//! Face stillness tracking.
//!
//! A fixed-size ring buffer of recent face snapshots.  Stillness is derived
//! from the positional variance of each mesh point across the buffer:
//!
//! ```text
//! v          = mean over points of mean over frames |p − mean(p)|²   (x, y only)
//! stillness  = clamp(1 − sqrt(v) / range, 0, 1)
//! ```
//!
//! `sqrt(v)` is the RMS wobble of the face in frame units, so `range` is the
//! wobble at which stillness bottoms out at zero.  A single snapshot has no
//! variance and reads as perfectly still.

use std::collections::VecDeque;

use crate::landmark::Landmark;

#[derive(Debug)]
pub struct StillnessTracker {
    window:  usize,
    range:   f32,
    history: VecDeque<Vec<Landmark>>,
}

impl StillnessTracker {
    /// `window` is clamped to at least 1 frame, `range` to a small positive
    /// value.
    pub fn new(window: usize, range: f32) -> Self {
        let window = window.max(1);
        StillnessTracker {
            window,
            range:   range.max(1e-6),
            history: VecDeque::with_capacity(window),
        }
    }

    /// Record a snapshot and return the stillness over the current window.
    ///
    /// A snapshot whose point count differs from the buffered ones starts a
    /// new history (a different mesh cannot be compared point for point).
    pub fn observe(&mut self, face: &[Landmark]) -> f32 {
        if self.history.front().is_some_and(|f| f.len() != face.len()) {
            self.history.clear();
        }
        if self.history.len() == self.window {
            self.history.pop_front();
        }
        self.history.push_back(face.to_vec());
        self.stillness()
    }

    /// Forget all snapshots (the face left the frame).
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn len(&self) -> usize { self.history.len() }
    pub fn is_empty(&self) -> bool { self.history.is_empty() }

    /// Stillness of the buffered snapshots; 1.0 when fewer than two exist.
    pub fn stillness(&self) -> f32 {
        let v = self.mean_variance();
        (1.0 - v.sqrt() / self.range).clamp(0.0, 1.0)
    }

    fn mean_variance(&self) -> f32 {
        let frames = self.history.len();
        let points = self.history.front().map_or(0, Vec::len);
        if frames < 2 || points == 0 {
            return 0.0;
        }

        let n = frames as f32;
        let mut total = 0.0_f32;
        for i in 0..points {
            let (sx, sy) = self.history.iter()
                .fold((0.0, 0.0), |(sx, sy), f| (sx + f[i].x, sy + f[i].y));
            let (mx, my) = (sx / n, sy / n);
            let var = self.history.iter()
                .map(|f| {
                    let dx = f[i].x - mx;
                    let dy = f[i].y - my;
                    dx * dx + dy * dy
                })
                .sum::<f32>() / n;
            total += var;
        }
        total / points as f32
    }
}
