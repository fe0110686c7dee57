//! Small planar geometry helpers over normalized landmarks.

use crate::landmark::Landmark;

/// Euclidean distance on `(x, y)`; depth is ignored.
pub fn distance(a: Landmark, b: Landmark) -> f32 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// A fingertip is "extended" when it sits above (smaller `y`) its proximal
/// joint.
pub fn is_extended(tip: Landmark, joint: Landmark) -> bool {
    tip.y < joint.y
}

/// A fingertip is "curled" when it sits below its proximal joint.
pub fn is_curled(tip: Landmark, joint: Landmark) -> bool {
    tip.y > joint.y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Landmark { Landmark::new(x, y) }

    #[test]
    fn distance_is_pythagorean() {
        assert!((distance(p(0.0, 0.0), p(0.3, 0.4)) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn distance_ignores_depth() {
        let a = Landmark { x: 0.1, y: 0.1, z: 5.0 };
        assert!(distance(a, p(0.1, 0.1)) < 1e-6);
    }

    #[test]
    fn extension_tests_are_strict() {
        assert!(is_extended(p(0.5, 0.2), p(0.5, 0.3)));
        assert!(!is_extended(p(0.5, 0.3), p(0.5, 0.3)));
        assert!(!is_curled(p(0.5, 0.3), p(0.5, 0.3)));
    }
}
