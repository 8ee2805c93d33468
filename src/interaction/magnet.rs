//! Magnetic snapping
//!
//! When the interpolated cursor lies within the radius of an interactive
//! element's center, the rendered and hit-tested position jumps to that
//! center. The underlying interpolated position is left untouched, so moving
//! out of the radius releases the cursor immediately.

use super::hit_test::InteractiveTarget;

/// Result of applying the magnet to one cursor position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagnetSnap {
    /// Presented X
    pub x: f64,
    /// Presented Y
    pub y: f64,
    /// Snapped to a target center
    pub engaged: bool,
}

impl MagnetSnap {
    /// Position passed through unchanged
    pub fn free(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            engaged: false,
        }
    }
}

/// Snap `(x, y)` to the target's center when strictly inside `radius`
pub fn snap(x: f64, y: f64, target: Option<&InteractiveTarget>, radius: f64) -> MagnetSnap {
    let Some(target) = target else {
        return MagnetSnap::free(x, y);
    };

    let (cx, cy) = target.center();
    if (x - cx).hypot(y - cy) < radius {
        MagnetSnap {
            x: cx,
            y: cy,
            engaged: true,
        }
    } else {
        MagnetSnap::free(x, y)
    }
}
