//! Render-loop smoothing
//!
//! Each display frame moves the visual cursor a fixed fraction of the way to
//! the pipeline target:
//!
//! ```text
//! current = current + (target - current) * α
//! ```
//!
//! Packets arrive at an irregular, network-jittery rate; the visual position
//! advances at the display rate only. Smaller α means heavier damping.

use serde::Serialize;
use tracing::trace;

/// Visual cursor state for one device
///
/// Owned by the render loop, the only writer of `current_x`/`current_y`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CursorVisual {
    /// Interpolated X
    pub current_x: f64,
    /// Interpolated Y
    pub current_y: f64,
    /// Button currently held
    pub is_pressed: bool,
}

impl CursorVisual {
    /// Visual cursor resting at a point
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            current_x: x,
            current_y: y,
            is_pressed: false,
        }
    }

    /// Jump straight to a point (connect / re-center)
    pub fn snap_to(&mut self, x: f64, y: f64) {
        self.current_x = x;
        self.current_y = y;
    }

    /// Advance one frame toward the target
    ///
    /// `alpha` must lie in (0, 1]; 1 tracks the target exactly.
    pub fn advance(&mut self, target: (f64, f64), alpha: f64) -> (f64, f64) {
        self.current_x += (target.0 - self.current_x) * alpha;
        self.current_y += (target.1 - self.current_y) * alpha;

        trace!(
            "Cursor smoothing: target=({:.1}, {:.1}) current=({:.1}, {:.1})",
            target.0,
            target.1,
            self.current_x,
            self.current_y
        );

        self.position()
    }

    /// Current interpolated position
    pub fn position(&self) -> (f64, f64) {
        (self.current_x, self.current_y)
    }

    /// Distance left to the target
    pub fn lag(&self, target: (f64, f64)) -> f64 {
        (target.0 - self.current_x).hypot(target.1 - self.current_y)
    }
}
