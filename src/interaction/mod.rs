//! Interaction Layer
//!
//! Turns cursor positions into activations of a host element tree: hit
//! testing through nested frames, magnetic snapping to interactive
//! elements, dwell and physical click timing, and synthetic event injection.
//!
//! # Architecture
//!
//! ```text
//! cursor position
//!   ├─> find_interactive ──> magnet::snap ──> presented position
//!   ├─> InteractionState (dwell / press / debounce) ──> ClickRequest
//!   └─> execute_click ──> resolve_point ──> EventSink (press, release, click, focus)
//! ```
//!
//! The host tree is reached only through the [`Surface`] trait and events
//! leave only through [`EventSink`], so everything here runs against an
//! in-memory [`Scene`] in tests.

mod events;
pub mod magnet;
mod scene;
mod state;

pub use events::{EventKind, EventSink, InjectedEvent, RecordingSink};
pub use hit_test::{
    find_interactive, is_interactive, lookup, resolve_point, ElementHit, ElementRef,
    FrameAccessError, HitResult, InteractiveTarget, Surface, MAX_FRAME_DEPTH,
};
pub use magnet::MagnetSnap;
pub use scene::{ElementId, FrameContent, Node, Rect, Scene};
pub use state::{ClickRequest, ClickSource, InteractionPhase, InteractionState};

#[cfg(test)]
pub use events::MockEventSink;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

use crate::device::DeviceId;

/// Interaction timing and targeting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Hover time before a dwell click (ms)
    #[serde(default = "default_dwell_ms")]
    pub dwell_ms: u64,

    /// Magnet snap radius around target centers (pixels)
    #[serde(default = "default_magnet_radius")]
    pub magnet_radius_px: f64,

    /// Minimum interval between clicks from any source (ms)
    #[serde(default = "default_debounce_ms")]
    pub click_debounce_ms: u64,

    /// Marker class that makes any element interactive
    #[serde(default = "default_interactive_class")]
    pub interactive_class: String,

    /// Enable dwell clicking
    #[serde(default = "default_true")]
    pub dwell_enabled: bool,

    /// Enable magnet snapping
    #[serde(default = "default_true")]
    pub magnet_enabled: bool,
}

fn default_dwell_ms() -> u64 {
    1500
}
fn default_magnet_radius() -> f64 {
    40.0
}
fn default_debounce_ms() -> u64 {
    300
}
fn default_interactive_class() -> String {
    "game-card".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            dwell_ms: default_dwell_ms(),
            magnet_radius_px: default_magnet_radius(),
            click_debounce_ms: default_debounce_ms(),
            interactive_class: default_interactive_class(),
            dwell_enabled: true,
            magnet_enabled: true,
        }
    }
}

impl InteractionConfig {
    /// Dwell duration
    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    /// Click debounce interval
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.click_debounce_ms)
    }

    /// Effective magnet radius (0 when disabled)
    pub fn magnet_radius(&self) -> f64 {
        if self.magnet_enabled {
            self.magnet_radius_px.max(0.0)
        } else {
            0.0
        }
    }
}

/// Dispatch a click at a viewport point
///
/// Resolves the innermost element through frames, then injects press,
/// release and click at its local coordinates, plus focus when the element
/// accepts text. Returns the element clicked.
pub fn execute_click(
    surface: &dyn Surface,
    sink: &mut dyn EventSink,
    device: &DeviceId,
    x: f64,
    y: f64,
) -> Option<ElementRef> {
    let hit = match resolve_point(surface, x, y) {
        HitResult::Element(hit) => hit,
        HitResult::FrameBoundary(frame) => {
            debug!("{} click at ({:.0}, {:.0}) stopped at frame {}", device, x, y, frame);
            return None;
        }
        HitResult::Nothing => {
            trace!("{} click at ({:.0}, {:.0}) hit nothing", device, x, y);
            return None;
        }
    };

    let accepts_text = lookup(surface, &hit.target).is_some_and(Node::accepts_text);

    let mut kinds = vec![EventKind::Press, EventKind::Release, EventKind::Click];
    if accepts_text {
        kinds.push(EventKind::Focus);
    }
    for kind in kinds {
        sink.inject(InjectedEvent {
            device: device.clone(),
            kind,
            target: hit.target.clone(),
            x: hit.local_x,
            y: hit.local_y,
        });
    }

    debug!("{} clicked {} at ({:.0}, {:.0})", device, hit.target, x, y);
    Some(hit.target)
}

/// Dispatch a hover at a viewport point
///
/// Returns true when an element received the event.
pub fn dispatch_hover(
    surface: &dyn Surface,
    sink: &mut dyn EventSink,
    device: &DeviceId,
    x: f64,
    y: f64,
) -> bool {
    match resolve_point(surface, x, y) {
        HitResult::Element(hit) => {
            sink.inject(InjectedEvent {
                device: device.clone(),
                kind: EventKind::Hover,
                target: hit.target,
                x: hit.local_x,
                y: hit.local_y,
            });
            true
        }
        _ => false,
    }
}
