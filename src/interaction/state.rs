//! Per-device click state machine
//!
//! ```text
//!            b1 rising edge (click)
//!   IDLE ───────────────────────────> PRESSED
//!    │  ▲                                │
//!    │  │ target → none                  │ b1 falling edge
//!    │  │ dwell fired (target latched)   ▼
//!    └──┴─ target changed ──> DWELLING <─┘ (dwell re-evaluated)
//! ```
//!
//! Dwell timers are deadlines. The owner polls [`InteractionState::poll`]
//! with the current time; nothing here sleeps or spawns.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

use super::hit_test::ElementRef;

/// Observable state of one device's interaction machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionPhase {
    /// No button held, no dwell pending
    Idle,
    /// Dwell timer running on a target
    Dwelling,
    /// Physical button held
    Pressed,
}

impl fmt::Display for InteractionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Dwelling => write!(f, "DWELLING"),
            Self::Pressed => write!(f, "PRESSED"),
        }
    }
}

/// What triggered a click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickSource {
    /// Button rising edge
    Physical,
    /// Dwell timer expiry
    Dwell,
}

/// Click the owner should execute, subject to debounce
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickRequest {
    /// Viewport X
    pub x: f64,
    /// Viewport Y
    pub y: f64,
    /// Trigger
    pub source: ClickSource,
}

/// Interaction state for one device
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    pressed: bool,
    dwell_target: Option<ElementRef>,
    dwell_started: Option<Instant>,
    dwell_deadline: Option<Instant>,
    dwell_position: (f64, f64),
    last_click: Option<Instant>,
}

impl InteractionState {
    /// Fresh idle state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase
    pub fn phase(&self) -> InteractionPhase {
        if self.pressed {
            InteractionPhase::Pressed
        } else if self.dwell_deadline.is_some() {
            InteractionPhase::Dwelling
        } else {
            InteractionPhase::Idle
        }
    }

    /// Target the dwell timer is running on, or latched on after firing
    pub fn dwell_target(&self) -> Option<&ElementRef> {
        self.dwell_target.as_ref()
    }

    /// Pending dwell expiry
    pub fn deadline(&self) -> Option<Instant> {
        self.dwell_deadline
    }

    /// Button held
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Feed one packet's button state
    ///
    /// A rising edge cancels any dwell and requests a click at `position`.
    pub fn update_button(&mut self, button: bool, position: (f64, f64)) -> Option<ClickRequest> {
        match (self.pressed, button) {
            (false, true) => {
                self.pressed = true;
                self.cancel_dwell();
                Some(ClickRequest {
                    x: position.0,
                    y: position.1,
                    source: ClickSource::Physical,
                })
            }
            (true, false) => {
                self.pressed = false;
                None
            }
            _ => None,
        }
    }

    /// Re-evaluate dwell against the interactive target under the cursor
    ///
    /// Ignored while the button is held. A changed target cancels the running
    /// timer and, when the new target exists, starts a fresh one.
    pub fn update_dwell(
        &mut self,
        target: Option<&ElementRef>,
        position: (f64, f64),
        dwell: Duration,
        now: Instant,
    ) {
        if self.pressed || self.dwell_target.as_ref() == target {
            return;
        }

        self.cancel_dwell();
        if let Some(target) = target {
            debug!("Dwell started on {} ({:?})", target, dwell);
            self.dwell_target = Some(target.clone());
            self.dwell_started = Some(now);
            self.dwell_deadline = Some(now + dwell);
            self.dwell_position = position;
        }
    }

    /// Fire an expired dwell timer
    ///
    /// The target stays latched so the same element needs the cursor to
    /// leave and return before it can dwell-click again.
    pub fn poll(&mut self, now: Instant) -> Option<ClickRequest> {
        let deadline = self.dwell_deadline?;
        if now < deadline {
            return None;
        }

        self.dwell_deadline = None;
        self.dwell_started = None;
        if let Some(target) = &self.dwell_target {
            debug!("Dwell fired on {}", target);
        }
        Some(ClickRequest {
            x: self.dwell_position.0,
            y: self.dwell_position.1,
            source: ClickSource::Dwell,
        })
    }

    /// Dwell ring progress in [0, 1]
    pub fn dwell_progress(&self, now: Instant) -> Option<f64> {
        let started = self.dwell_started?;
        let deadline = self.dwell_deadline?;
        let total = deadline.saturating_duration_since(started).as_secs_f64();
        if total <= 0.0 {
            return Some(1.0);
        }
        let elapsed = now.saturating_duration_since(started).as_secs_f64();
        Some((elapsed / total).clamp(0.0, 1.0))
    }

    /// Debounce gate shared by every click source
    ///
    /// Returns true and records the click when the debounce window since the
    /// last accepted click has passed.
    pub fn accept_click(&mut self, now: Instant, debounce: Duration) -> bool {
        if let Some(last) = self.last_click {
            if now.saturating_duration_since(last) < debounce {
                return false;
            }
        }
        self.last_click = Some(now);
        true
    }

    /// Cancel any pending dwell and forget its target
    pub fn cancel_dwell(&mut self) {
        if self.dwell_deadline.is_some() {
            debug!("Dwell canceled");
        }
        self.dwell_target = None;
        self.dwell_started = None;
        self.dwell_deadline = None;
    }

    /// Drop button and dwell state (disconnect)
    pub fn reset(&mut self) {
        self.cancel_dwell();
        self.pressed = false;
    }
}
