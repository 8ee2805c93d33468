//! Device Arbitration
//!
//! When both wearables are live only one cursor may inject hover and click
//! events. The secondary device (the glove) takes priority for a fixed
//! window after each packet in which it moved more than a small threshold;
//! the primary device (the arm) is suppressed while that window is open.
//!
//! ```text
//! glove motion ─┬─ > threshold ──> priority_until = now + window
//!               └─ ≤ threshold ──> (no change)
//!
//! arm suppressed  ⇔  now < priority_until
//! ```
//!
//! There is no lock object: the window is re-armed by every qualifying
//! packet and expires on its own.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::device::{DeviceId, ARM, GLOVE};

/// Arbitration policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrationConfig {
    /// Enable arbitration (false = every cursor always active)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Device that yields
    #[serde(default = "default_primary")]
    pub primary: String,

    /// Device that asserts priority
    #[serde(default = "default_secondary")]
    pub secondary: String,

    /// Priority window after qualifying motion (ms)
    #[serde(default = "default_window_ms")]
    pub priority_window_ms: u64,

    /// Minimum per-packet target displacement that counts as motion (pixels)
    #[serde(default = "default_motion_threshold")]
    pub motion_threshold_px: f64,
}

fn default_true() -> bool {
    true
}
fn default_primary() -> String {
    ARM.to_string()
}
fn default_secondary() -> String {
    GLOVE.to_string()
}
fn default_window_ms() -> u64 {
    2000
}
fn default_motion_threshold() -> f64 {
    2.0
}

impl Default for ArbitrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            primary: default_primary(),
            secondary: default_secondary(),
            priority_window_ms: default_window_ms(),
            motion_threshold_px: default_motion_threshold(),
        }
    }
}

/// Mutual-exclusion timer between the primary and secondary device
#[derive(Debug, Clone)]
pub struct DeviceArbiter {
    enabled: bool,
    primary: DeviceId,
    secondary: DeviceId,
    window: Duration,
    threshold: f64,
    priority_until: Option<Instant>,
}

impl DeviceArbiter {
    /// Create an arbiter from configuration
    pub fn new(config: &ArbitrationConfig) -> Self {
        Self {
            enabled: config.enabled,
            primary: DeviceId::new(config.primary.as_str()),
            secondary: DeviceId::new(config.secondary.as_str()),
            window: Duration::from_millis(config.priority_window_ms),
            threshold: config.motion_threshold_px,
            priority_until: None,
        }
    }

    /// Record a device's per-packet motion
    ///
    /// Returns true when this packet (re-)armed the priority window.
    pub fn note_motion(&mut self, device: &DeviceId, displacement: f64, now: Instant) -> bool {
        if !self.enabled || *device != self.secondary || displacement <= self.threshold {
            return false;
        }

        if !self.window_open(now) {
            debug!(
                "{} asserts cursor priority over {} for {:?}",
                self.secondary, self.primary, self.window
            );
        }
        self.priority_until = Some(now + self.window);
        true
    }

    /// Whether a device's hover and click injection is currently suppressed
    pub fn is_suppressed(&self, device: &DeviceId, now: Instant) -> bool {
        self.enabled && *device == self.primary && self.window_open(now)
    }

    /// When the current priority window closes, if one is open
    pub fn priority_until(&self, now: Instant) -> Option<Instant> {
        self.priority_until.filter(|until| now < *until)
    }

    /// Drop any open window (transport disconnect)
    pub fn reset(&mut self) {
        self.priority_until = None;
    }

    fn window_open(&self, now: Instant) -> bool {
        self.priority_until.is_some_and(|until| now < until)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arbiter() -> DeviceArbiter {
        DeviceArbiter::new(&ArbitrationConfig::default())
    }

    #[test]
    fn test_glove_motion_suppresses_arm_for_window() {
        let mut arb = arbiter();
        let arm = DeviceId::new(ARM);
        let glove = DeviceId::new(GLOVE);
        let t0 = Instant::now();

        assert!(!arb.is_suppressed(&arm, t0));
        assert!(arb.note_motion(&glove, 10.0, t0));
        assert!(arb.is_suppressed(&arm, t0 + Duration::from_millis(1999)));
        assert!(!arb.is_suppressed(&arm, t0 + Duration::from_millis(2000)));
        assert!(!arb.is_suppressed(&glove, t0));
    }

    #[test]
    fn test_window_rearmed_by_each_packet() {
        let mut arb = arbiter();
        let arm = DeviceId::new(ARM);
        let glove = DeviceId::new(GLOVE);
        let t0 = Instant::now();

        arb.note_motion(&glove, 10.0, t0);
        arb.note_motion(&glove, 10.0, t0 + Duration::from_millis(1500));
        assert!(arb.is_suppressed(&arm, t0 + Duration::from_millis(3000)));
        assert!(!arb.is_suppressed(&arm, t0 + Duration::from_millis(3500)));
    }

    #[test]
    fn test_small_motion_and_arm_motion_ignored() {
        let mut arb = arbiter();
        let arm = DeviceId::new(ARM);
        let glove = DeviceId::new(GLOVE);
        let t0 = Instant::now();

        assert!(!arb.note_motion(&glove, 1.0, t0));
        assert!(!arb.note_motion(&arm, 500.0, t0));
        assert!(!arb.is_suppressed(&arm, t0));
        assert_eq!(arb.priority_until(t0), None);
    }

    #[test]
    fn test_disabled_never_suppresses() {
        let config = ArbitrationConfig {
            enabled: false,
            ..ArbitrationConfig::default()
        };
        let mut arb = DeviceArbiter::new(&config);
        let t0 = Instant::now();
        arb.note_motion(&DeviceId::new(GLOVE), 100.0, t0);
        assert!(!arb.is_suppressed(&DeviceId::new(ARM), t0));
    }
}
