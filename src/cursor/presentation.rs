//! Cursor presentation
//!
//! Pure cursor state is turned into a [`CursorFrame`] once per display frame
//! and handed to a [`CursorRenderer`]. The engine never touches a rendering
//! surface directly. Calibration guidance and activity updates go through the
//! same seam.

use serde::Serialize;
use std::fmt;

use crate::activity::ActivityReport;
use crate::calibration::CalibrationReport;
use crate::device::DeviceId;

/// Why a cursor is or is not shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CursorVisibility {
    /// Authoritative and drawn
    #[default]
    Visible,
    /// Hidden because another device holds priority
    Suppressed,
    /// No samples since the last disconnect
    Disconnected,
}

impl CursorVisibility {
    /// Whether the cursor should be drawn
    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible)
    }
}

impl fmt::Display for CursorVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => write!(f, "Visible"),
            Self::Suppressed => write!(f, "Suppressed"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Everything a renderer needs to draw one device's cursor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CursorFrame {
    /// Device the cursor belongs to
    pub device: DeviceId,
    /// Rendered X (magnet-adjusted)
    pub x: f64,
    /// Rendered Y (magnet-adjusted)
    pub y: f64,
    /// Visibility state
    pub visibility: CursorVisibility,
    /// Button held
    pub pressed: bool,
    /// Position snapped to an interactive target
    pub magnet_active: bool,
    /// Dwell ring progress in [0, 1], when dwelling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dwell_progress: Option<f64>,
}

/// Presentation seam: draws cursor frames and configuration feedback
#[cfg_attr(test, mockall::automock)]
pub trait CursorRenderer {
    /// Draw one cursor for the current display frame
    fn render(&mut self, frame: &CursorFrame);

    /// Show calibration guidance
    fn calibration(&mut self, _report: &CalibrationReport) {}

    /// Show an activity launch, progress or close
    fn activity(&mut self, _report: &ActivityReport) {}
}

/// Renderer that discards everything, for headless operation
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl CursorRenderer for NullRenderer {
    fn render(&mut self, _frame: &CursorFrame) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_flags() {
        assert!(CursorVisibility::Visible.is_visible());
        assert!(!CursorVisibility::Suppressed.is_visible());
        assert!(!CursorVisibility::Disconnected.is_visible());
        assert_eq!(CursorVisibility::default(), CursorVisibility::Visible);
    }

    #[test]
    fn test_frame_serialisation_omits_idle_dwell() {
        let frame = CursorFrame {
            device: DeviceId::new("Arm"),
            x: 1.0,
            y: 2.0,
            visibility: CursorVisibility::Suppressed,
            pressed: false,
            magnet_active: false,
            dwell_progress: None,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["visibility"], "suppressed");
        assert!(json.get("dwell_progress").is_none());
    }
}
