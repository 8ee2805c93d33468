//! Guided calibration
//!
//! Five-step, linear state machine recording directional extrema for
//! absolute-mode normalisation:
//!
//! ```text
//! CENTER ──next──> TOP ──next──> BOTTOM ──next──> LEFT ──next──> RIGHT ──next──> commit
//!    │              │              │               │              │
//!    └──────────────┴───── cancel (restore previous record) ──────┘
//! ```
//!
//! Each `next` records the device's latest mixed position for the current
//! step. Extents are staged inside the run and written to the profile's
//! [`CalibrationData`] only when the final step completes.
//!
//! Step-to-field mapping is fixed: TOP writes `min_y`, BOTTOM `max_y`,
//! LEFT `min_x`, RIGHT `max_x`. Existing calibration data depends on it.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::device::{CalibrationData, DeviceId};

/// Calibration step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CalibrationStep {
    /// Neutral pose
    Center,
    /// Point at the top edge
    Top,
    /// Point at the bottom edge
    Bottom,
    /// Point at the left edge
    Left,
    /// Point at the right edge
    Right,
}

impl CalibrationStep {
    /// Steps in run order
    pub const SEQUENCE: [CalibrationStep; 5] = [
        CalibrationStep::Center,
        CalibrationStep::Top,
        CalibrationStep::Bottom,
        CalibrationStep::Left,
        CalibrationStep::Right,
    ];

    /// Step for an index in `[0, 5)`
    pub fn from_index(index: usize) -> Option<Self> {
        Self::SEQUENCE.get(index).copied()
    }
}

impl fmt::Display for CalibrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Center => "CENTER",
            Self::Top => "TOP",
            Self::Bottom => "BOTTOM",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        };
        f.write_str(name)
    }
}

/// Result of advancing a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepResult {
    /// Recorded; the run continues at the contained step
    Advanced(CalibrationStep),
    /// Final step recorded; the returned record is ready to commit
    Completed(CalibrationData),
    /// No mixed position has been observed yet; nothing recorded
    NoPosition,
}

/// Calibration event shown to the configuration UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPhase {
    /// Run started, waiting on CENTER
    Started,
    /// Live position update for the current step
    Observing,
    /// A step was recorded
    Recorded,
    /// `next` refused: no motion data yet
    NoPosition,
    /// Final step recorded and committed
    Completed,
    /// Run aborted, previous record restored
    Canceled,
}

/// Guidance snapshot of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    /// Device being calibrated
    pub device: DeviceId,
    /// What happened
    pub phase: CalibrationPhase,
    /// Step the user should perform next; absent once the run is over
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<CalibrationStep>,
    /// Steps recorded so far
    pub steps_recorded: usize,
    /// Latest mixed position
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live: Option<(f64, f64)>,
    /// Committed record, on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<CalibrationData>,
}

/// An in-progress guided calibration
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationRun {
    device: DeviceId,
    step_index: usize,
    recorded_center: (f64, f64),
    staged: CalibrationData,
    previous: CalibrationData,
    live_position: Option<(f64, f64)>,
}

impl CalibrationRun {
    /// Begin a run for a device
    ///
    /// `previous` is the profile's calibration record before the run, kept so
    /// a cancel can restore it.
    pub fn start(device: DeviceId, previous: CalibrationData) -> Self {
        info!("Started calibration for {}", device);
        Self {
            device,
            step_index: 0,
            recorded_center: (0.0, 0.0),
            staged: CalibrationData::default(),
            previous,
            live_position: None,
        }
    }

    /// Device being calibrated
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Current step
    pub fn step(&self) -> CalibrationStep {
        CalibrationStep::from_index(self.step_index).unwrap_or(CalibrationStep::Right)
    }

    /// Index of the current step in `[0, 5)`
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Center recorded by step 0
    pub fn recorded_center(&self) -> (f64, f64) {
        self.recorded_center
    }

    /// Latest mixed position, exposed for guidance UI
    pub fn live_position(&self) -> Option<(f64, f64)> {
        self.live_position
    }

    /// Calibration record to restore on cancel
    pub fn previous(&self) -> CalibrationData {
        self.previous
    }

    /// Snapshot for the configuration UI
    pub fn report(&self, phase: CalibrationPhase) -> CalibrationReport {
        let finished = matches!(phase, CalibrationPhase::Completed | CalibrationPhase::Canceled);
        CalibrationReport {
            device: self.device.clone(),
            phase,
            step: if finished { None } else { CalibrationStep::from_index(self.step_index) },
            steps_recorded: self.step_index,
            live: self.live_position,
            record: None,
        }
    }

    /// Feed the device's mixed position from the pipeline
    pub fn observe(&mut self, mixed_x: f64, mixed_y: f64) {
        self.live_position = Some((mixed_x, mixed_y));
    }

    /// Record the current step and move to the next
    pub fn advance(&mut self) -> StepResult {
        let Some((x, y)) = self.live_position else {
            warn!(
                "Calibration step {} for {}: no motion data yet",
                self.step(),
                self.device
            );
            return StepResult::NoPosition;
        };

        let (cx, cy) = self.recorded_center;
        let step = self.step();
        match step {
            CalibrationStep::Center => self.recorded_center = (x, y),
            CalibrationStep::Top => self.staged.min_y = y - cy,
            CalibrationStep::Bottom => self.staged.max_y = y - cy,
            CalibrationStep::Left => self.staged.min_x = x - cx,
            CalibrationStep::Right => self.staged.max_x = x - cx,
        }
        debug!(
            "Calibration {} recorded {} at ({:.2}, {:.2})",
            self.device, step, x, y
        );

        self.step_index += 1;
        match CalibrationStep::from_index(self.step_index) {
            Some(next) => StepResult::Advanced(next),
            None => {
                let (cx, cy) = self.recorded_center;
                let record = CalibrationData {
                    active: true,
                    center_x: cx,
                    center_y: cy,
                    ..self.staged
                };
                info!(
                    "Calibration complete for {}: x=[{:.2}, {:.2}] y=[{:.2}, {:.2}]",
                    self.device, record.min_x, record.max_x, record.min_y, record.max_y
                );
                StepResult::Completed(record)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_through(points: &[(f64, f64)]) -> Vec<StepResult> {
        let mut run = CalibrationRun::start(DeviceId::new("Arm"), CalibrationData::default());
        points
            .iter()
            .map(|&(x, y)| {
                run.observe(x, y);
                run.advance()
            })
            .collect()
    }

    #[test]
    fn test_full_run_records_extents() {
        let results = run_through(&[
            (100.0, 100.0),
            (100.0, 60.0),
            (100.0, 150.0),
            (40.0, 100.0),
            (170.0, 100.0),
        ]);

        assert_eq!(results[0], StepResult::Advanced(CalibrationStep::Top));
        assert_eq!(results[3], StepResult::Advanced(CalibrationStep::Right));
        let StepResult::Completed(record) = results[4] else {
            panic!("run should complete on step 4");
        };
        assert!(record.active);
        assert_eq!(record.min_y, -40.0);
        assert_eq!(record.max_y, 50.0);
        assert_eq!(record.min_x, -60.0);
        assert_eq!(record.max_x, 70.0);
        assert_eq!((record.center_x, record.center_y), (100.0, 100.0));
    }

    #[test]
    fn test_advance_without_position_does_not_move() {
        let mut run = CalibrationRun::start(DeviceId::new("Glove"), CalibrationData::default());
        assert_eq!(run.advance(), StepResult::NoPosition);
        assert_eq!(run.step(), CalibrationStep::Center);
        assert_eq!(run.step_index(), 0);
    }

    #[test]
    fn test_report_tracks_progress() {
        let mut run = CalibrationRun::start(DeviceId::new("Arm"), CalibrationData::default());
        let report = run.report(CalibrationPhase::Started);
        assert_eq!(report.step, Some(CalibrationStep::Center));
        assert_eq!(report.steps_recorded, 0);
        assert_eq!(report.live, None);

        run.observe(3.0, -4.0);
        run.advance();
        let report = run.report(CalibrationPhase::Recorded);
        assert_eq!(report.step, Some(CalibrationStep::Top));
        assert_eq!(report.steps_recorded, 1);
        assert_eq!(report.live, Some((3.0, -4.0)));

        let json = serde_json::to_value(run.report(CalibrationPhase::Canceled)).unwrap();
        assert_eq!(json["phase"], "canceled");
        assert!(json.get("step").is_none());
        assert_eq!(json["live"][1], -4.0);
    }

    #[test]
    fn test_step_order() {
        let names: Vec<String> = CalibrationStep::SEQUENCE
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, ["CENTER", "TOP", "BOTTOM", "LEFT", "RIGHT"]);
        assert_eq!(CalibrationStep::from_index(5), None);
    }
}
