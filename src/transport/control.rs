//! Control commands
//!
//! The configuration UI drives calibration and profile edits with one JSON
//! object per line, tagged by `type`:
//!
//! ```json
//! {"type":"startCalibration","device":"Arm"}
//! {"type":"nextCalibrationStep"}
//! {"type":"cycleMix","device":"Glove","output":"x","input":"z"}
//! {"type":"setViewport","width":1280,"height":720}
//! {"type":"launchActivity","url":"games/honey-bee.html","title":"Honey Bee","reps":8}
//! {"type":"updateStats","score":120,"reps":4,"sets":2}
//! ```

use serde::{Deserialize, Serialize};

use crate::activity::{ActivityLaunch, ProgressEvent};
use crate::device::{DeviceId, DeviceProfile, InputAxis, OutputAxis};

/// One command from the configuration collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlCommand {
    /// Begin guided calibration for a device
    StartCalibration {
        /// Device to calibrate
        device: DeviceId,
    },
    /// Record the current calibration step
    NextCalibrationStep,
    /// Abort calibration, restoring the previous record
    CancelCalibration,
    /// Move every cursor back to the viewport center
    ResetCenter,
    /// Cycle one mixing cell
    CycleMix {
        /// Device whose matrix changes
        device: DeviceId,
        /// Matrix row
        output: OutputAxis,
        /// Matrix column
        input: InputAxis,
    },
    /// Replace a device profile
    SetProfile {
        /// Device
        device: DeviceId,
        /// New profile
        profile: Box<DeviceProfile>,
    },
    /// Viewport resized
    SetViewport {
        /// Width in pixels
        width: f64,
        /// Height in pixels
        height: f64,
    },
    /// Persist profiles now
    SaveProfiles,
    /// Restore default profiles
    FactoryReset,
    /// Start an exercise activity
    LaunchActivity(ActivityLaunch),
    /// Progress message forwarded from the activity frame
    UpdateStats(ProgressEvent),
    /// Close the running activity
    CloseActivity,
}

impl ControlCommand {
    /// Parse one line; blank lines yield `None`
    pub fn parse_line(line: &str) -> Option<serde_json::Result<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        Some(serde_json::from_str(line))
    }

    /// Whether the command edits profile data
    pub fn mutates_profiles(&self) -> bool {
        matches!(
            self,
            Self::CycleMix { .. } | Self::SetProfile { .. } | Self::FactoryReset
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let cmd = ControlCommand::parse_line(r#"{"type":"startCalibration","device":"Arm"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            ControlCommand::StartCalibration {
                device: DeviceId::new("Arm")
            }
        );

        let cmd =
            ControlCommand::parse_line(r#"{"type":"cycleMix","device":"Glove","output":"x","input":"laz"}"#)
                .unwrap()
                .unwrap();
        assert_eq!(
            cmd,
            ControlCommand::CycleMix {
                device: DeviceId::new("Glove"),
                output: OutputAxis::X,
                input: InputAxis::Laz,
            }
        );
        assert!(cmd.mutates_profiles());

        let cmd = ControlCommand::parse_line(r#"{"type":"nextCalibrationStep"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(cmd, ControlCommand::NextCalibrationStep);
    }

    #[test]
    fn test_set_profile_uses_profile_layout() {
        let line = r#"{"type":"setProfile","device":"Arm","profile":{"gyroScale":20,"useRelativeMode":true}}"#;
        let Some(Ok(ControlCommand::SetProfile { device, profile })) =
            ControlCommand::parse_line(line)
        else {
            panic!("setProfile did not parse");
        };
        assert_eq!(device, DeviceId::new("Arm"));
        assert_eq!(profile.gyro_scale, 20.0);
        assert!(profile.use_relative_mode);
        assert_eq!(profile.deadzone, 200.0);
    }

    #[test]
    fn test_activity_commands() {
        let Some(Ok(ControlCommand::LaunchActivity(launch))) = ControlCommand::parse_line(
            r#"{"type":"launchActivity","url":"cookout.html","title":"Cookout","reps":8}"#,
        ) else {
            panic!("launchActivity did not parse");
        };
        assert_eq!(launch.reps, 8);
        assert_eq!(launch.sets, 3);

        let cmd = ControlCommand::parse_line(r#"{"type":"updateStats","score":120,"reps":"4","sets":2}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            cmd,
            ControlCommand::UpdateStats(ProgressEvent {
                score: 120,
                reps: 4,
                sets: 2
            })
        );
        assert!(!cmd.mutates_profiles());
    }

    #[test]
    fn test_blank_and_malformed() {
        assert!(ControlCommand::parse_line("   ").is_none());
        assert!(ControlCommand::parse_line("{\"type\":\"launchRocket\"}")
            .unwrap()
            .is_err());
    }
}
