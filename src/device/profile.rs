//! Device profile types
//!
//! Per-device tuning: the 2x6 ternary mixing matrix, scales, deadzone,
//! smoothing, mode flags and calibration extents. Field names serialise in
//! camelCase so persisted profiles keep the layout the configuration tool
//! writes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::sample::DeviceId;

/// Device that asserts cursor priority by default
pub const GLOVE: &str = "Glove";

/// Device whose cursor yields to the glove by default
pub const ARM: &str = "Arm";

/// Ternary mixing coefficient
///
/// Coefficients are toggled, never dialled: each cell of the matrix is
/// either off or routes its input with a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Coefficient {
    /// -1
    Negative,
    /// 0
    #[default]
    Off,
    /// +1
    Positive,
}

impl Coefficient {
    /// Numeric weight
    pub fn weight(self) -> f64 {
        match self {
            Self::Negative => -1.0,
            Self::Off => 0.0,
            Self::Positive => 1.0,
        }
    }

    /// Next state of the toggle: 0 → 1 → -1 → 0
    pub fn cycle(self) -> Self {
        match self {
            Self::Off => Self::Positive,
            Self::Positive => Self::Negative,
            Self::Negative => Self::Off,
        }
    }
}

impl TryFrom<i8> for Coefficient {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Negative),
            0 => Ok(Self::Off),
            1 => Ok(Self::Positive),
            other => Err(format!("mixing coefficient must be -1, 0 or 1 (got {})", other)),
        }
    }
}

impl From<Coefficient> for i8 {
    fn from(value: Coefficient) -> Self {
        match value {
            Coefficient::Negative => -1,
            Coefficient::Off => 0,
            Coefficient::Positive => 1,
        }
    }
}

/// Input channel of the mixing matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputAxis {
    /// Orientation X
    X,
    /// Orientation Y
    Y,
    /// Orientation Z (yaw)
    Z,
    /// Linear acceleration X
    Lax,
    /// Linear acceleration Y
    Lay,
    /// Linear acceleration Z
    Laz,
}

impl InputAxis {
    /// All inputs in matrix order
    pub const ALL: [InputAxis; 6] = [
        InputAxis::X,
        InputAxis::Y,
        InputAxis::Z,
        InputAxis::Lax,
        InputAxis::Lay,
        InputAxis::Laz,
    ];
}

impl std::str::FromStr for InputAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            "z" => Ok(Self::Z),
            "lax" => Ok(Self::Lax),
            "lay" => Ok(Self::Lay),
            "laz" => Ok(Self::Laz),
            _ => Err(format!("Unknown input axis: {}", s)),
        }
    }
}

/// Screen axis a mixing row drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputAxis {
    /// Horizontal
    X,
    /// Vertical
    Y,
}

impl fmt::Display for OutputAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::Y => write!(f, "Y"),
        }
    }
}

/// One row of the mixing matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MixRow {
    /// Orientation X weight
    #[serde(default)]
    pub x: Coefficient,
    /// Orientation Y weight
    #[serde(default)]
    pub y: Coefficient,
    /// Orientation Z weight
    #[serde(default)]
    pub z: Coefficient,
    /// Linear acceleration X weight
    #[serde(default)]
    pub lax: Coefficient,
    /// Linear acceleration Y weight
    #[serde(default)]
    pub lay: Coefficient,
    /// Linear acceleration Z weight
    #[serde(default)]
    pub laz: Coefficient,
}

impl MixRow {
    /// Coefficient for an input
    pub fn get(&self, axis: InputAxis) -> Coefficient {
        match axis {
            InputAxis::X => self.x,
            InputAxis::Y => self.y,
            InputAxis::Z => self.z,
            InputAxis::Lax => self.lax,
            InputAxis::Lay => self.lay,
            InputAxis::Laz => self.laz,
        }
    }

    fn slot(&mut self, axis: InputAxis) -> &mut Coefficient {
        match axis {
            InputAxis::X => &mut self.x,
            InputAxis::Y => &mut self.y,
            InputAxis::Z => &mut self.z,
            InputAxis::Lax => &mut self.lax,
            InputAxis::Lay => &mut self.lay,
            InputAxis::Laz => &mut self.laz,
        }
    }

    /// Set the coefficient for an input
    pub fn set(&mut self, axis: InputAxis, value: Coefficient) {
        *self.slot(axis) = value;
    }

    /// Advance the ternary toggle for an input and return the new value
    pub fn cycle(&mut self, axis: InputAxis) -> Coefficient {
        let slot = self.slot(axis);
        *slot = slot.cycle();
        *slot
    }

    /// Weighted sum of the orientation channels
    pub fn mix_gyro(&self, x: f64, y: f64, z: f64) -> f64 {
        x * self.x.weight() + y * self.y.weight() + z * self.z.weight()
    }

    /// Weighted sum of the linear acceleration channels
    pub fn mix_accel(&self, lax: f64, lay: f64, laz: f64) -> f64 {
        lax * self.lax.weight() + lay * self.lay.weight() + laz * self.laz.weight()
    }

    /// True when no orientation channel is routed
    pub fn gyro_unmapped(&self) -> bool {
        [self.x, self.y, self.z].iter().all(|c| *c == Coefficient::Off)
    }
}

/// Absolute-mode calibration record
///
/// Extents are signed offsets from the recorded center, written once per
/// completed calibration run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationData {
    /// Set only by a completed run
    #[serde(default)]
    pub active: bool,
    /// Extent recorded at LEFT
    #[serde(default)]
    pub min_x: f64,
    /// Extent recorded at RIGHT
    #[serde(default)]
    pub max_x: f64,
    /// Extent recorded at TOP
    #[serde(default)]
    pub min_y: f64,
    /// Extent recorded at BOTTOM
    #[serde(default)]
    pub max_y: f64,
    /// Mixed position recorded at CENTER
    #[serde(default)]
    pub center_x: f64,
    /// Mixed position recorded at CENTER
    #[serde(default)]
    pub center_y: f64,
}

/// Per-device configuration read by the motion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    /// Horizontal mixing row
    #[serde(default)]
    pub mix_x: MixRow,
    /// Vertical mixing row
    #[serde(default)]
    pub mix_y: MixRow,
    /// Pixels per degree of mixed orientation
    #[serde(default = "default_gyro_scale")]
    pub gyro_scale: f64,
    /// Accelerometer gain, in hundredths relative to the gyro scale
    #[serde(default = "default_accel_scale")]
    pub accel_scale: f64,
    /// Linear acceleration deadzone, raw units
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
    /// Render interpolation factor in (0, 1]
    #[serde(default = "default_smoothing")]
    pub smoothing_factor: f64,
    /// Re-project yaw onto the gravity axis
    #[serde(default = "default_true")]
    pub dynamic_yaw: bool,
    /// Gravity lock toggle, stored for the configuration tool
    #[serde(default = "default_true")]
    pub gravity_lock: bool,
    /// Gravity lock threshold in (0, 1]
    #[serde(default = "default_gravity_threshold")]
    pub gravity_threshold: f64,
    /// Accumulate deltas instead of mapping orientation directly
    #[serde(default)]
    pub use_relative_mode: bool,
    /// Negate horizontal output
    #[serde(default)]
    pub invert_x: bool,
    /// Negate vertical output
    #[serde(default)]
    pub invert_y: bool,
    /// Absolute-mode calibration
    #[serde(default)]
    pub calibration: CalibrationData,
}

fn default_gyro_scale() -> f64 {
    15.0
}
fn default_accel_scale() -> f64 {
    5.0
}
fn default_deadzone() -> f64 {
    200.0
}
fn default_smoothing() -> f64 {
    0.2
}
fn default_true() -> bool {
    true
}
fn default_gravity_threshold() -> f64 {
    0.7
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            mix_x: MixRow::default(),
            mix_y: MixRow::default(),
            gyro_scale: default_gyro_scale(),
            accel_scale: default_accel_scale(),
            deadzone: default_deadzone(),
            smoothing_factor: default_smoothing(),
            dynamic_yaw: true,
            gravity_lock: true,
            gravity_threshold: default_gravity_threshold(),
            use_relative_mode: false,
            invert_x: false,
            invert_y: false,
            calibration: CalibrationData::default(),
        }
    }
}

impl DeviceProfile {
    /// Default profile with the device's default axis mapping applied
    pub fn for_device(device: &DeviceId) -> Self {
        let mut profile = Self::default();
        profile.apply_default_mapping(device);
        profile
    }

    /// Route the device's natural axes: glove yaw drives X, arm roll drives X,
    /// pitch drives Y for both
    pub fn apply_default_mapping(&mut self, device: &DeviceId) {
        if device.as_str() == GLOVE {
            self.mix_x.z = Coefficient::Positive;
        } else {
            self.mix_x.x = Coefficient::Positive;
        }
        self.mix_y.y = Coefficient::Positive;
    }

    /// True when neither row routes any orientation channel
    pub fn gyro_unmapped(&self) -> bool {
        self.mix_x.gyro_unmapped() && self.mix_y.gyro_unmapped()
    }

    /// Mixing row for an output axis
    pub fn row_mut(&mut self, output: OutputAxis) -> &mut MixRow {
        match output {
            OutputAxis::X => &mut self.mix_x,
            OutputAxis::Y => &mut self.mix_y,
        }
    }

    /// Smoothing factor usable by the render loop
    ///
    /// Values outside (0, 1] fall back to the default damping.
    pub fn effective_smoothing(&self) -> f64 {
        if self.smoothing_factor > 0.0 && self.smoothing_factor <= 1.0 {
            self.smoothing_factor
        } else {
            default_smoothing()
        }
    }
}
