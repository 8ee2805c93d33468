//! Packet Ingestion
//!
//! Parses inbound transport frames into validated per-device samples.
//!
//! A frame is a JSON text message holding either one sample object or an
//! array of them (several devices multiplexed into one frame). Samples are
//! validated one at a time: a bad element is dropped without affecting its
//! siblings, and a frame that is not JSON at all yields no samples.
//!
//! # Wire Format
//!
//! ```text
//! {"device":"Glove","x":12.5,"y":-3.0,"z":181.2,
//!  "gx":12,"gy":-980,"gz":140,"lax":0,"lay":310,"laz":-20,
//!  "b1":0,"b2":"1"}
//! ```
//!
//! Firmware variants disagree on units and types, so ingestion normalises:
//! - gravity in milli-g integers is scaled down to g (see [`GRAVITY_AUTOSCALE_LIMIT`])
//! - `b1`/`b2` may be booleans, numbers or strings

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::trace;

/// Any gravity component above this magnitude marks the vector as milli-g
pub const GRAVITY_AUTOSCALE_LIMIT: f64 = 4.0;

/// Divisor applied to all three gravity components when autoscaling
pub const GRAVITY_AUTOSCALE_DIVISOR: f64 = 1000.0;

/// Identifier of one physical wearable ("Arm", "Glove", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Create a device id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Three-component vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Construct a vector
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Dot product
    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Sum of absolute components
    pub fn abs_sum(&self) -> f64 {
        self.x.abs() + self.y.abs() + self.z.abs()
    }
}

/// One validated motion packet from a device
///
/// Transient: produced by ingestion and consumed by the pipeline immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSample {
    /// Source device
    pub device: DeviceId,
    /// Orientation angles in degrees
    pub orientation: Vec3,
    /// Gravity vector in g (already autoscaled)
    pub gravity: Vec3,
    /// Linear acceleration, raw firmware units
    pub linear_accel: Vec3,
    /// Primary button (click intent)
    pub button: bool,
    /// Liveness flag reported by the device
    pub liveness: bool,
}

/// Device status derived from a sample, shown by the status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// No liveness flag and no in-plane motion
    Offline,
    /// Alive, button released
    Online,
    /// Alive, button held
    Clicking,
}

impl DeviceSample {
    /// Evaluate the device status for this packet
    ///
    /// A device counts as online when it reports liveness OR either in-plane
    /// axis is non-zero. Some firmware never sets the liveness flag.
    pub fn status(&self) -> DeviceStatus {
        let has_motion = self.orientation.x.abs() > 0.0 || self.orientation.y.abs() > 0.0;
        if !(self.liveness || has_motion) {
            DeviceStatus::Offline
        } else if self.button {
            DeviceStatus::Clicking
        } else {
            DeviceStatus::Online
        }
    }
}

/// Raw sample object exactly as it arrives on the wire
#[derive(Debug, Default, Deserialize)]
struct RawSample {
    #[serde(default)]
    device: Option<Value>,
    #[serde(default)]
    x: Option<Value>,
    #[serde(default)]
    y: Option<Value>,
    #[serde(default)]
    z: Option<Value>,
    #[serde(default)]
    gx: Option<Value>,
    #[serde(default)]
    gy: Option<Value>,
    #[serde(default)]
    gz: Option<Value>,
    #[serde(default)]
    lax: Option<Value>,
    #[serde(default)]
    lay: Option<Value>,
    #[serde(default)]
    laz: Option<Value>,
    #[serde(default)]
    b1: Option<Value>,
    #[serde(default)]
    b2: Option<Value>,
}

/// Parse one transport frame into zero or more samples
///
/// Malformed frames and malformed elements are dropped silently; the
/// returned count of dropped elements is for metrics only.
pub fn parse_frame(text: &str) -> ParsedFrame {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            trace!("Dropping unparseable frame: {}", e);
            return ParsedFrame {
                samples: Vec::new(),
                dropped: 1,
            };
        }
    };

    let elements = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    let mut parsed = ParsedFrame {
        samples: Vec::with_capacity(elements.len()),
        dropped: 0,
    };

    for element in elements {
        match parse_sample(element) {
            Some(sample) => parsed.samples.push(sample),
            None => parsed.dropped += 1,
        }
    }

    parsed
}

/// Result of [`parse_frame`]
#[derive(Debug, Default)]
pub struct ParsedFrame {
    /// Valid samples in delivery order
    pub samples: Vec<DeviceSample>,
    /// Number of rejected elements
    pub dropped: usize,
}

fn parse_sample(value: Value) -> Option<DeviceSample> {
    let raw: RawSample = serde_json::from_value(value).ok()?;

    let device = match raw.device {
        Some(Value::String(s)) if !s.is_empty() => DeviceId::new(s),
        _ => {
            trace!("Dropping sample without device id");
            return None;
        }
    };

    let orientation = Vec3::new(
        finite(raw.x.as_ref())?,
        finite(raw.y.as_ref())?,
        finite(raw.z.as_ref())?,
    );

    let gravity = autoscale_gravity(Vec3::new(
        finite(raw.gx.as_ref()).unwrap_or(0.0),
        finite(raw.gy.as_ref()).unwrap_or(0.0),
        finite(raw.gz.as_ref()).unwrap_or(0.0),
    ));

    let linear_accel = Vec3::new(
        finite(raw.lax.as_ref()).unwrap_or(0.0),
        finite(raw.lay.as_ref()).unwrap_or(0.0),
        finite(raw.laz.as_ref()).unwrap_or(0.0),
    );

    Some(DeviceSample {
        device,
        orientation,
        gravity,
        linear_accel,
        button: truthy(raw.b1.as_ref()),
        liveness: liveness_flag(raw.b2.as_ref()),
    })
}

/// Normalise gravity reported in milli-g to g
///
/// Applied to the whole vector: if any component exceeds the limit, all
/// three are divided, never a single axis.
pub fn autoscale_gravity(g: Vec3) -> Vec3 {
    if g.x.abs() > GRAVITY_AUTOSCALE_LIMIT
        || g.y.abs() > GRAVITY_AUTOSCALE_LIMIT
        || g.z.abs() > GRAVITY_AUTOSCALE_LIMIT
    {
        Vec3::new(
            g.x / GRAVITY_AUTOSCALE_DIVISOR,
            g.y / GRAVITY_AUTOSCALE_DIVISOR,
            g.z / GRAVITY_AUTOSCALE_DIVISOR,
        )
    } else {
        g
    }
}

fn finite(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|v| v.is_finite())
}

/// Button state: `true`, any non-zero number, `"1"` or `"true"`
fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true"),
        _ => false,
    }
}

/// Liveness flag: equal to one in either numeric or string form
fn liveness_flag(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64() == Some(1.0),
        Some(Value::String(s)) => s.trim() == "1",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_object_frame() {
        let parsed = parse_frame(r#"{"device":"Arm","x":1.5,"y":2,"z":-3,"b1":1}"#);
        assert_eq!(parsed.samples.len(), 1);
        assert_eq!(parsed.dropped, 0);

        let sample = &parsed.samples[0];
        assert_eq!(sample.device.as_str(), "Arm");
        assert_eq!(sample.orientation, Vec3::new(1.5, 2.0, -3.0));
        assert!(sample.button);
        assert_eq!(sample.gravity, Vec3::default());
    }

    #[test]
    fn test_array_frame_keeps_order_and_drops_bad_elements() {
        let parsed = parse_frame(
            r#"[{"device":"Arm","x":1,"y":0,"z":0},
                {"x":1,"y":2,"z":3},
                {"device":"Glove","x":"nan","y":0,"z":0},
                {"device":"Glove","x":4,"y":5,"z":6}]"#,
        );
        assert_eq!(parsed.dropped, 2);
        let ids: Vec<_> = parsed.samples.iter().map(|s| s.device.as_str()).collect();
        assert_eq!(ids, vec!["Arm", "Glove"]);
    }

    #[test]
    fn test_unparseable_frame_is_dropped() {
        let parsed = parse_frame("{not json");
        assert!(parsed.samples.is_empty());
        assert_eq!(parsed.dropped, 1);
    }

    #[test]
    fn test_missing_primary_axis_is_dropped() {
        let parsed = parse_frame(r#"{"device":"Arm","x":1,"z":0}"#);
        assert!(parsed.samples.is_empty());
    }

    #[test]
    fn test_gravity_autoscale_milli_units() {
        let parsed = parse_frame(r#"{"device":"Arm","x":0,"y":0,"z":0,"gx":1200,"gy":0.5,"gz":-3}"#);
        let g = parsed.samples[0].gravity;
        assert!((g.x - 1.2).abs() < 1e-9);
        assert!((g.y - 0.0005).abs() < 1e-12);
        assert!((g.z + 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_gravity_in_g_left_unscaled() {
        let g = autoscale_gravity(Vec3::new(0.8, -0.2, 0.5));
        assert_eq!(g, Vec3::new(0.8, -0.2, 0.5));
    }

    #[test]
    fn test_liveness_flag_accepts_number_and_string() {
        assert!(liveness_flag(Some(&Value::from(1))));
        assert!(liveness_flag(Some(&Value::from("1"))));
        assert!(liveness_flag(Some(&Value::from(true))));
        assert!(!liveness_flag(Some(&Value::from(2))));
        assert!(!liveness_flag(Some(&Value::from("0"))));
        assert!(!liveness_flag(None));
    }

    #[test]
    fn test_status_permissive_online() {
        let parsed = parse_frame(r#"{"device":"Glove","x":0,"y":0.2,"z":0,"b2":0}"#);
        assert_eq!(parsed.samples[0].status(), DeviceStatus::Online);

        let parsed = parse_frame(r#"{"device":"Glove","x":0,"y":0,"z":5,"b2":"1","b1":true}"#);
        assert_eq!(parsed.samples[0].status(), DeviceStatus::Clicking);

        let parsed = parse_frame(r#"{"device":"Glove","x":0,"y":0,"z":5}"#);
        assert_eq!(parsed.samples[0].status(), DeviceStatus::Offline);
    }
}
