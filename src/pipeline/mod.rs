//! Motion Pipeline
//!
//! Per-device, per-packet transform from raw orientation to a screen-space
//! target position.
//!
//! # Stages
//!
//! ```text
//! DeviceSample
//!   └─> 1. Axis selection   (absolute angles, or wrapped deltas in relative mode)
//!   └─> 2. Dynamic yaw      (z := in · gravity, only with a usable gravity vector)
//!   └─> 3. Gyro mixing      (2x3 ternary matrix)
//!   └─> 4. Accel channel    (deadzone, 2x3 ternary matrix)
//!   └─> 5. Inversion
//!   └─> 6. Mode application (relative accumulate | absolute | calibrated absolute)
//!   └─> 7. Clamp to viewport
//! ```
//!
//! While a calibration run owns the device, processing stops after stage 5
//! and the mixed position is handed to the calibration state machine.
//!
//! The pipeline is the only writer of `target_x`/`target_y`.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::device::{DeviceProfile, DeviceSample, DeviceStatus, Vec3};

/// Gravity vectors with a smaller absolute component sum are treated as invalid
pub const MIN_GRAVITY_SUM: f64 = 0.1;

/// Relative-mode accelerometer contribution is scaled by `accel_scale / 100`
pub const ACCEL_SCALE_DIVISOR: f64 = 100.0;

/// Drawing area the pointer lives in
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl Viewport {
    /// Create a viewport
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Center point
    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Clamp a point into `[0, width] x [0, height]`
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (clamp_axis(x, self.width), clamp_axis(y, self.height))
    }
}

fn clamp_axis(value: f64, extent: f64) -> f64 {
    if value.is_nan() {
        return extent / 2.0;
    }
    value.max(0.0).min(extent)
}

/// Mutable per-device pipeline state
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    /// Previous raw orientation (relative-mode baseline)
    last_raw: Option<Vec3>,
    /// False until a relative-mode baseline has been captured
    sample_valid: bool,
    /// Mode used for the previous sample
    last_relative: Option<bool>,
    /// Target X in viewport pixels
    pub target_x: f64,
    /// Target Y in viewport pixels
    pub target_y: f64,
    /// Device has produced a sample since the last disconnect
    pub connected: bool,
    /// Status computed from the latest sample
    pub status: DeviceStatus,
}

impl PipelineState {
    /// Fresh, disconnected state centered in the viewport
    pub fn new(viewport: &Viewport) -> Self {
        let (cx, cy) = viewport.center();
        Self {
            last_raw: None,
            sample_valid: false,
            last_relative: None,
            target_x: cx,
            target_y: cy,
            connected: false,
            status: DeviceStatus::Offline,
        }
    }

    /// Move the target back to the viewport center
    pub fn recenter(&mut self, viewport: &Viewport) {
        let (cx, cy) = viewport.center();
        self.target_x = cx;
        self.target_y = cy;
    }

    /// Force the next relative-mode sample to re-seed the baseline
    pub fn invalidate_baseline(&mut self) {
        self.sample_valid = false;
    }

    /// Whether a relative-mode baseline is established
    pub fn sample_valid(&self) -> bool {
        self.sample_valid
    }

    /// Target position
    pub fn target(&self) -> (f64, f64) {
        (self.target_x, self.target_y)
    }
}

/// What the pipeline did with a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineOutcome {
    /// Sample only seeded the relative-mode baseline
    Seeded,
    /// Target updated
    Moved {
        /// Distance the target travelled, pixels
        displacement: f64,
    },
    /// Calibration owns the device; target untouched
    Calibrating {
        /// Mixed X after inversion
        mixed_x: f64,
        /// Mixed Y after inversion
        mixed_y: f64,
    },
}

/// Pipeline result for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOutput {
    /// What happened to the target
    pub outcome: PipelineOutcome,
    /// Raw button state, surfaced unmodified
    pub click_intent: bool,
}

/// Run one sample through the pipeline
///
/// `calibrating` is true while a calibration run targets this device.
pub fn process(
    sample: &DeviceSample,
    profile: &DeviceProfile,
    state: &mut PipelineState,
    viewport: &Viewport,
    calibrating: bool,
) -> PipelineOutput {
    state.status = sample.status();
    let click_intent = sample.button;

    if state.last_relative != Some(profile.use_relative_mode) {
        state.last_relative = Some(profile.use_relative_mode);
        state.invalidate_baseline();
    }

    let raw = sample.orientation;
    let input = if profile.use_relative_mode {
        let previous = match (state.sample_valid, state.last_raw) {
            (true, Some(prev)) => prev,
            _ => {
                state.last_raw = Some(raw);
                state.sample_valid = true;
                trace!("{} baseline seeded at {:?}", sample.device, raw);
                return PipelineOutput {
                    outcome: PipelineOutcome::Seeded,
                    click_intent,
                };
            }
        };
        state.last_raw = Some(raw);
        Vec3::new(
            wrap_delta(raw.x - previous.x),
            wrap_delta(raw.y - previous.y),
            wrap_delta(raw.z - previous.z),
        )
    } else {
        state.last_raw = Some(raw);
        raw
    };

    let input = if profile.dynamic_yaw {
        apply_dynamic_yaw(input, &sample.gravity)
    } else {
        input
    };

    let mut mixed_x = profile.mix_x.mix_gyro(input.x, input.y, input.z);
    let mut mixed_y = profile.mix_y.mix_gyro(input.x, input.y, input.z);

    let la = sample.linear_accel;
    let (ax, ay, az) = (
        deadzone(la.x, profile.deadzone),
        deadzone(la.y, profile.deadzone),
        deadzone(la.z, profile.deadzone),
    );
    let acc_x = profile.mix_x.mix_accel(ax, ay, az);
    let acc_y = profile.mix_y.mix_accel(ax, ay, az);

    if profile.invert_x {
        mixed_x = -mixed_x;
    }
    if profile.invert_y {
        mixed_y = -mixed_y;
    }

    if calibrating {
        return PipelineOutput {
            outcome: PipelineOutcome::Calibrating { mixed_x, mixed_y },
            click_intent,
        };
    }

    let (prev_x, prev_y) = state.target();
    let (tx, ty) = if profile.use_relative_mode {
        let accel_gain = profile.accel_scale / ACCEL_SCALE_DIVISOR;
        (
            prev_x + mixed_x * profile.gyro_scale + acc_x * accel_gain,
            prev_y + mixed_y * profile.gyro_scale + acc_y * accel_gain,
        )
    } else if profile.calibration.active {
        let c = &profile.calibration;
        let norm_x = normalize_calibrated(mixed_x - c.center_x, c.min_x, c.max_x);
        let norm_y = normalize_calibrated(mixed_y - c.center_y, c.min_y, c.max_y);
        (norm_x * viewport.width, norm_y * viewport.height)
    } else {
        let (cx, cy) = viewport.center();
        (
            cx + mixed_x * profile.gyro_scale,
            cy + mixed_y * profile.gyro_scale,
        )
    };

    let (tx, ty) = viewport.clamp(tx, ty);
    state.target_x = tx;
    state.target_y = ty;

    trace!(
        "{} in=({:.1}, {:.1}, {:.1}) mixed=({:.1}, {:.1}) target=({:.1}, {:.1})",
        sample.device,
        input.x,
        input.y,
        input.z,
        mixed_x,
        mixed_y,
        tx,
        ty
    );

    PipelineOutput {
        outcome: PipelineOutcome::Moved {
            displacement: (tx - prev_x).hypot(ty - prev_y),
        },
        click_intent,
    }
}

/// Wrap an angle delta into `[-180, 180]`
///
/// Handles rollover at the 0°/360° boundary: `350 → 10` is `+20`, not `-340`.
pub fn wrap_delta(delta: f64) -> f64 {
    let d = delta % 360.0;
    if d > 180.0 {
        d - 360.0
    } else if d < -180.0 {
        d + 360.0
    } else {
        d
    }
}

/// Replace the z input with its projection onto the gravity vector
///
/// Skipped when the gravity vector is missing or near zero so an invalid
/// vector never zeroes yaw.
pub fn apply_dynamic_yaw(input: Vec3, gravity: &Vec3) -> Vec3 {
    if gravity.abs_sum() > MIN_GRAVITY_SUM {
        Vec3::new(input.x, input.y, input.dot(gravity))
    } else {
        input
    }
}

/// Remove the deadzone from an accelerometer reading, keeping its sign
pub fn deadzone(value: f64, zone: f64) -> f64 {
    if value.abs() > zone {
        value - value.signum() * zone
    } else {
        0.0
    }
}

/// Map a calibrated offset to a `[0, 1]` screen fraction
///
/// Negative offsets scale against `min`, positive against `max`. A zero
/// extent on the relevant side falls back to the center (0.5).
pub fn normalize_calibrated(offset: f64, min: f64, max: f64) -> f64 {
    if offset < 0.0 && min != 0.0 {
        0.5 - (offset / min) * 0.5
    } else if offset > 0.0 && max != 0.0 {
        0.5 + (offset / max) * 0.5
    } else {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Coefficient, DeviceId, ARM};
    use proptest::prelude::*;

    fn sample(x: f64, y: f64, z: f64) -> DeviceSample {
        DeviceSample {
            device: DeviceId::new(ARM),
            orientation: Vec3::new(x, y, z),
            gravity: Vec3::default(),
            linear_accel: Vec3::default(),
            button: false,
            liveness: true,
        }
    }

    fn arm_profile() -> DeviceProfile {
        let mut p = DeviceProfile::for_device(&DeviceId::new(ARM));
        p.dynamic_yaw = false;
        p.gyro_scale = 10.0;
        p
    }

    fn viewport() -> Viewport {
        Viewport::new(1000.0, 800.0)
    }

    #[test]
    fn test_wrap_delta_rollover() {
        assert_eq!(wrap_delta(10.0 - 350.0), 20.0);
        assert_eq!(wrap_delta(350.0 - 10.0), -20.0);
        assert_eq!(wrap_delta(45.0), 45.0);
        assert_eq!(wrap_delta(180.0), 180.0);
    }

    #[test]
    fn test_dynamic_yaw_requires_gravity() {
        let input = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(apply_dynamic_yaw(input, &Vec3::default()), input);
        assert_eq!(apply_dynamic_yaw(input, &Vec3::new(0.03, 0.03, 0.03)), input);

        let out = apply_dynamic_yaw(input, &Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(out.z, 3.0);
        let out = apply_dynamic_yaw(input, &Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(out.z, 1.0);
    }

    #[test]
    fn test_deadzone_keeps_sign() {
        assert_eq!(deadzone(250.0, 200.0), 50.0);
        assert_eq!(deadzone(-250.0, 200.0), -50.0);
        assert_eq!(deadzone(150.0, 200.0), 0.0);
        assert_eq!(deadzone(-200.0, 200.0), 0.0);
    }

    #[test]
    fn test_normalize_calibrated_extents() {
        assert_eq!(normalize_calibrated(-50.0, -50.0, 50.0), 0.0);
        assert_eq!(normalize_calibrated(50.0, -50.0, 50.0), 1.0);
        assert_eq!(normalize_calibrated(0.0, -50.0, 50.0), 0.5);
        assert_eq!(normalize_calibrated(-25.0, 0.0, 50.0), 0.5);
        assert_eq!(normalize_calibrated(25.0, -50.0, 0.0), 0.5);
    }

    #[test]
    fn test_calibrated_absolute_mapping() {
        let mut profile = arm_profile();
        profile.calibration.active = true;
        profile.calibration.center_x = 100.0;
        profile.calibration.center_y = 100.0;
        profile.calibration.min_x = -50.0;
        profile.calibration.max_x = 50.0;

        let vp = viewport();
        let mut state = PipelineState::new(&vp);

        process(&sample(50.0, 100.0, 0.0), &profile, &mut state, &vp, false);
        assert_eq!(state.target_x, 0.0);
        assert_eq!(state.target_y, 400.0);

        process(&sample(150.0, 100.0, 0.0), &profile, &mut state, &vp, false);
        assert_eq!(state.target_x, 1000.0);

        process(&sample(100.0, 100.0, 0.0), &profile, &mut state, &vp, false);
        assert_eq!(state.target_x, 500.0);
    }

    #[test]
    fn test_absolute_mode_is_idempotent() {
        let profile = arm_profile();
        let vp = viewport();
        let mut state = PipelineState::new(&vp);
        let s = sample(12.0, -7.0, 0.0);

        process(&s, &profile, &mut state, &vp, false);
        let first = state.target();
        process(&s, &profile, &mut state, &vp, false);
        assert_eq!(state.target(), first);
        assert_eq!(first, (620.0, 330.0));
    }

    #[test]
    fn test_relative_first_sample_only_seeds() {
        let mut profile = arm_profile();
        profile.use_relative_mode = true;
        let vp = viewport();
        let mut state = PipelineState::new(&vp);

        let out = process(&sample(350.0, 0.0, 0.0), &profile, &mut state, &vp, false);
        assert_eq!(out.outcome, PipelineOutcome::Seeded);
        assert_eq!(state.target(), (500.0, 400.0));

        let out = process(&sample(10.0, 0.0, 0.0), &profile, &mut state, &vp, false);
        assert!(matches!(out.outcome, PipelineOutcome::Moved { .. }));
        // +20 degrees through wraparound, times gyro scale 10
        assert_eq!(state.target_x, 700.0);
    }

    #[test]
    fn test_mode_toggle_reseeds_baseline() {
        let mut profile = arm_profile();
        let vp = viewport();
        let mut state = PipelineState::new(&vp);

        process(&sample(5.0, 0.0, 0.0), &profile, &mut state, &vp, false);
        profile.use_relative_mode = true;
        let out = process(&sample(30.0, 0.0, 0.0), &profile, &mut state, &vp, false);
        assert_eq!(out.outcome, PipelineOutcome::Seeded);
    }

    #[test]
    fn test_relative_accelerometer_contribution() {
        let mut profile = arm_profile();
        profile.use_relative_mode = true;
        profile.mix_x.lax = Coefficient::Positive;
        profile.accel_scale = 5.0;
        profile.deadzone = 200.0;
        let vp = viewport();
        let mut state = PipelineState::new(&vp);

        process(&sample(0.0, 0.0, 0.0), &profile, &mut state, &vp, false);
        let mut s = sample(0.0, 0.0, 0.0);
        s.linear_accel = Vec3::new(1200.0, 0.0, 0.0);
        process(&s, &profile, &mut state, &vp, false);
        // (1200 - 200) * 5 / 100 = 50
        assert_eq!(state.target_x, 550.0);
    }

    #[test]
    fn test_inversion_applies_before_mode() {
        let mut profile = arm_profile();
        profile.invert_x = true;
        let vp = viewport();
        let mut state = PipelineState::new(&vp);
        process(&sample(10.0, 0.0, 0.0), &profile, &mut state, &vp, false);
        assert_eq!(state.target_x, 400.0);
    }

    #[test]
    fn test_calibrating_leaves_target_untouched() {
        let mut profile = arm_profile();
        profile.invert_y = true;
        let vp = viewport();
        let mut state = PipelineState::new(&vp);
        let out = process(&sample(3.0, 4.0, 0.0), &profile, &mut state, &vp, true);
        assert_eq!(
            out.outcome,
            PipelineOutcome::Calibrating {
                mixed_x: 3.0,
                mixed_y: -4.0
            }
        );
        assert_eq!(state.target(), vp.center());
    }

    #[test]
    fn test_click_intent_surfaced_raw() {
        let profile = arm_profile();
        let vp = viewport();
        let mut state = PipelineState::new(&vp);
        let mut s = sample(0.0, 0.0, 0.0);
        s.button = true;
        assert!(process(&s, &profile, &mut state, &vp, false).click_intent);
    }

    proptest! {
        #[test]
        fn prop_wrap_delta_in_range(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            let d = wrap_delta(b - a);
            prop_assert!((-180.0..=180.0).contains(&d));
        }

        #[test]
        fn prop_target_always_clamped(
            steps in proptest::collection::vec((-1.0e6f64..1.0e6, -1.0e6f64..1.0e6), 1..20),
            relative in any::<bool>(),
        ) {
            let mut profile = arm_profile();
            profile.use_relative_mode = relative;
            profile.gyro_scale = 1000.0;
            let vp = viewport();
            let mut state = PipelineState::new(&vp);
            for (x, y) in steps {
                process(&sample(x, y, 0.0), &profile, &mut state, &vp, false);
                prop_assert!(state.target_x >= 0.0 && state.target_x <= vp.width);
                prop_assert!(state.target_y >= 0.0 && state.target_y <= vp.height);
            }
        }
    }
}
