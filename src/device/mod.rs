//! Devices: samples, profiles and the profile store
//!
//! ```text
//! Transport frame ─> parse_frame ─> DeviceSample ─┐
//!                                                 ├─> MotionPipeline
//! ProfileStore ─────────────────> DeviceProfile ──┘
//! ```

pub mod profile;
pub mod sample;
pub mod store;

pub use profile::{
    CalibrationData, Coefficient, DeviceProfile, InputAxis, MixRow, OutputAxis, ARM, GLOVE,
};
pub use sample::{parse_frame, DeviceId, DeviceSample, DeviceStatus, ParsedFrame, Vec3};
pub use store::{ProfileStore, ProfileStoreError};
