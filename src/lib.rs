//! # motion-pointer
//!
//! Motion-to-pointer engine for wearable motion sensors.
//!
//! A wireless hub streams orientation and button readings from one or more
//! wearables (an arm band, a glove). This crate turns each reading into an
//! on-screen pointer and turns pointer behavior (button presses, dwelling
//! over a target) into element-level click events that reach into nested
//! embedded documents.
//!
//! # Architecture
//!
//! ```text
//! motion-pointer
//!   ├─> Transport (WebSocket hub link, stdin control, stdout host bridge)
//!   ├─> Engine (per-device state, one cooperative event loop)
//!   │     ├─> Pipeline (profile-driven orientation → viewport target)
//!   │     ├─> Cursor (smoothing, magnet presentation, render frames)
//!   │     ├─> Arbitration (secondary overrides primary)
//!   │     ├─> Calibration (five-step range wizard)
//!   │     └─> Interaction (hit-testing, dwell, debounce, event injection)
//!   └─> Profiles (persistent per-device tuning)
//! ```
//!
//! # Data Flow
//!
//! **Motion Path:** Hub → Transport → Pipeline → Cursor → Renderer
//!
//! **Click Path:** Button edge or dwell → Hit test → Event sink → Host

#![warn(missing_docs)]
#![warn(clippy::all)]

// =============================================================================
// Device model
// =============================================================================

/// Device samples, identities and tuning profiles
///
/// Parses hub frames into [`device::DeviceSample`]s and keeps the persistent
/// [`device::DeviceProfile`] for every wearable the hub has ever reported.
pub mod device;

/// Orientation to viewport mapping
///
/// Pure functions from a sample and a profile to a target point, including
/// relative (joystick-like) and absolute motion models.
pub mod pipeline;

/// Range-of-motion calibration wizard
pub mod calibration;

// =============================================================================
// Pointer presentation and interaction
// =============================================================================

/// Visual cursor state and rendering seam
pub mod cursor;

/// Multi-device arbitration
pub mod arbitration;

/// Hit-testing, dwell-click and event injection
///
/// Resolves viewport points through nested frames to element targets and
/// delivers hover/press/release/click/focus events to an
/// [`interaction::EventSink`].
pub mod interaction;

/// Activity launch and progress contract
pub mod activity;

// =============================================================================
// Runtime
// =============================================================================

/// Engine tying devices, cursors and interaction together
pub mod engine;

/// Device hub link and host bridge
pub mod transport;

/// Configuration
pub mod config;

/// Utility functions
pub mod utils;
