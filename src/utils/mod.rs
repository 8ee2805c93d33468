//! Utilities
//!
//! Runtime metrics and user-friendly error formatting.
//!
//! ## Metrics
//!
//! ```rust
//! use motion_pointer::utils::{metric_names, MetricsCollector};
//!
//! let metrics = MetricsCollector::new();
//! metrics.increment_counter(metric_names::SAMPLES_ACCEPTED, 1);
//! metrics.record_histogram(metric_names::PACKET_INTERVAL_MS, 16.7);
//! metrics.log_summary();
//! ```
//!
//! ## Error Formatting
//!
//! ```rust
//! use motion_pointer::utils::format_user_error;
//!
//! let err = anyhow::anyhow!("render.fps must be between 1 and 240").context("Failed to load config");
//! eprintln!("{}", format_user_error(&err));
//! ```

pub mod errors;
pub mod metrics;

pub use errors::format_user_error;
pub use metrics::{metric_names, HistogramStats, MetricsCollector, MetricsSnapshot};
