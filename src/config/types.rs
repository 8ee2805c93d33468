//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Device hub connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// WebSocket URL of the device hub (e.g., "ws://192.168.4.1/ws")
    #[serde(default = "default_url")]
    pub url: String,

    /// Delay before each reconnect attempt (ms)
    #[serde(default = "default_backoff_ms")]
    pub reconnect_backoff_ms: u64,
}

fn default_url() -> String {
    "ws://192.168.4.1/ws".to_string()
}
fn default_backoff_ms() -> u64 {
    2000
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_backoff_ms: default_backoff_ms(),
        }
    }
}

/// Drawing area
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Height in pixels
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 {
    1920
}
fn default_height() -> u32 {
    1080
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Render loop
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Display frames per second
    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_fps() -> u32 {
    crate::cursor::DEFAULT_RENDER_FPS
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

/// Profile persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Profile file (None = platform config dir)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Save after every profile edit
    #[serde(default)]
    pub autosave: bool,
}

impl ProfilesConfig {
    /// Profile file location, falling back to `<config_dir>/motion-pointer/profiles.json`
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(|| {
            dirs::config_dir().map(|dir| dir.join("motion-pointer").join("profiles.json"))
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily-rotated log files (None = console only)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Seconds between metrics summaries (0 = disabled)
    #[serde(default)]
    pub metrics_interval_secs: u64,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: None,
            metrics_interval_secs: 0,
        }
    }
}
