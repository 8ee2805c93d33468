//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables (through clap)
//! - CLI arguments
//!
//! Every section is optional; a missing file section takes its defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod types;

pub use types::{LoggingConfig, ProfilesConfig, RenderConfig, TransportConfig, ViewportConfig};

use crate::arbitration::ArbitrationConfig;
use crate::engine::EngineOptions;
use crate::interaction::InteractionConfig;
use crate::pipeline::Viewport;

/// Supported render rates
pub const FPS_RANGE: std::ops::RangeInclusive<u32> = 1..=240;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Device hub connection
    #[serde(default)]
    pub transport: TransportConfig,
    /// Drawing area
    #[serde(default)]
    pub viewport: ViewportConfig,
    /// Render loop
    #[serde(default)]
    pub render: RenderConfig,
    /// Dwell, magnet and click timing
    #[serde(default)]
    pub interaction: InteractionConfig,
    /// Multi-device arbitration
    #[serde(default)]
    pub arbitration: ArbitrationConfig,
    /// Profile persistence
    #[serde(default)]
    pub profiles: ProfilesConfig,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate().context("Invalid config")?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = self.transport.url.as_str();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            anyhow::bail!("transport.url must be a ws:// or wss:// URL: {}", url);
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            anyhow::bail!(
                "viewport must be non-empty: {}x{}",
                self.viewport.width,
                self.viewport.height
            );
        }

        if !FPS_RANGE.contains(&self.render.fps) {
            anyhow::bail!(
                "render.fps must be between {} and {}: {}",
                FPS_RANGE.start(),
                FPS_RANGE.end(),
                self.render.fps
            );
        }

        let radius = self.interaction.magnet_radius_px;
        if radius.is_nan() || radius < 0.0 {
            anyhow::bail!(
                "interaction.magnet_radius_px cannot be negative: {}",
                self.interaction.magnet_radius_px
            );
        }

        if self.interaction.dwell_ms < self.interaction.click_debounce_ms {
            anyhow::bail!(
                "interaction.dwell_ms ({}) cannot be shorter than click_debounce_ms ({})",
                self.interaction.dwell_ms,
                self.interaction.click_debounce_ms
            );
        }

        if self.arbitration.primary == self.arbitration.secondary {
            anyhow::bail!(
                "arbitration.primary and arbitration.secondary are both {}",
                self.arbitration.primary
            );
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        url: Option<String>,
        profiles: Option<PathBuf>,
        no_dwell: bool,
    ) -> Self {
        if let Some(url) = url {
            self.transport.url = url;
        }
        if let Some(path) = profiles {
            self.profiles.path = Some(path);
        }
        if no_dwell {
            self.interaction.dwell_enabled = false;
        }
        self
    }

    /// Initial viewport
    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            f64::from(self.viewport.width),
            f64::from(self.viewport.height),
        )
    }

    /// Settings for [`crate::engine::Engine`]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            viewport: self.viewport(),
            interaction: self.interaction.clone(),
            arbitration: self.arbitration.clone(),
            profiles_path: self.profiles.resolved_path(),
            autosave: self.profiles.autosave,
        }
    }
}
