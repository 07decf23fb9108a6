//! Configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shape and cadence of one synthetic measurement stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Readings sent in the fast (historical) phase
    pub fast_count: u32,

    /// Delay after each fast reading (milliseconds)
    pub fast_interval_ms: u64,

    /// Readings sent in the slow (live) phase
    pub slow_count: u32,

    /// Delay before each slow reading (milliseconds)
    pub slow_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fast_count: 10,
            fast_interval_ms: 200,
            slow_count: 15,
            slow_interval_ms: 1000,
        }
    }
}

/// Relay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Path the configuration was loaded from
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Listener for UI clients
    pub ui_addr: String,

    /// Listener for the master link
    pub master_addr: String,

    /// Period of the slaver liveness sweep (milliseconds)
    pub sweep_interval_ms: u64,

    /// Slaver is considered gone after this long without a heartbeat (milliseconds)
    pub slaver_timeout_ms: u64,

    /// Populate the session registry with the demo sessions on startup
    pub seed_demo_sessions: bool,

    /// Fixed seed for reading jitter (None = seed from entropy)
    pub jitter_seed: Option<u64>,

    /// Measurement stream plan
    pub stream: StreamConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            config_path: Self::default_config_path(),
            ui_addr: "127.0.0.1:8082".to_string(),
            master_addr: "127.0.0.1:9091".to_string(),
            sweep_interval_ms: 1000,
            slaver_timeout_ms: 10_000,
            seed_demo_sessions: true,
            jitter_seed: None,
            stream: StreamConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one the default location is used
    /// and created with defaults on first run.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => {
                let config_path = Self::default_config_path();
                if config_path.exists() {
                    Self::load_from(&config_path)
                } else {
                    let config = Self::default();
                    config.save().context("Failed to save default config")?;
                    Ok(config)
                }
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut config: RelayConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&self.config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn slaver_timeout(&self) -> Duration {
        Duration::from_millis(self.slaver_timeout_ms)
    }

    /// Get default config path
    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("telemetry-relay")
            .join("config.toml")
    }
}
