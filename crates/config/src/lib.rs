#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for bwx
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (TOML, via `--config`)
//! - Environment variables (`BWX_*`)
//! - CLI flags (applied by the caller, highest precedence)

use serde::{Deserialize, Serialize};
use bwx_errors::{ConfigError, Error};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

mod duration;
pub use duration::parse_duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub meter: MeterConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

/// Network tuning for the transfer engines
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-request timeout for downloads, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Connect timeout, in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Delay before retrying after a transport error, in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Pacing delay between upload passes against non-local targets, in milliseconds
    #[serde(default = "default_pass_delay_ms")]
    pub upload_pass_delay_ms: u64,
}

/// Throughput meter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Sampling tick, in milliseconds
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Snapshot channel capacity; a full channel drops snapshots
    #[serde(default = "default_snapshot_capacity")]
    pub snapshot_capacity: usize,
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_path")]
    pub path: String,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_pass_delay_ms() -> u64 {
    200
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_snapshot_capacity() -> usize {
    8
}

fn default_report_path() -> String {
    "bwx-report.json".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            error_backoff_ms: default_backoff_ms(),
            upload_pass_delay_ms: default_pass_delay_ms(),
        }
    }
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            snapshot_capacity: default_snapshot_capacity(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: default_report_path(),
        }
    }
}

impl Config {
    /// Load configuration from the given path, or fall back to defaults
    /// when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file is missing or fails to
    /// parse as TOML.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let content = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;

        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Merge environment variables into the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a set variable fails to parse as a number.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        if let Some(v) = env_u64("BWX_TIMEOUT_SECS")? {
            self.network.timeout_secs = v;
        }
        if let Some(v) = env_u64("BWX_BACKOFF_MS")? {
            self.network.error_backoff_ms = v;
        }
        if let Some(v) = env_u64("BWX_TICK_MS")? {
            self.meter.tick_ms = v;
        }
        if let Ok(path) = std::env::var("BWX_REPORT_PATH") {
            self.report.path = path;
        }
        Ok(())
    }

    /// Per-request timeout as a [`Duration`]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs)
    }

    /// Connect timeout as a [`Duration`]
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.network.connect_timeout_secs)
    }

    /// Error backoff as a [`Duration`]
    #[must_use]
    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.network.error_backoff_ms)
    }

    /// Upload pass pacing as a [`Duration`]
    #[must_use]
    pub fn upload_pass_delay(&self) -> Duration {
        Duration::from_millis(self.network.upload_pass_delay_ms)
    }

    /// Meter sampling tick as a [`Duration`]
    #[must_use]
    pub fn meter_tick(&self) -> Duration {
        Duration::from_millis(self.meter.tick_ms)
    }
}

fn env_u64(var: &str) -> Result<Option<u64>, Error> {
    match std::env::var(var) {
        Ok(value) => {
            let parsed = value.parse().map_err(|_| ConfigError::InvalidValue {
                field: var.to_string(),
                value,
            })?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.meter.tick_ms, 1000);
        assert_eq!(config.network.error_backoff_ms, 500);
        assert!(config.meter.snapshot_capacity > 0);
    }

    #[tokio::test]
    async fn missing_explicit_file_is_an_error() {
        let result = Config::load_or_default(Some(Path::new("/nonexistent/bwx.toml"))).await;
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[meter]\ntick_ms = 250\n").unwrap();

        let config = Config::load_or_default(Some(&path)).await.unwrap();
        assert_eq!(config.meter.tick_ms, 250);
        assert_eq!(config.network.timeout_secs, 60);
    }
}
