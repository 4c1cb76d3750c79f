//! Application configuration
//!
//! Persistent settings for the data engine, stored as TOML in the
//! platform-appropriate data directory (or wherever the caller points).
//! Every section has working defaults so a missing or partial file never
//! blocks startup: [`AppConfig::load_or_default`] logs and falls back.
//!
//! # Sections
//!
//! - `[connection]` - server address, ping timeout, transport retry policy
//! - `[retention]` - record count/age bounds applied per channel
//! - `[scheduler]` - background tick intervals

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use crate::scheduler::SchedulerOptions;
use crate::sink::RetentionPolicy;
use crate::source::{RetryPolicy, TransportOptions};

/// Directory name under the platform data dir
const APP_DIR_NAME: &str = "dev.hxyulin.ntdata-rs";

/// Connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Server address to connect to
    pub server_address: String,
    /// Ping timeout override in milliseconds
    pub ping_timeout_milliseconds: Option<u64>,
    /// Use a secure connection
    pub secure: bool,
    /// Reconnect policy forwarded to the transport
    pub retry: RetryPolicy,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_address: String::from("127.0.0.1"),
            ping_timeout_milliseconds: None,
            secure: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl ConnectionConfig {
    /// Transport options carrying these settings.
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            retry_policy: Some(self.retry),
            ping_timeout_milliseconds: self.ping_timeout_milliseconds,
            secure: self.secure,
        }
    }
}

/// Record retention settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Maximum number of records kept per channel
    pub max_size: usize,
    /// Maximum record age in seconds
    pub max_time_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        let policy = RetentionPolicy::default();
        Self {
            max_size: policy.max_size,
            max_time_seconds: policy.max_time_seconds,
        }
    }
}

impl From<RetentionConfig> for RetentionPolicy {
    fn from(config: RetentionConfig) -> Self {
        Self {
            max_size: config.max_size,
            max_time_seconds: config.max_time_seconds,
        }
    }
}

/// Background scheduler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Interval between connection-status samples, milliseconds
    pub status_interval_milliseconds: u64,
    /// Interval between retention sweeps, milliseconds
    pub retention_interval_milliseconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            status_interval_milliseconds: 1000,
            retention_interval_milliseconds: 30_000,
        }
    }
}

impl From<SchedulerConfig> for SchedulerOptions {
    fn from(config: SchedulerConfig) -> Self {
        Self {
            status_interval: Duration::from_millis(config.status_interval_milliseconds),
            retention_interval: Duration::from_millis(config.retention_interval_milliseconds),
        }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Connection settings
    pub connection: ConnectionConfig,
    /// Record retention settings
    pub retention: RetentionConfig,
    /// Background scheduler settings
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Default config file location in the platform data directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::data_dir().map(|dir| dir.join(APP_DIR_NAME).join("config.toml"))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text)
            .map_err(|e| DataError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Save configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| DataError::Config(format!("failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Load configuration, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "using default config");
                Self::default()
            }
        }
    }
}
