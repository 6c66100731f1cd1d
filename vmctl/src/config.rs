//! Controller configuration.
//!
//! Defaults, optionally overlaid by a JSON file named in `VMCTL_CONFIG`,
//! then by individual environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vmctl_client::{HostConfig, HostType};

/// Names a JSON configuration file.
pub const CONFIG_ENV: &str = "VMCTL_CONFIG";
/// Overrides [`ControllerConfig::heartbeat_path`].
pub const HEARTBEAT_PATH_ENV: &str = "VMCTL_HEARTBEAT_PATH";
/// Overrides [`ControllerConfig::poll_interval_ms`].
pub const POLL_INTERVAL_ENV: &str = "VMCTL_POLL_INTERVAL_MS";
/// Overrides [`HostConfig::vmrun_path`].
pub const VMRUN_ENV: &str = "VMCTL_VMRUN";
/// Overrides [`HostConfig::host_type`].
pub const HOST_TYPE_ENV: &str = "VMCTL_HOST_TYPE";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for [`ControllerConfig`].
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A setting has an unusable value.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct ControllerConfig {
    /// Heartbeat status file, relative to the working directory.
    pub heartbeat_path: PathBuf,

    /// Fixed delay between poll ticks.
    pub poll_interval_ms: u64,

    /// Delay between power-on and the first poll tick.
    pub startup_wait_ms: u64,

    /// Upper bound on each guest-readiness wait.
    pub guest_ready_timeout_secs: u64,

    /// Print soft failures (guest not ready, variable reads) to stderr.
    pub report_soft_errors: bool,

    /// Virtualization host settings.
    pub host: HostConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            heartbeat_path: PathBuf::from("heartbeat.log"),
            poll_interval_ms: 1000,
            startup_wait_ms: 0,
            guest_ready_timeout_secs: 10,
            report_soft_errors: true,
            host: HostConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    /// See [`ControllerConfig::from_lookup`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve environment variables.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override is invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(path) = lookup(HEARTBEAT_PATH_ENV) {
            config.heartbeat_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(POLL_INTERVAL_ENV) {
            config.poll_interval_ms = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: POLL_INTERVAL_ENV.to_owned(),
                reason: format!("'{raw}': {e}"),
            })?;
        }
        if let Some(path) = lookup(VMRUN_ENV) {
            config.host.vmrun_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(HOST_TYPE_ENV) {
            config.host.host_type = raw.parse::<HostType>().map_err(|e| ConfigError::InvalidValue {
                key: HOST_TYPE_ENV.to_owned(),
                reason: e.to_string(),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file. Missing fields take defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Reject settings the poller cannot honour.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for a zero poll interval or an
    /// empty heartbeat path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_ms".to_owned(),
                reason: "must be greater than zero".to_owned(),
            });
        }
        if self.heartbeat_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "heartbeat_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub fn startup_wait(&self) -> Duration {
        Duration::from_millis(self.startup_wait_ms)
    }

    #[must_use]
    pub fn guest_ready_timeout(&self) -> Duration {
        Duration::from_secs(self.guest_ready_timeout_secs)
    }
}
