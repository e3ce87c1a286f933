use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Two days, the cadence of the background configuration resync.
pub const DEFAULT_RESYNC_INTERVAL_MS: u64 = 2 * 24 * 60 * 60 * 1000;

/// Client configuration, read once at startup and carried in the `AppContext`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Route ordinary requests through onion paths.
    #[serde(default = "default_true")]
    pub enable_onion_requests: bool,
    /// Route attachment uploads/downloads through onion paths.
    #[serde(default = "default_true")]
    pub enable_onion_file_requests: bool,
    #[serde(default = "default_resync_interval_ms")]
    pub config_resync_interval_ms: u64,
    /// Default `tracing` filter; `RUST_LOG` takes precedence.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Preference/flag store file, relative to the config file's directory.
    #[serde(default = "default_preferences_file")]
    pub preferences_file: String,
}

fn default_true() -> bool {
    true
}

fn default_resync_interval_ms() -> u64 {
    DEFAULT_RESYNC_INTERVAL_MS
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_preferences_file() -> String {
    "preferences.json".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            enable_onion_requests: true,
            enable_onion_file_requests: true,
            config_resync_interval_ms: DEFAULT_RESYNC_INTERVAL_MS,
            log_filter: default_log_filter(),
            preferences_file: default_preferences_file(),
        }
    }
}

/// Where a loaded `ClientConfig` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Defaults,
}

impl ClientConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    ///
    /// Logs nothing; the caller reports the returned source.
    pub fn load(path: &Path) -> Result<(Self, ConfigSource), ServiceError> {
        if !path.exists() {
            return Ok((Self::default(), ConfigSource::Defaults));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| ServiceError::Config(format!("{}: {e}", path.display())))?;
        Ok((config, ConfigSource::File))
    }

    /// Whether Bootstrap should build fresh onion paths.
    pub fn wants_onion_paths(&self) -> bool {
        self.enable_onion_requests || self.enable_onion_file_requests
    }

    /// Resync period. Zero is not a usable period and falls back to two days.
    pub fn resync_interval(&self) -> Duration {
        let ms = if self.config_resync_interval_ms == 0 {
            tracing::warn!("configResyncIntervalMs is 0, using the default");
            DEFAULT_RESYNC_INTERVAL_MS
        } else {
            self.config_resync_interval_ms
        };
        Duration::from_millis(ms)
    }
}
