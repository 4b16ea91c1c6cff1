//! Configuration loading and typed config structures for the engine.
//!
//! The canonical configuration lives in `rendezvous-config.yaml` at the
//! project root. Every field has a default, so a missing file or a partial
//! one both yield a usable configuration.

use std::path::Path;

use rendezvous_store::{DEFAULT_MAX_SNAPSHOT_BYTES, StoreConfig};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },
}

/// Top-level engine configuration, mirroring `rendezvous-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Application identity.
    #[serde(default)]
    pub app: AppConfig,

    /// Snapshot location and lifecycle.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Startup demonstration.
    #[serde(default)]
    pub demo: DemoConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file, then apply environment
    /// overrides:
    /// - `RENDEZVOUS_SNAPSHOT_PATH` overrides `storage.snapshot_path`
    /// - `RENDEZVOUS_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string. No overrides are applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RENDEZVOUS_SNAPSHOT_PATH") {
            self.storage.snapshot_path = val;
        }
        if let Ok(val) = std::env::var("RENDEZVOUS_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Settings for the snapshot codec.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            app_version: self.app.version.clone(),
            max_snapshot_bytes: self.storage.max_snapshot_bytes,
        }
    }
}

/// Application identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Display name.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Written as `appVersion` in snapshots.
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

/// Snapshot location and lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Snapshot file read at startup and written at exit.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,

    /// Snapshots larger than this are refused.
    #[serde(default = "default_max_snapshot_bytes")]
    pub max_snapshot_bytes: u64,

    /// Load the snapshot at startup when it exists.
    #[serde(default = "default_true")]
    pub load_on_start: bool,

    /// Save the registry before exiting.
    #[serde(default = "default_true")]
    pub save_on_exit: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            max_snapshot_bytes: default_max_snapshot_bytes(),
            load_on_start: true,
            save_on_exit: true,
        }
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Startup demonstration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DemoConfig {
    /// Run the observer demonstration after startup.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_app_name() -> String {
    "Rendezvous".to_owned()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

fn default_snapshot_path() -> String {
    "data/rendezvous.json".to_owned()
}

const fn default_max_snapshot_bytes() -> u64 {
    DEFAULT_MAX_SNAPSHOT_BYTES
}

const fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_owned()
}
