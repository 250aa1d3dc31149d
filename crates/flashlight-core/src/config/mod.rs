pub mod error;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;
use error::Result;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// How registry mutation and dispatch are coordinated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyMode {
    /// Dispatch walks a copy-on-write snapshot; posts of different event
    /// types run in parallel.
    #[default]
    Snapshot,
    /// One re-entrant lock serializes register, deregister and post.
    ///
    /// An awaited asynchronous post cannot be made from a thread that
    /// already holds the lock, such as from inside a synchronous listener;
    /// it fails with `EventSystemError::NestedAwait`.
    Serialized,
}

/// Settings for the asynchronous dispatch worker pool.
///
/// The defaults keep one core thread alive and let the pool grow as far as
/// the runtime allows, retiring idle workers after a minute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    pub thread_name: String,
    /// Listener threads started by `pre_start` and kept idle until work
    /// arrives, capped by `max_threads`
    pub core_threads: usize,
    pub max_threads: usize,
    pub keep_alive_secs: u64,
    /// Upper bound on how long an awaiting post blocks; unbounded when unset
    pub await_timeout_ms: Option<u64>,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            thread_name: "flashlight-worker".to_string(),
            core_threads: 1,
            max_threads: 512,
            keep_alive_secs: 60,
            await_timeout_ms: None,
        }
    }
}

impl WorkerPoolConfig {
    pub fn await_timeout(&self) -> Option<Duration> {
        self.await_timeout_ms.map(Duration::from_millis)
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    pub consistency: ConsistencyMode,
    pub pool: WorkerPoolConfig,
}

impl DispatcherConfig {
    /// Deserialize from string based on format
    pub fn parse(data: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| ConfigError::Deserialization {
                format: "JSON".to_string(),
                source: Box::new(e),
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| ConfigError::Deserialization {
                format: "YAML".to_string(),
                source: Box::new(e),
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| ConfigError::Deserialization {
                format: "TOML".to_string(),
                source: Box::new(e),
            }),
        }
    }

    /// Load a config file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&data, format)?;
        log::debug!("Loaded dispatcher config from {}", path.display());
        Ok(config)
    }
}
