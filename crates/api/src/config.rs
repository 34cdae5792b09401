//! Service configuration
//!
//! Layered from an optional TOML file and `DROWSY_*` environment variables
//! (`__` separates sections, e.g. `DROWSY_SERVER__BIND_ADDR=0.0.0.0:8080`).
//! Every field has a default, so an empty environment is a valid config.

use dms::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use storage::DebugImagePolicy;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "DROWSY_CONFIG";

/// Config file used when `DROWSY_CONFIG` is unset
pub const DEFAULT_CONFIG_PATH: &str = "config/drowsiness.toml";

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub score_log: ScoreLogConfig,
    pub debug_images: DebugImageConfig,
    pub detector: DetectorConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address
    pub bind_addr: String,
    /// Largest accepted request body (bytes)
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5241".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Score log location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreLogConfig {
    pub path: PathBuf,
}

impl Default for ScoreLogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs/drowsiness_log.csv"),
        }
    }
}

/// Debug image persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugImageConfig {
    pub enabled: bool,
    pub dir: PathBuf,
    pub policy: DebugImagePolicy,
}

impl Default for DebugImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("images"),
            policy: DebugImagePolicy::Overwrite,
        }
    }
}

/// Tracing output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Prometheus exporter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Address for the `/metrics` listener; disabled when unset
    pub listen_addr: Option<String>,
}

impl AppConfig {
    /// Load from the file named by `DROWSY_CONFIG` (or the default path)
    /// and the environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load from a specific file (optional) and the environment
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("DROWSY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
