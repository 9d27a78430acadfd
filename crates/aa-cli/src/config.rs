//! Configuration loading for the Attack Atlas CLI.

use aa_connectors::BundleSource;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// STIX bundle source.
    #[serde(default)]
    pub bundle: BundleSource,

    /// Navigator layer output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("layers")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bundle: BundleSource::default(),
            output_dir: default_output_dir(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Loads from the given path, or falls back to defaults when no path
    /// is supplied.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to use JSON format.
    #[serde(default)]
    pub json_format: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Converts to the observability crate's configuration.
    pub fn to_observability(&self) -> aa_observability::LoggingConfig {
        let level = match self.level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        };
        aa_observability::LoggingConfig {
            level,
            json_format: self.json_format,
            ..aa_observability::LoggingConfig::default()
        }
    }
}
