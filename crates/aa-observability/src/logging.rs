//! Logging infrastructure for Attack Atlas.
//!
//! Structured logging via the tracing ecosystem. The server speaks
//! JSON-RPC on stdout, so log output always goes to stderr.

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level.
    pub level: Level,
    /// Whether to use JSON format.
    pub json_format: bool,
    /// Whether to include target (module path).
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Development configuration with more verbose output.
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            json_format: false,
            include_target: true,
        }
    }

    /// Production configuration with JSON output.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            json_format: true,
            include_target: true,
        }
    }
}

/// Initializes logging with default configuration.
pub fn init_logging() {
    init_logging_with_config(LoggingConfig::default());
}

/// Initializes logging with the given configuration.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "aa_core={},aa_connectors={},aa_mcp={},aa_cli={}",
            config.level, config.level, config.level, config.level
        ))
    });

    if config.json_format {
        let fmt_layer = fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}
