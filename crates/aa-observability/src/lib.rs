//! # aa-observability
//!
//! Logging setup for Attack Atlas services and tools.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
