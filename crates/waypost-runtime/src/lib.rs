//! Waypost Runtime - configuration and logging for Waypost dispatchers.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `WaypostConfig`)
//! - Dispatcher construction from configuration
//! - Logging setup on top of `tracing-subscriber` (`LoggingBuilder`)
//!
//! ```rust,ignore
//! use waypost_runtime::{ConfigLoader, logging};
//!
//! let config = ConfigLoader::new().profile("production").load()?;
//! logging::init_from_config(&config.logging);
//!
//! let dispatcher = config.build_dispatcher::<Response>()?;
//! ```

pub mod config;
pub mod logging;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, Profile, SpanEventConfig, WaypostConfig, load_config, load_config_from_file,
    validate_config,
};
pub use logging::{LoggingBuilder, init_from_config};
