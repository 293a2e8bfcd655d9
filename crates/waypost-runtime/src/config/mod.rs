//! Configuration module for Waypost.
//!
//! Configuration is loaded with figment from files, environment variables
//! and programmatic overrides, then validated before use.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig, WaypostConfig,
};
pub use validation::validate_config;
