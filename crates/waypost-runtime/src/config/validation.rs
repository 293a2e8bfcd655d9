//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, WaypostConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &WaypostConfig) -> ConfigResult<()> {
    config.dispatcher.validate()?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File {
        let Some(path) = &logging.file_path else {
            return Err(ConfigError::validation(
                "logging.file_path is required when logging.output is 'file'",
            ));
        };
        if path.file_name().is_none() {
            return Err(ConfigError::validation(format!(
                "logging.file_path must name a file: {}",
                path.display()
            )));
        }
    }

    if let Some(target) = logging.filters.keys().find(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid logging filter target: '{target}'"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use std::path::PathBuf;
    use waypost_core::{ConfigurationError, DispatcherOptions};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&WaypostConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_path_property_rejected() {
        let mut config = WaypostConfig::default();
        config.dispatcher = DispatcherOptions::new().path_property("");

        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Dispatcher(ConfigurationError::EmptyPathProperty)
        ));
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = WaypostConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation { .. })
        ));

        config.logging.file_path = Some(PathBuf::from("logs/waypost.log"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_blank_filter_target_rejected() {
        let mut config = WaypostConfig::default();
        config.logging.filters.insert(" ".into(), LogLevel::Debug);
        assert!(validate_config(&config).is_err());
    }
}
