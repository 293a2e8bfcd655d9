//! Logging setup on `tracing` and `tracing-subscriber`.
//!
//! Every dispatch run is a `dispatch` span carrying the number of matched
//! entries and the input path. Registration and per-entry execution are
//! logged at `debug` and `trace` under the `waypost_core` target, so a
//! `filters` entry for `waypost_core` is usually all that is needed to watch
//! a pipeline.
//!
//! ```rust,ignore
//! use waypost_runtime::{SpanEventConfig, logging::LoggingBuilder};
//!
//! LoggingBuilder::new()
//!     .directive("waypost_core=trace")
//!     .span_events(SpanEventConfig::LIFECYCLE)
//!     .init();
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

impl From<SpanEventConfig> for FmtSpan {
    fn from(events: SpanEventConfig) -> Self {
        [
            (events.new, FmtSpan::NEW),
            (events.enter, FmtSpan::ENTER),
            (events.exit, FmtSpan::EXIT),
            (events.close, FmtSpan::CLOSE),
        ]
        .into_iter()
        .filter(|(on, _)| *on)
        .fold(FmtSpan::NONE, |acc, (_, flag)| acc | flag)
    }
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// Builds a subscriber on top of a [`LoggingConfig`].
///
/// Every setter edits the underlying config, so a builder started from a
/// loaded file can be tweaked before installing it.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    config: LoggingConfig,
    directives: Vec<String>,
    target: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::from_config(&LoggingConfig::default())
    }

    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            config: config.clone(),
            directives: Vec::new(),
            target: true,
        }
    }

    /// Sets the level used when `RUST_LOG` is unset.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Adds a raw filter directive such as `waypost_core=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn span_events(mut self, events: SpanEventConfig) -> Self {
        self.config.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    /// Writes to `path` and switches the output to [`LogOutput::File`].
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.file_path = Some(path.into());
        self.config.output = LogOutput::File;
        self
    }

    pub fn rotation(mut self, rotation: LogRotation) -> Self {
        self.config.rotation = rotation;
        self
    }

    pub fn thread_ids(mut self, enabled: bool) -> Self {
        self.config.thread_ids = enabled;
        self
    }

    pub fn file_location(mut self, enabled: bool) -> Self {
        self.config.file_location = enabled;
        self
    }

    pub fn target(mut self, enabled: bool) -> Self {
        self.target = enabled;
        self
    }

    /// Per-target overrides from the config followed by explicit directives.
    fn all_directives(&self) -> Vec<String> {
        self.config
            .filters
            .iter()
            .map(|(target, level)| format!("{target}={}", level.as_str()))
            .chain(self.directives.iter().cloned())
            .collect()
    }

    /// `RUST_LOG` wins over the configured level; directives apply on top.
    fn filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_str()));
        for directive in self.all_directives() {
            match directive.parse() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(err) => eprintln!("Ignoring invalid log directive '{directive}': {err}"),
            }
        }
        filter
    }

    fn writer(&self) -> BoxMakeWriter {
        match (self.config.output, &self.config.file_path) {
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(path)) => BoxMakeWriter::new(RollingFileAppender::new(
                self.config.rotation.into(),
                path.parent().unwrap_or_else(|| Path::new(".")),
                path.file_name().unwrap_or_else(|| OsStr::new("waypost.log")),
            )),
            _ => BoxMakeWriter::new(std::io::stdout),
        }
    }

    fn layer(&self) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(self.writer())
            .with_span_events(self.config.span_events.into())
            .with_target(self.target)
            .with_thread_ids(self.config.thread_ids)
            .with_file(self.config.file_location)
            .with_line_number(self.config.file_location);

        match self.config.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            _ => layer.boxed(),
        }
    }

    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber, failing if one is already set.
    pub fn try_init(self) -> Result<(), TryInitError> {
        tracing_subscriber::registry()
            .with(self.layer())
            .with(self.filter())
            .try_init()?;

        if self.config.output == LogOutput::File && self.config.file_path.is_none() {
            warn!("file output requested without a file path, logging to stdout");
        }
        #[cfg(not(feature = "json-log"))]
        if self.config.format == LogFormat::Json {
            warn!("json log format needs the `json-log` feature, using the full format");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_event_flags() {
        assert_eq!(FmtSpan::from(SpanEventConfig::default()), FmtSpan::NONE);
        assert_eq!(
            FmtSpan::from(SpanEventConfig::LIFECYCLE),
            FmtSpan::NEW | FmtSpan::CLOSE
        );
        assert_eq!(FmtSpan::from(SpanEventConfig::FULL), FmtSpan::FULL);
    }

    #[test]
    fn test_config_filters_precede_directives() {
        let mut config = LoggingConfig::default();
        config.filters.insert("waypost_core".into(), LogLevel::Trace);

        let builder = LoggingBuilder::from_config(&config).directive("demo=debug");
        assert_eq!(builder.all_directives(), ["waypost_core=trace", "demo=debug"]);
    }

    #[test]
    fn test_setters_edit_config() {
        let builder = LoggingBuilder::new()
            .level(LogLevel::Debug)
            .file("logs/waypost.log")
            .rotation(LogRotation::Hourly)
            .file_location(true);

        assert_eq!(builder.config.level, LogLevel::Debug);
        assert_eq!(builder.config.output, LogOutput::File);
        assert_eq!(builder.config.rotation, LogRotation::Hourly);
        assert!(builder.config.file_location);
    }

    #[test]
    fn test_rotation_mapping() {
        assert_eq!(Rotation::from(LogRotation::Daily), Rotation::DAILY);
        assert_eq!(Rotation::from(LogRotation::Never), Rotation::NEVER);
    }
}
