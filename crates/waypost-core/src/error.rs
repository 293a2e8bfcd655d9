//! Error types for the Waypost dispatcher.

use thiserror::Error;
use waypost_path::PatternError;

/// A type-erased error produced by a handler.
///
/// Handler errors travel through the chain untouched: an error handler, or
/// the caller of [`Dispatcher::run`](crate::Dispatcher::run), receives the
/// very same boxed value the failing handler produced.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The result every handler resolves to.
pub type HandlerResult = Result<(), BoxError>;

/// Misuse of the dispatcher detected while building it.
///
/// These are programming errors, not runtime conditions; the dispatcher
/// never catches them.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// The configured path property is an empty string.
    #[error("path property must not be empty")]
    EmptyPathProperty,

    /// A registration call was given no handler.
    #[error("missing middleware handler")]
    MissingHandler,

    /// A mount path could not be compiled.
    #[error("invalid mount path '{path}': {source}")]
    InvalidPath {
        /// The path as given at registration.
        path: String,
        /// The compilation failure.
        #[source]
        source: PatternError,
    },
}

/// Result type for dispatcher construction and registration.
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
