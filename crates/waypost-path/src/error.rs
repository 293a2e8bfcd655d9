//! Error types for pattern compilation.

use thiserror::Error;

/// Errors that can occur while compiling a path pattern.
#[derive(Debug, Clone, Error)]
pub enum PatternError {
    /// A `(` group is never closed.
    #[error("unbalanced group starting at byte {position} in pattern '{pattern}'")]
    UnbalancedGroup {
        /// The offending pattern.
        pattern: String,
        /// Byte offset of the opening parenthesis.
        position: usize,
    },

    /// A `:` is not followed by a parameter name.
    #[error("missing parameter name at byte {position} in pattern '{pattern}'")]
    MissingParameterName {
        /// The offending pattern.
        pattern: String,
        /// Byte offset of the colon.
        position: usize,
    },

    /// The generated regular expression was rejected.
    #[error("invalid pattern '{pattern}': {source}")]
    Regex {
        /// The offending pattern.
        pattern: String,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

/// Result type for pattern compilation.
pub type PatternResult<T> = Result<T, PatternError>;
