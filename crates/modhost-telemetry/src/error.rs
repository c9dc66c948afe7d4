//! Telemetry error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or installing the log subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The base level or a directive is not a valid filter.
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// The rejected level or directive.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// The format name is not one of `pretty`, `compact`, `json`, `full`.
    #[error("unknown log format '{0}'")]
    UnknownFormat(String),

    /// The log directory could not be created.
    #[error("cannot create log directory {path}: {source}")]
    LogDirectory {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber is already installed.
    #[error("log subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
