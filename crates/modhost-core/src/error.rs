//! Identifier validation errors.

use thiserror::Error;

/// Errors raised while constructing core identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// The identifier was empty.
    #[error("{kind} must not be empty")]
    Empty {
        /// Which kind of identifier was rejected.
        kind: &'static str,
    },

    /// The identifier contained a character outside the allowed set.
    #[error("{kind} contains invalid character {found:?}: {value}")]
    InvalidCharacter {
        /// Which kind of identifier was rejected.
        kind: &'static str,
        /// The offending character.
        found: char,
        /// The full rejected value.
        value: String,
    },

    /// The identifier started or ended with a separator.
    #[error("{kind} must not start or end with a separator: {value}")]
    DanglingSeparator {
        /// Which kind of identifier was rejected.
        kind: &'static str,
        /// The full rejected value.
        value: String,
    },
}

/// Result type for identifier construction.
pub type IdResult<T> = Result<T, IdError>;
