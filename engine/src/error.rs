//! Error types for the Tether engine.

use thiserror::Error;

/// All possible errors from the Tether engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Preference store errors
    #[error("preference store failure for '{key}': {reason}")]
    Preferences { key: String, reason: String },

    #[error("corrupt preference '{key}': {reason}")]
    CorruptPreference { key: String, reason: String },

    // Validation errors
    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl Error {
    /// Build a store failure for `key` from any displayable cause.
    pub fn preferences(key: impl Into<String>, reason: impl ToString) -> Self {
        Error::Preferences {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
