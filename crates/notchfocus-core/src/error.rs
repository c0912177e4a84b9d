//! Core error types for notchfocus-core.
//!
//! Nothing in the session engine surfaces these to the user: persistence,
//! cue and notification failures all degrade to "timer semantics stay
//! correct, a cosmetic feature is omitted". They exist so the storage and
//! configuration layers can report what went wrong to the caller that does
//! care (the CLI, logs).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for notchfocus-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Snapshot persistence errors
    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Key does not exist in the configuration tree
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors from a [`SnapshotStore`](crate::storage::SnapshotStore).
#[derive(Error, Debug)]
pub enum PersistError {
    /// The backing store could not be read or written
    #[error("Storage failure: {0}")]
    Storage(String),

    /// A stored record exists but cannot be decoded
    #[error("Corrupt session snapshot: {0}")]
    Decode(String),

    /// The snapshot could not be encoded
    #[error("Failed to encode session snapshot: {0}")]
    Encode(String),
}

impl From<rusqlite::Error> for PersistError {
    fn from(err: rusqlite::Error) -> Self {
        PersistError::Storage(err.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_error_wraps_into_core_error() {
        let err: CoreError = PersistError::Decode("bad phase".into()).into();
        assert_eq!(
            err.to_string(),
            "Persistence error: Corrupt session snapshot: bad phase"
        );
    }

    #[test]
    fn unknown_key_message() {
        let err = ConfigError::UnknownKey("ui.theme".into());
        assert_eq!(err.to_string(), "unknown config key: ui.theme");
    }
}
