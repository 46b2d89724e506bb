//! Core error types for dopamine-core.
//!
//! Every public operation returns [`Result`], whose error side is the
//! [`CoreError`] hierarchy below.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for dopamine-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A referenced order, cart, activity, item or profile does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Checkout was attempted on a cart with nothing to order.
    #[error("cart for user '{user_id}' has no items to check out")]
    EmptyCart { user_id: String },

    /// An operation needed a signed-in user and there was none.
    #[error("no authenticated user")]
    NotAuthenticated,

    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::NotFound { .. })
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A stored document could not be decoded into its model.
    #[error("Malformed document {collection}/{id}: {message}")]
    Decode {
        collection: String,
        id: String,
        message: String,
    },

    /// A field transform could not be applied to the stored document.
    #[error("Cannot apply update to field '{field}': {message}")]
    BadUpdate { field: String, message: String },

    /// The backing store is unreachable (poisoned lock, closed handle, ...).
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
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

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors, raised before any write is attempted.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required text field was empty.
    #[error("'{field}' must not be empty")]
    EmptyField { field: String },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub fn empty(field: &str) -> Self {
        ValidationError::EmptyField {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = CoreError::not_found("order", "abc");
        assert_eq!(err.to_string(), "order not found: abc");
        assert!(err.is_not_found());
    }

    #[test]
    fn validation_converts_into_core_error() {
        let err: CoreError = ValidationError::empty("title").into();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("'title' must not be empty"));
    }
}
