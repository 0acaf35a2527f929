//! Error types for content stores.

use habitstake_core::ContentId;
use thiserror::Error;

/// Errors that can occur talking to a content store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or did not answer in time.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// No object is stored under this identifier.
    #[error("content not found: {0}")]
    NotFound(ContentId),

    /// The store answered with an error status.
    #[error("store returned {status}: {message}")]
    Server { status: u16, message: String },

    /// The store answered, but not with what the API promises.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Object (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Missing or invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::InvalidResponse(e.to_string())
        } else {
            StoreError::Unavailable(e.to_string())
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
