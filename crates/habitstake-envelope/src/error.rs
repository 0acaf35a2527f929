//! Error types for report envelopes.

use thiserror::Error;

/// Errors from encrypting, decrypting or parsing a report envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The cipher primitive failed. Not expected in practice.
    #[error("encryption error: {0}")]
    Encryption(String),

    /// Malformed ciphertext or wrong key.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// A stored object is not a report envelope this build understands.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
