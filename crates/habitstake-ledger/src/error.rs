//! Error types for ledger access.

use thiserror::Error;

/// Errors returned by a [`LedgerClient`](crate::LedgerClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The ledger could not be reached. Nothing was recorded.
    #[error("ledger transport error: {0}")]
    Transport(String),

    /// No answer in time. For a submission, it may or may not have landed.
    #[error("ledger timeout: {0}")]
    Timeout(String),

    /// The ledger refused the transaction.
    #[error("ledger rejected transaction: {0}")]
    Rejected(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
