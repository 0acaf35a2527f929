//! Error types for HabitStake operations.
//!
//! Component errors are translated here at the call site, because the same
//! component error means different things in different places: a ledger
//! timeout on a read is `LedgerUnavailable`, on a submission it is
//! `SubmissionAmbiguous`.

use habitstake_core::{BookingHandle, ContentId, CoreError, ValidationError};
use habitstake_envelope::EnvelopeError;
use habitstake_ledger::LedgerError;
use habitstake_store::StoreError;
use thiserror::Error;

/// Errors that can occur during HabitStake operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A local precondition failed. No network call was made.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The ledger refused the transaction.
    #[error("ledger rejected {operation}: {reason}")]
    LedgerRejected {
        operation: &'static str,
        reason: String,
    },

    /// The ledger could not be reached. Nothing was recorded and the mirror
    /// is unchanged.
    #[error("ledger unavailable during {operation}: {detail}")]
    LedgerUnavailable {
        operation: &'static str,
        detail: String,
    },

    /// The content store could not be reached.
    #[error("content store unavailable during {operation}: {detail}")]
    StoreUnavailable {
        operation: &'static str,
        detail: String,
    },

    /// A submission timed out. It may or may not have been recorded.
    #[error("{operation} submission status unknown: {detail}")]
    SubmissionAmbiguous {
        operation: &'static str,
        detail: String,
    },

    /// The booking does not accept a report upload.
    #[error("booking {handle} is not eligible for a report: {reason}")]
    NotEligible {
        handle: BookingHandle,
        reason: String,
    },

    /// The caller is not a party to the record.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The ledger returned a record this build cannot interpret.
    #[error("malformed ledger record: {0}")]
    MalformedRecord(String),

    /// A stored object is not a valid report envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Nothing is stored under the content identifier.
    #[error("report not found: {0}")]
    NotFound(ContentId),

    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed. On an envelope whose patient matched, this points
    /// at corruption or tampering.
    #[error("decryption failed: {0}")]
    Decryption(String),
}

impl Error {
    /// Translate a failed ledger read.
    pub fn ledger_read(operation: &'static str, err: LedgerError) -> Self {
        let detail = match err {
            LedgerError::Transport(d) | LedgerError::Timeout(d) | LedgerError::Rejected(d) => d,
        };
        Error::LedgerUnavailable { operation, detail }
    }

    /// Translate a failed ledger submission.
    pub fn ledger_submit(operation: &'static str, err: LedgerError) -> Self {
        match err {
            LedgerError::Transport(detail) => Error::LedgerUnavailable { operation, detail },
            LedgerError::Timeout(detail) => Error::SubmissionAmbiguous { operation, detail },
            LedgerError::Rejected(reason) => Error::LedgerRejected { operation, reason },
        }
    }

    /// Translate a failed content store call.
    pub fn store(operation: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Error::NotFound(id),
            other => Error::StoreUnavailable {
                operation,
                detail: other.to_string(),
            },
        }
    }

    pub fn envelope(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Encryption(d) => Error::Encryption(d),
            EnvelopeError::Decryption(d) => Error::Decryption(d),
            EnvelopeError::MalformedEnvelope(d) => Error::MalformedEnvelope(d),
        }
    }

    pub fn record(err: CoreError) -> Self {
        Error::MalformedRecord(err.to_string())
    }

    /// Whether retrying the same call later can succeed.
    ///
    /// An ambiguous submission is deliberately not retryable: the caller
    /// must first check whether it landed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::LedgerUnavailable { .. }
                | Error::StoreUnavailable { .. }
                | Error::LedgerRejected { .. }
        )
    }

    /// Short, actionable text for the user. Internal detail stays in logs.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(v) => match v {
                ValidationError::ExceedsStaked { .. }
                | ValidationError::ExceedsEarned { .. }
                | ValidationError::InsufficientStakeForFee { .. } => {
                    "Insufficient balance.".to_string()
                }
                ValidationError::NonPositiveAmount => {
                    "Enter an amount greater than zero.".to_string()
                }
                ValidationError::InvalidAddress(_) => "Enter a valid wallet address.".to_string(),
                ValidationError::AlreadyClaimed(_) => {
                    "This activity has already been rewarded.".to_string()
                }
                ValidationError::ActivityTooShort { .. } => {
                    "Keep going: rewards start after one minute.".to_string()
                }
                other => {
                    let text = other.to_string();
                    let mut chars = text.chars();
                    match chars.next() {
                        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
                        None => text,
                    }
                }
            },
            Error::LedgerRejected { .. } => {
                "The ledger rejected the transaction. Refresh and try again.".to_string()
            }
            Error::LedgerUnavailable { .. } => {
                "Wallet or network required. Check your connection and try again.".to_string()
            }
            Error::StoreUnavailable { .. } => {
                "Report storage is unreachable. Try again later.".to_string()
            }
            Error::SubmissionAmbiguous { .. } => {
                "Transaction status unknown. Check again before retrying.".to_string()
            }
            Error::NotEligible { .. } => {
                "Reports can only be added to confirmed sessions.".to_string()
            }
            Error::Unauthorized(_) => "Unauthorized.".to_string(),
            Error::NotFound(_) => "Report not yet available.".to_string(),
            Error::MalformedRecord(_) | Error::MalformedEnvelope(_) => {
                "Received data this app cannot read. Please update the app.".to_string()
            }
            Error::Encryption(_) => "The report could not be encrypted.".to_string(),
            Error::Decryption(_) => "The report could not be decrypted.".to_string(),
        }
    }
}

/// Result type for HabitStake operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use habitstake_core::Amount;

    #[test]
    fn test_submit_timeout_is_ambiguous() {
        let err = Error::ledger_submit("stake", LedgerError::Timeout("no receipt".into()));
        assert!(matches!(err, Error::SubmissionAmbiguous { operation: "stake", .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_read_timeout_is_unavailable() {
        let err = Error::ledger_read("account_snapshot", LedgerError::Timeout("slow".into()));
        assert!(matches!(err, Error::LedgerUnavailable { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rejection_is_retryable_after_refresh() {
        let err = Error::ledger_submit("redeem", LedgerError::Rejected("insufficient".into()));
        assert!(matches!(err, Error::LedgerRejected { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_store_not_found_keeps_id() {
        let err = Error::store("get", StoreError::NotFound(ContentId::new("bafy")));
        assert!(matches!(err, Error::NotFound(id) if id.as_str() == "bafy"));

        let err = Error::store("put", StoreError::Unavailable("offline".into()));
        assert!(matches!(err, Error::StoreUnavailable { operation: "put", .. }));
    }

    #[test]
    fn test_integrity_errors_are_not_retryable() {
        for err in [
            Error::Unauthorized("x".into()),
            Error::MalformedEnvelope("x".into()),
            Error::Decryption("x".into()),
            Error::NotEligible {
                handle: BookingHandle::new(0),
                reason: "completed".into(),
            },
        ] {
            assert!(!err.is_retryable());
        }
    }

    #[test]
    fn test_user_messages() {
        let err = Error::from(ValidationError::ExceedsEarned {
            amount: Amount::tokens(150),
            earned: Amount::tokens(80),
        });
        assert_eq!(err.user_message(), "Insufficient balance.");
        assert_eq!(
            Error::NotFound(ContentId::new("x")).user_message(),
            "Report not yet available."
        );
        assert_eq!(
            Error::from(ValidationError::EmptyProviderName).user_message(),
            "Provider name is required."
        );
    }
}
