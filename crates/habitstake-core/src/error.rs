//! Error types for HabitStake Core.

use thiserror::Error;

use crate::amount::Amount;
use crate::types::{ActivityId, BookingHandle};

/// Errors raised while interpreting data that came from outside the process.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A ledger record carried a value this build does not recognize.
    #[error("malformed record {handle}: {detail}")]
    MalformedRecord {
        handle: BookingHandle,
        detail: String,
    },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

/// A local precondition failed. No network call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("amount {amount} exceeds maximum stake of {max}")]
    ExceedsMaxStake { amount: Amount, max: Amount },

    #[error("amount {amount} exceeds staked balance {staked}")]
    ExceedsStaked { amount: Amount, staked: Amount },

    #[error("reward {amount} exceeds maximum of {max}")]
    ExceedsMaxReward { amount: Amount, max: Amount },

    #[error("amount {amount} exceeds earned balance {earned}")]
    ExceedsEarned { amount: Amount, earned: Amount },

    #[error("session fee {fee} is below the minimum of {min}")]
    FeeBelowMinimum { fee: Amount, min: Amount },

    #[error("insufficient staked balance {staked} for session fee {fee}")]
    InsufficientStakeForFee { fee: Amount, staked: Amount },

    #[error("invalid account address: {0}")]
    InvalidAddress(String),

    #[error("provider name is required")]
    EmptyProviderName,

    #[error("provider name is {len} characters, maximum is {max}")]
    ProviderNameTooLong { len: usize, max: usize },

    #[error("already registered as an active provider")]
    AlreadyProvider,

    #[error("not registered as a provider")]
    NotProvider,

    #[error("provider profile is already {0}")]
    ProviderState(&'static str),

    #[error("booking {0} not found")]
    BookingNotFound(BookingHandle),

    #[error("booking {handle} is {status}, only pending bookings can be cancelled")]
    BookingNotPending {
        handle: BookingHandle,
        status: &'static str,
    },

    #[error("activity ran {elapsed_seconds}s, at least {required_seconds}s are needed for a reward")]
    ActivityTooShort {
        elapsed_seconds: u64,
        required_seconds: u64,
    },

    #[error("reward for activity {0} was already claimed")]
    AlreadyClaimed(ActivityId),

    #[error("account must have an active stake for this activity")]
    AccountInactive,

    #[error("amount overflows the ledger's numeric range")]
    Overflow,
}
