//! # HabitStake Core
//!
//! Pure types and policies shared by every HabitStake crate: token amounts,
//! ledger identifiers, account and booking records, the booking reconciler,
//! the activity reward calculator and the local precondition checks that
//! run before a transaction is submitted.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Amount`] - Token quantity in the ledger's smallest unit
//! - [`AccountId`] - A ledger address; identity and key material for reports
//! - [`BookingRecord`] / [`BookingView`] - Raw ledger booking and its derived view
//! - [`RewardPolicy`] - Threshold-then-clamp reward shape, parameterized per activity
//!
//! ## Booking Status
//!
//! The ledger exposes three raw states. [`reconcile`] maps them onto what the
//! UI shows, and separately onto whether a report may still be uploaded:
//!
//! ```text
//! raw         display     report upload
//! Pending  -> Confirmed   allowed
//! Completed-> Completed   closed
//! Cancelled-> Cancelled   closed
//! ```
//!
//! A "Confirmed" label does not mean the provider was paid, and neither label
//! is ever used to gate anything. Gate on [`BookingView::report_upload_eligible`].

pub mod account;
pub mod amount;
pub mod booking;
pub mod error;
pub mod reward;
pub mod types;
pub mod validation;

pub use account::{AccountSnapshot, GlobalConstants, LedgerStats, ProviderProfile};
pub use amount::{Amount, TOKEN_DECIMALS};
pub use booking::{
    reconcile, reconcile_all, BookingRecord, BookingRole, BookingStatus, BookingSummary,
    BookingView, DisplayStatus,
};
pub use error::{CoreError, ValidationError};
pub use reward::{
    compute_session_reward, ActivityCompleted, ActivityKind, RewardPolicy, QUALIFYING_SECONDS,
};
pub use types::{AccountId, ActivityId, BookingHandle, ContentId, TxReceipt};
