//! # HabitStake Ledger
//!
//! The interface to the external ledger of record, plus an in-process
//! simulation of it.
//!
//! ## Overview
//!
//! The ledger owns balances, bookings and the booking lifecycle. A
//! [`LedgerClient`] is a thin adapter over it: every read goes to the
//! ledger, nothing is cached, and a submission's receipt means only that the
//! ledger durably recorded the transaction. Callers that keep a local view
//! must re-read after submitting.
//!
//! ## Key Types
//!
//! - [`LedgerClient`] - Async reads and signed submissions for one account
//! - [`MemoryLedger`] - Shared in-process ledger enforcing the contract rules
//! - [`MemoryLedgerClient`] - A client bound to one account of a [`MemoryLedger`]
//!
//! ## Usage
//!
//! ```rust
//! use habitstake_core::{AccountId, Amount};
//! use habitstake_ledger::{LedgerClient, MemoryLedger};
//!
//! # async fn example() -> habitstake_ledger::Result<()> {
//! let ledger = MemoryLedger::new();
//! let alice = AccountId::new("0x1111111111111111111111111111111111111111");
//! let client = ledger.connect(alice.clone());
//!
//! client.submit_stake(Amount::tokens(100)).await?;
//! let snapshot = client.account_snapshot(&alice).await?;
//! assert_eq!(snapshot.staked, Amount::tokens(100));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod memory;

pub use client::LedgerClient;
pub use error::{LedgerError, Result};
pub use memory::{MemoryLedger, MemoryLedgerClient};
