//! # HabitStake
//!
//! Client core for the HabitStake wellness app: a mirror of the on-chain
//! stake and reward ledger, booking status reconciliation and an encrypted
//! therapy report exchange.
//!
//! ## Overview
//!
//! - **Ledger mirror**: cached balances, bookings and provider profile for
//!   one account. Every mutation validates against the ledger's caps,
//!   submits, then re-reads. Balances are never predicted locally.
//! - **Booking views**: the ledger's `Pending`/`Completed`/`Cancelled` codes
//!   projected to a display label and an upload gate, derived separately.
//! - **Report exchange**: per-patient encryption, envelope construction,
//!   content-addressed storage, the ledger pointer, and retrieval that
//!   checks ownership before decrypting.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use habitstake::{Config, HabitStake};
//! use habitstake::core::{AccountId, Amount, BookingHandle};
//! use habitstake::ledger::MemoryLedger;
//! use habitstake::store::MemoryContentStore;
//!
//! async fn example() -> habitstake::Result<()> {
//!     let ledger = MemoryLedger::new();
//!     let patient = AccountId::new("0x1111111111111111111111111111111111111111");
//!     let app = HabitStake::new(
//!         ledger.connect(patient.clone()),
//!         MemoryContentStore::new(),
//!         Config::default(),
//!     );
//!
//!     app.mirror().stake(Amount::tokens(100)).await?;
//!     let snapshot = app.mirror().refresh().await?;
//!     println!("staked {}", snapshot.account.staked);
//!
//!     let provider = AccountId::new("0x2222222222222222222222222222222222222222");
//!     let receipt = app
//!         .exchange()
//!         .upload(BookingHandle::new(0), "session notes", &patient, &provider)
//!         .await?;
//!     println!("report at {}", receipt.retrieval_reference);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `habitstake::core` - identifiers, amounts, booking and reward logic
//! - `habitstake::envelope` - report encryption and envelopes
//! - `habitstake::store` - content stores
//! - `habitstake::ledger` - ledger client and the in-memory ledger

pub mod config;
pub mod error;
pub mod exchange;
pub mod mirror;

use std::sync::Arc;

pub use habitstake_core as core;
pub use habitstake_envelope as envelope;
pub use habitstake_ledger as ledger;
pub use habitstake_store as store;

pub use config::{Config, ExchangeConfig, MirrorConfig};
pub use error::{Error, Result};
pub use exchange::{PendingUpload, ReportExchange, ReportRef, RetrievedReport, UploadReceipt};
pub use mirror::{ClaimReceipt, LedgerMirror, MirrorSnapshot};

pub use habitstake_core::{
    compute_session_reward, AccountId, ActivityCompleted, ActivityKind, Amount, BookingHandle,
    BookingStatus, BookingView, ContentId, DisplayStatus, TxReceipt,
};

use habitstake_ledger::LedgerClient;
use habitstake_store::ContentStore;

/// One account session: the mirror and the report exchange sharing it.
pub struct HabitStake<L: LedgerClient, S: ContentStore> {
    mirror: Arc<LedgerMirror<L>>,
    exchange: ReportExchange<L, S>,
}

impl<L: LedgerClient, S: ContentStore> HabitStake<L, S> {
    pub fn new(ledger: L, store: S, config: Config) -> Self {
        let mirror = Arc::new(LedgerMirror::new(ledger, config.mirror));
        let exchange = ReportExchange::new(Arc::clone(&mirror), Arc::new(store), config.exchange);
        Self { mirror, exchange }
    }

    /// The account this session signs for.
    pub fn account(&self) -> &AccountId {
        self.mirror.account()
    }

    pub fn mirror(&self) -> &Arc<LedgerMirror<L>> {
        &self.mirror
    }

    pub fn exchange(&self) -> &ReportExchange<L, S> {
        &self.exchange
    }
}
