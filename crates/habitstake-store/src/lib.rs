//! # HabitStake Store
//!
//! Clients for the content-addressed store that holds report envelopes.
//!
//! ## Overview
//!
//! The store is an external collaborator: it accepts a JSON object and hands
//! back a content identifier derived from the object's bytes, and returns the
//! object again given that identifier. Nothing here interprets what is
//! stored; encryption and ownership checks happen before an object reaches a
//! store and after it comes back.
//!
//! ## Key Types
//!
//! - [`ContentStore`] - The async trait every backend implements
//! - [`PinningStore`] - HTTP client for a Pinata-style pinning service
//! - [`SqliteContentStore`] - Local SQLite store for development and offline caches
//! - [`MemoryContentStore`] - In-memory store with fault injection for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use habitstake_store::{ContentStore, PinningConfig, PinningStore};
//! use serde_json::json;
//!
//! async fn example() -> habitstake_store::Result<()> {
//!     let store = PinningStore::new(PinningConfig::from_env()?)?;
//!
//!     let id = store.put(&json!({ "hello": "world" })).await?;
//!     println!("{}", store.retrieval_reference(&id));
//!
//!     let object = store.get(&id).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No silent retries**: a failed `put` is reported, never repeated. A
//!   write that landed but was not acknowledged would otherwise be repeated
//!   under a new identifier by backends that stamp metadata.
//! - **Local addressing**: the memory and SQLite backends address content by
//!   `b3` + the Blake3 hex digest of the object's JSON bytes.

pub mod error;
pub mod memory;
pub mod migration;
pub mod pinning;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryContentStore;
pub use pinning::{PinningConfig, PinningStore};
pub use sqlite::SqliteContentStore;
pub use traits::{content_id_for, gateway_reference, ContentStore, PutMetadata};
