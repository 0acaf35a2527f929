//! # HabitStake Testkit
//!
//! Testing utilities for HabitStake.
//!
//! - **Fixtures**: an in-memory ledger and content store with a patient and
//!   a provider account wired together
//! - **Generators**: proptest strategies for identifiers, amounts,
//!   activities and raw booking records
//! - **Vectors**: reward amounts the calculator must reproduce exactly
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use habitstake_testkit::TestFixture;
//! use habitstake::core::Amount;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let handle = fixture.booked_session(Amount::tokens(100), Amount::tokens(5)).await.unwrap();
//!     let session = fixture.patient_session();
//!     let snapshot = session.mirror().refresh().await.unwrap();
//!     assert!(snapshot.booking(handle).is_some());
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{FixtureExchange, FixtureMirror, FixtureSession, TestFixture};
