//! # HabitStake Envelope
//!
//! Report encryption and the envelope a report is stored in.
//!
//! ## Overview
//!
//! A therapy report is encrypted under a key derived from the patient's
//! account identifier, wrapped in a [`ReportEnvelope`] together with
//! non-sensitive routing metadata, and handed to a content store. Only the
//! envelope ever leaves the process; the plaintext never does.
//!
//! ## Key Derivation
//!
//! ```text
//! key = blake3_derive_key(CONTEXT, lowercase(account_id) || SALT)
//! ```
//!
//! The key is reproducible from the account identifier alone. No secret is
//! stored anywhere: the identifier plus a fixed, public salt is the entire
//! key material. This lets the patient rebuild the key from nothing but
//! their wallet address, with no separate key management.
//!
//! The cost is that confidentiality rests on nobody else knowing which
//! account identifier a report belongs to. On a public ledger identifiers
//! are not secret, so anyone who learns the patient's address can derive
//! the key. Replacing this with a random per-report key is only sound
//! together with a way for the patient to recover that key.
//!
//! ## Usage
//!
//! ```rust
//! use habitstake_core::{AccountId, BookingHandle};
//! use habitstake_envelope::{build_envelope, decrypt, encrypt};
//!
//! let patient = AccountId::new("0x8ba1f109551bD432803012645Ac136ddd64DBA72");
//! let provider = AccountId::new("0x2222222222222222222222222222222222222222");
//!
//! let cipher = encrypt("slept better this week", &patient).unwrap();
//! let envelope = build_envelope(cipher, patient.clone(), provider, BookingHandle::new(0));
//!
//! let plaintext = decrypt(&envelope.cipher_text, &patient).unwrap();
//! assert_eq!(plaintext, "slept better this week");
//! ```

pub mod crypto;
pub mod envelope;
pub mod error;

pub use crypto::{decrypt, derive_key, encrypt, CipherText, ReportKey};
pub use envelope::{
    build_envelope, build_envelope_at, parse_envelope, parse_envelope_bytes, ReportEnvelope,
    ReportMetadata, ENVELOPE_KIND, SCHEMA_VERSION,
};
pub use error::{EnvelopeError, Result};
