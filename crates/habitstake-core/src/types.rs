//! Strong type definitions for HabitStake identifiers.
//!
//! All identifiers are newtypes so a content identifier can never be passed
//! where an account or a booking handle is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Length of an address body in hex digits (20 bytes).
const ADDRESS_HEX_LEN: usize = 40;

/// A ledger account identifier.
///
/// Usually an `0x`-prefixed 20-byte hex address. Addresses compare
/// case-insensitively through [`AccountId::matches`]; the original spelling
/// is kept so records that embed it are never altered.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wrap an identifier supplied by the ledger or the wallet layer.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parse a user-supplied address, rejecting anything not address-like.
    pub fn parse_address(s: &str) -> Result<Self, ValidationError> {
        let id = Self::new(s.trim());
        if id.is_address() {
            Ok(id)
        } else {
            Err(ValidationError::InvalidAddress(s.to_string()))
        }
    }

    /// Get the identifier as given.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this looks like an `0x` + 40 hex digit address.
    pub fn is_address(&self) -> bool {
        match self.0.strip_prefix("0x").or_else(|| self.0.strip_prefix("0X")) {
            Some(body) => body.len() == ADDRESS_HEX_LEN && hex::decode(body).is_ok(),
            None => false,
        }
    }

    /// Canonical spelling: lowercase for addresses, unchanged otherwise.
    pub fn normalized(&self) -> String {
        if self.is_address() {
            self.0.to_ascii_lowercase()
        } else {
            self.0.clone()
        }
    }

    /// Identity comparison. Case-insensitive when both sides are addresses.
    pub fn matches(&self, other: &AccountId) -> bool {
        if self.is_address() && other.is_address() {
            self.0.eq_ignore_ascii_case(&other.0)
        } else {
            self.0 == other.0
        }
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A content identifier assigned by the content-addressed store.
///
/// Opaque to the core: identical content always yields the same identifier,
/// but the addressing scheme belongs to the store.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ledger's positional index of a booking.
///
/// This is the only addressing scheme the ledger accepts for cancellation and
/// report-pointer submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingHandle(pub u64);

impl BookingHandle {
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    pub const fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BookingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a confirmed ledger transaction (its hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxReceipt(String);

impl TxReceipt {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifies one completed activity instance (a timer run, a journal entry).
///
/// Assigned by whatever produced the completion event; used only to refuse a
/// second claim for the same instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
