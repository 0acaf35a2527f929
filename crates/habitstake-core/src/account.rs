//! Account-level ledger records.
//!
//! These are replaced wholesale on every refresh, never patched field by
//! field, so a local value can never drift from the ledger's.

use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// The ledger's view of one account's stake and rewards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub staked: Amount,
    pub earned: Amount,
    /// Consecutive qualifying periods, tracked by the ledger.
    pub streak: u32,
    /// Whether the account currently holds an active stake.
    pub active: bool,
}

/// The ledger's view of an account registered as a session provider.
///
/// An account that never registered reads back as the default (inactive,
/// empty name).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProfile {
    pub display_name: String,
    pub session_count: u32,
    pub active: bool,
    pub total_earnings: Amount,
}

impl ProviderProfile {
    /// Whether the account has ever registered as a provider.
    pub fn is_registered(&self) -> bool {
        !self.display_name.is_empty()
    }
}

/// Caps published by the ledger contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalConstants {
    pub max_stake: Amount,
    pub min_session_fee: Amount,
    pub max_reward: Amount,
}

/// Contract-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total_staked: Amount,
    pub total_rewards: Amount,
    pub total_bookings: u64,
}
