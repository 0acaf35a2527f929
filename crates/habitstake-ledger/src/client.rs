//! LedgerClient trait: the abstract interface to the ledger of record.

use async_trait::async_trait;
use habitstake_core::{
    AccountId, AccountSnapshot, Amount, BookingHandle, BookingRecord, BookingRole, ContentId,
    GlobalConstants, LedgerStats, ProviderProfile, TxReceipt,
};

use crate::error::Result;

/// Async access to the ledger on behalf of one signing account.
///
/// Reads may target any account. Submissions are signed by [`signer`] and
/// return once the ledger has confirmed them.
///
/// [`signer`]: LedgerClient::signer
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// The account submissions are signed by.
    fn signer(&self) -> &AccountId;

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    async fn account_snapshot(&self, account: &AccountId) -> Result<AccountSnapshot>;

    /// Unregistered accounts read back as the default profile.
    async fn provider_profile(&self, account: &AccountId) -> Result<ProviderProfile>;

    /// Bookings where `account` plays `role`, in ledger order.
    async fn bookings(&self, account: &AccountId, role: BookingRole) -> Result<Vec<BookingRecord>>;

    async fn global_constants(&self) -> Result<GlobalConstants>;

    async fn global_stats(&self) -> Result<LedgerStats>;

    // ─────────────────────────────────────────────────────────────────────────
    // Stake and rewards
    // ─────────────────────────────────────────────────────────────────────────

    async fn submit_stake(&self, amount: Amount) -> Result<TxReceipt>;

    async fn submit_unstake(&self, amount: Amount) -> Result<TxReceipt>;

    async fn submit_earn(&self, amount: Amount) -> Result<TxReceipt>;

    async fn submit_redeem(&self, amount: Amount) -> Result<TxReceipt>;

    // ─────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────

    /// Book a session, escrowing `fee` from the signer's stake.
    async fn submit_booking(&self, provider: &AccountId, fee: Amount) -> Result<TxReceipt>;

    async fn submit_cancel_booking(&self, handle: BookingHandle) -> Result<TxReceipt>;

    /// Record a report's content identifier against a booking.
    ///
    /// The ledger accepts one pointer per booking and marks it completed.
    async fn submit_report_pointer(
        &self,
        handle: BookingHandle,
        content_id: &ContentId,
    ) -> Result<TxReceipt>;

    // ─────────────────────────────────────────────────────────────────────────
    // Provider lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    async fn submit_register_provider(&self, display_name: &str) -> Result<TxReceipt>;

    async fn submit_deactivate_provider(&self) -> Result<TxReceipt>;

    async fn submit_reactivate_provider(&self) -> Result<TxReceipt>;
}
