//! # Ledger Mirror
//!
//! The process-wide view of what the ledger says about one account.
//!
//! Every mutating operation follows the same path:
//!
//! ```text
//! lock -> (refresh if stale) -> validate locally -> submit -> await receipt -> refresh -> unlock
//! ```
//!
//! Balances are never predicted locally. After a confirmed submission the
//! mirror re-reads the ledger; a refresh either replaces the whole snapshot
//! or leaves the previous one in place.
//!
//! Mutations are serialized by an async mutex, so two operations issued
//! back to back never validate against the same pre-transaction snapshot.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use habitstake_core::validation;
use habitstake_core::{
    reconcile_all, AccountId, AccountSnapshot, ActivityCompleted, ActivityId, Amount,
    BookingHandle, BookingRole, BookingSummary, BookingView, ContentId, GlobalConstants,
    LedgerStats, ProviderProfile, TxReceipt, ValidationError, QUALIFYING_SECONDS,
};
use habitstake_ledger::LedgerClient;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::config::MirrorConfig;
use crate::error::{Error, Result};

/// Everything the mirror knows, read from the ledger in one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSnapshot {
    pub account: AccountSnapshot,
    /// Default (unregistered) unless the account registered as a provider.
    pub provider: ProviderProfile,
    pub patient_bookings: Vec<BookingView>,
    /// Empty unless the account registered as a provider.
    pub provider_bookings: Vec<BookingView>,
    pub stats: LedgerStats,
    pub refreshed_at: DateTime<Utc>,
}

impl MirrorSnapshot {
    /// Find a booking the account is party to, in either role.
    pub fn booking(&self, handle: BookingHandle) -> Option<&BookingView> {
        self.patient_bookings
            .iter()
            .chain(self.provider_bookings.iter())
            .find(|b| b.handle() == handle)
    }

    pub fn patient_summary(&self) -> BookingSummary {
        BookingSummary::from_views(&self.patient_bookings)
    }

    pub fn provider_summary(&self) -> BookingSummary {
        BookingSummary::from_views(&self.provider_bookings)
    }
}

/// Outcome of a confirmed activity reward claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimReceipt {
    pub receipt: TxReceipt,
    pub amount: Amount,
}

/// Serialized operation state.
#[derive(Default)]
struct OpState {
    /// Activity instances already submitted, including ambiguous ones.
    claimed: HashSet<ActivityId>,
}

/// Cached, refresh-on-demand view of one account on the ledger.
///
/// Create one per account session and share it (it is `Send + Sync`);
/// every screen reads the same snapshot.
pub struct LedgerMirror<L: LedgerClient> {
    ledger: Arc<L>,
    account: AccountId,
    config: MirrorConfig,
    /// Fetched once per session.
    constants: OnceCell<GlobalConstants>,
    current: RwLock<Option<Arc<MirrorSnapshot>>>,
    /// Set when the ledger may have moved without a successful refresh.
    stale: AtomicBool,
    ops: Mutex<OpState>,
}

impl<L: LedgerClient> LedgerMirror<L> {
    pub fn new(ledger: L, config: MirrorConfig) -> Self {
        Self::from_arc(Arc::new(ledger), config)
    }

    /// Mirror the account `ledger` signs for.
    pub fn from_arc(ledger: Arc<L>, config: MirrorConfig) -> Self {
        let account = ledger.signer().clone();
        Self {
            ledger,
            account,
            config,
            constants: OnceCell::new(),
            current: RwLock::new(None),
            stale: AtomicBool::new(false),
            ops: Mutex::new(OpState::default()),
        }
    }

    pub fn account(&self) -> &AccountId {
        &self.account
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// The last successful refresh, if any. May be stale.
    pub fn snapshot(&self) -> Option<Arc<MirrorSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True before the first refresh, and after any operation whose effect
    /// on the ledger could not be read back.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::SeqCst) || self.snapshot().is_none()
    }

    /// A booking view from the last snapshot.
    pub fn booking(&self, handle: BookingHandle) -> Option<BookingView> {
        self.snapshot().and_then(|s| s.booking(handle).cloned())
    }

    /// Ledger caps. Read once, then cached for the session.
    pub async fn constants(&self) -> Result<GlobalConstants> {
        self.constants
            .get_or_try_init(|| self.timed_read("global_constants", self.ledger.global_constants()))
            .await
            .copied()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Refresh
    // ─────────────────────────────────────────────────────────────────────────

    /// Re-read everything and replace the snapshot.
    ///
    /// On any failure the previous snapshot is kept untouched.
    pub async fn refresh(&self) -> Result<Arc<MirrorSnapshot>> {
        let _ops = self.ops.lock().await;
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<Arc<MirrorSnapshot>> {
        let ledger = &*self.ledger;
        let account = &self.account;

        let (account_snapshot, provider, patient_raw, stats) = tokio::try_join!(
            self.timed_read("account_snapshot", ledger.account_snapshot(account)),
            self.timed_read("provider_profile", ledger.provider_profile(account)),
            self.timed_read(
                "patient_bookings",
                ledger.bookings(account, BookingRole::Patient)
            ),
            self.timed_read("global_stats", ledger.global_stats()),
        )?;

        let provider_raw = if provider.is_registered() {
            self.timed_read(
                "provider_bookings",
                ledger.bookings(account, BookingRole::Provider),
            )
            .await?
        } else {
            Vec::new()
        };

        let next = Arc::new(MirrorSnapshot {
            account: account_snapshot,
            provider,
            patient_bookings: reconcile_all(&patient_raw).map_err(Error::record)?,
            provider_bookings: reconcile_all(&provider_raw).map_err(Error::record)?,
            stats,
            refreshed_at: Utc::now(),
        });

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&next));
        self.stale.store(false, Ordering::SeqCst);

        debug!(
            account = %self.account,
            staked = %next.account.staked,
            earned = %next.account.earned,
            bookings = next.patient_bookings.len() + next.provider_bookings.len(),
            "mirror refreshed"
        );
        Ok(next)
    }

    async fn timed_read<T, F>(&self, operation: &'static str, read: F) -> Result<T>
    where
        F: Future<Output = habitstake_ledger::Result<T>>,
    {
        debug!(operation, account = %self.account, "ledger read");
        match timeout(self.config.read_timeout, read).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(Error::ledger_read(operation, e)),
            Err(_) => Err(Error::LedgerUnavailable {
                operation,
                detail: format!("no answer within {:?}", self.config.read_timeout),
            }),
        }
    }

    /// Current constants and a snapshot that is not known to be stale.
    async fn prepare(&self) -> Result<(Arc<MirrorSnapshot>, GlobalConstants)> {
        let constants = self.constants().await?;
        let snapshot = match self.snapshot() {
            Some(snapshot) if !self.stale.load(Ordering::SeqCst) => snapshot,
            _ => self.refresh_locked().await?,
        };
        Ok((snapshot, constants))
    }

    /// Submit, then refresh. A failed refresh does not undo a confirmed
    /// submission; it marks the mirror stale instead.
    async fn submit<F>(&self, operation: &'static str, submission: F) -> Result<TxReceipt>
    where
        F: Future<Output = habitstake_ledger::Result<TxReceipt>>,
    {
        debug!(operation, account = %self.account, "submitting transaction");

        // Stale until the post-submit refresh lands, so a caller that drops
        // this future midway leaves the next operation to re-read first.
        let was_stale = self.stale.swap(true, Ordering::SeqCst);

        let receipt = match timeout(self.config.submit_timeout, submission).await {
            Ok(Ok(receipt)) => receipt,
            Ok(Err(e)) => {
                let err = Error::ledger_submit(operation, e);
                match &err {
                    Error::SubmissionAmbiguous { .. } => {
                        warn!(operation, account = %self.account, error = %err, "submission outcome unknown");
                    }
                    Error::LedgerRejected { .. } => {
                        warn!(operation, account = %self.account, error = %err, "ledger rejected transaction");
                    }
                    _ => {
                        // Never reached the ledger.
                        self.stale.store(was_stale, Ordering::SeqCst);
                        debug!(operation, error = %err, "submission not delivered");
                    }
                }
                return Err(err);
            }
            Err(_) => {
                let err = Error::SubmissionAmbiguous {
                    operation,
                    detail: format!("no confirmation within {:?}", self.config.submit_timeout),
                };
                warn!(operation, account = %self.account, error = %err, "submission outcome unknown");
                return Err(err);
            }
        };

        info!(operation, account = %self.account, tx = %receipt, "transaction confirmed");

        if let Err(e) = self.refresh_locked().await {
            warn!(
                operation,
                tx = %receipt,
                error = %e,
                "refresh after confirmed transaction failed, mirror marked stale"
            );
        }
        Ok(receipt)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Stake and rewards
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn stake(&self, amount: Amount) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        let (_, constants) = self.prepare().await?;
        validation::check_stake(amount, &constants)?;
        self.submit("stake", self.ledger.submit_stake(amount)).await
    }

    /// Checked against the mirrored stake. A concurrent change elsewhere
    /// surfaces as `LedgerRejected`.
    pub async fn unstake(&self, amount: Amount) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        let (snapshot, _) = self.prepare().await?;
        validation::check_unstake(amount, &snapshot.account)?;
        self.submit("unstake", self.ledger.submit_unstake(amount)).await
    }

    pub async fn earn(&self, amount: Amount) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        let (_, constants) = self.prepare().await?;
        validation::check_earn(amount, &constants)?;
        self.submit("earn", self.ledger.submit_earn(amount)).await
    }

    /// Never clamps: asking for more than the mirrored earned balance fails.
    pub async fn redeem(&self, amount: Amount) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        let (snapshot, _) = self.prepare().await?;
        validation::check_redeem(amount, &snapshot.account)?;
        self.submit("redeem", self.ledger.submit_redeem(amount)).await
    }

    /// The reward `event` would earn now, capped at the ledger maximum.
    pub async fn reward_for(&self, event: &ActivityCompleted) -> Result<Amount> {
        let _ops = self.ops.lock().await;
        let (snapshot, constants) = self.prepare().await?;
        Ok(reward_amount(event, &snapshot.account, &constants)?)
    }

    /// Compute and submit the reward for a completed activity.
    ///
    /// Each activity instance is submitted at most once per mirror. An
    /// instance whose submission came back ambiguous counts as claimed; the
    /// caller must refresh and check the earned balance rather than retry.
    pub async fn claim_activity(&self, event: &ActivityCompleted) -> Result<ClaimReceipt> {
        let mut ops = self.ops.lock().await;
        if ops.claimed.contains(&event.id) {
            return Err(ValidationError::AlreadyClaimed(event.id.clone()).into());
        }

        let (snapshot, constants) = self.prepare().await?;
        let amount = reward_amount(event, &snapshot.account, &constants)?;
        validation::check_earn(amount, &constants)?;

        debug!(activity = %event.id, kind = event.kind.as_str(), %amount, "claiming activity reward");
        let result = self.submit("earn", self.ledger.submit_earn(amount)).await;

        if matches!(result, Ok(_) | Err(Error::SubmissionAmbiguous { .. })) {
            ops.claimed.insert(event.id.clone());
        }
        result.map(|receipt| ClaimReceipt { receipt, amount })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bookings
    // ─────────────────────────────────────────────────────────────────────────

    /// Book a session with `provider`, escrowing `fee` from the stake.
    pub async fn book(&self, provider: &str, fee: Amount) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        let (snapshot, constants) = self.prepare().await?;
        let provider = validation::check_booking(provider, fee, &snapshot.account, &constants)?;
        self.submit("book", self.ledger.submit_booking(&provider, fee))
            .await
    }

    /// Cancel one of this account's pending bookings.
    pub async fn cancel(&self, handle: BookingHandle) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        let (snapshot, _) = self.prepare().await?;
        validation::check_cancel(handle, &snapshot.patient_bookings)?;
        self.submit("cancel_booking", self.ledger.submit_cancel_booking(handle))
            .await
    }

    /// Record a report pointer. Eligibility is the caller's responsibility.
    pub(crate) async fn submit_report_pointer(
        &self,
        handle: BookingHandle,
        content_id: &ContentId,
    ) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        self.submit(
            "report_pointer",
            self.ledger.submit_report_pointer(handle, content_id),
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Provider lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn register_provider(&self, display_name: &str) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        let (snapshot, _) = self.prepare().await?;
        let name = validation::check_provider_name(display_name, &snapshot.provider)?;
        self.submit("register_provider", self.ledger.submit_register_provider(&name))
            .await
    }

    pub async fn deactivate_provider(&self) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        let (snapshot, _) = self.prepare().await?;
        validation::check_deactivate(&snapshot.provider)?;
        self.submit("deactivate_provider", self.ledger.submit_deactivate_provider())
            .await
    }

    pub async fn reactivate_provider(&self) -> Result<TxReceipt> {
        let _ops = self.ops.lock().await;
        let (snapshot, _) = self.prepare().await?;
        validation::check_reactivate(&snapshot.provider)?;
        self.submit("reactivate_provider", self.ledger.submit_reactivate_provider())
            .await
    }
}

fn reward_amount(
    event: &ActivityCompleted,
    account: &AccountSnapshot,
    constants: &GlobalConstants,
) -> std::result::Result<Amount, ValidationError> {
    if event.kind.requires_active_account() && !account.active {
        return Err(ValidationError::AccountInactive);
    }
    let policy = event.kind.default_policy().capped_at(constants.max_reward);
    let amount = policy.compute(event.elapsed_seconds, account.streak);
    if amount.is_zero() {
        return Err(ValidationError::ActivityTooShort {
            elapsed_seconds: event.elapsed_seconds,
            required_seconds: QUALIFYING_SECONDS,
        });
    }
    Ok(amount)
}
