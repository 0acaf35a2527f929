//! In-process ledger simulation.
//!
//! [`MemoryLedger`] enforces the same rules as the deployed contract: caps,
//! balances, escrowed session fees and the one-way booking lifecycle. It is
//! shared between any number of [`MemoryLedgerClient`]s, one per signing
//! account, so tests can play patient and provider against the same ledger
//! and change state "externally" behind a client's back.
//!
//! Faults can be injected: unreachable reads, reads that fail part-way
//! through a refresh, rejected submissions, submissions that time out after
//! (or before) landing, and added latency.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use habitstake_core::{
    AccountId, AccountSnapshot, Amount, BookingHandle, BookingRecord, BookingRole, BookingStatus,
    ContentId, GlobalConstants, LedgerStats, ProviderProfile, TxReceipt,
};

use crate::client::LedgerClient;
use crate::error::{LedgerError, Result};

const MAX_PROVIDER_NAME_LEN: usize = 50;

/// Seconds between simulated blocks.
const BLOCK_INTERVAL: i64 = 12;

const GENESIS_TIME: i64 = 1_700_000_000;

/// Shared in-process ledger.
pub struct MemoryLedger {
    state: Mutex<LedgerState>,
}

struct LedgerState {
    constants: GlobalConstants,
    /// Keyed by normalized account id.
    accounts: HashMap<String, AccountSnapshot>,
    providers: HashMap<String, ProviderProfile>,
    /// Index is the booking handle.
    bookings: Vec<BookingRecord>,
    stats: LedgerStats,
    block_time: i64,
    nonce: u64,
    faults: Faults,
    reads: usize,
    submissions: usize,
}

#[derive(Default)]
struct Faults {
    reads_unavailable: bool,
    /// Successful reads left before reads start failing.
    reads_allowed: Option<usize>,
    submissions_unavailable: bool,
    /// Next submission times out; `true` if it lands first.
    ambiguous_next: Option<bool>,
    reject_next: Option<String>,
    latency: Option<Duration>,
}

#[derive(Debug, Clone)]
enum Op {
    Stake(Amount),
    Unstake(Amount),
    Earn(Amount),
    Redeem(Amount),
    Book { provider: AccountId, fee: Amount },
    Cancel(BookingHandle),
    ReportPointer { handle: BookingHandle, content_id: ContentId },
    RegisterProvider(String),
    DeactivateProvider,
    ReactivateProvider,
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::Stake(_) => "stake",
            Op::Unstake(_) => "unstake",
            Op::Earn(_) => "earn",
            Op::Redeem(_) => "redeem",
            Op::Book { .. } => "book",
            Op::Cancel(_) => "cancel_booking",
            Op::ReportPointer { .. } => "report_pointer",
            Op::RegisterProvider(_) => "register_provider",
            Op::DeactivateProvider => "deactivate_provider",
            Op::ReactivateProvider => "reactivate_provider",
        }
    }
}

fn reject(reason: impl Into<String>) -> LedgerError {
    LedgerError::Rejected(reason.into())
}

impl LedgerState {
    fn new(constants: GlobalConstants) -> Self {
        Self {
            constants,
            accounts: HashMap::new(),
            providers: HashMap::new(),
            bookings: Vec::new(),
            stats: LedgerStats::default(),
            block_time: GENESIS_TIME,
            nonce: 0,
            faults: Faults::default(),
            reads: 0,
            submissions: 0,
        }
    }

    fn account(&self, id: &AccountId) -> AccountSnapshot {
        self.accounts.get(&id.normalized()).cloned().unwrap_or_default()
    }

    fn account_mut(&mut self, id: &AccountId) -> &mut AccountSnapshot {
        self.accounts.entry(id.normalized()).or_default()
    }

    fn provider(&self, id: &AccountId) -> ProviderProfile {
        self.providers.get(&id.normalized()).cloned().unwrap_or_default()
    }

    fn provider_mut(&mut self, id: &AccountId) -> &mut ProviderProfile {
        self.providers.entry(id.normalized()).or_default()
    }

    fn booking_index(&self, handle: BookingHandle) -> Result<usize> {
        usize::try_from(handle.index())
            .ok()
            .filter(|i| *i < self.bookings.len())
            .ok_or_else(|| reject(format!("booking {handle} does not exist")))
    }

    fn check_read(&mut self) -> Result<()> {
        self.reads += 1;
        if self.faults.reads_unavailable {
            return Err(LedgerError::Transport("ledger node unreachable".into()));
        }
        if let Some(remaining) = self.faults.reads_allowed.as_mut() {
            if *remaining == 0 {
                return Err(LedgerError::Transport("ledger node unreachable".into()));
            }
            *remaining -= 1;
        }
        Ok(())
    }

    fn apply(&mut self, signer: &AccountId, op: &Op) -> Result<()> {
        match op {
            Op::Stake(amount) => {
                if amount.is_zero() {
                    return Err(reject("amount must be greater than zero"));
                }
                let max_stake = self.constants.max_stake;
                let account = self.account_mut(signer);
                let staked = account
                    .staked
                    .checked_add(*amount)
                    .filter(|s| *s <= max_stake)
                    .ok_or_else(|| reject("stake would exceed maximum"))?;
                account.staked = staked;
                account.active = true;
                self.stats.total_staked = self.stats.total_staked.saturating_add(*amount);
            }
            Op::Unstake(amount) => {
                if amount.is_zero() {
                    return Err(reject("amount must be greater than zero"));
                }
                let account = self.account_mut(signer);
                account.staked = account
                    .staked
                    .checked_sub(*amount)
                    .ok_or_else(|| reject("insufficient staked balance"))?;
                account.active = !account.staked.is_zero();
                self.stats.total_staked =
                    self.stats.total_staked.checked_sub(*amount).unwrap_or(Amount::ZERO);
            }
            Op::Earn(amount) => {
                if amount.is_zero() {
                    return Err(reject("amount must be greater than zero"));
                }
                if *amount > self.constants.max_reward {
                    return Err(reject("reward exceeds maximum"));
                }
                let account = self.account_mut(signer);
                account.earned = account
                    .earned
                    .checked_add(*amount)
                    .ok_or_else(|| reject("earned balance overflow"))?;
                account.streak = account.streak.saturating_add(1);
                self.stats.total_rewards = self.stats.total_rewards.saturating_add(*amount);
            }
            Op::Redeem(amount) => {
                if amount.is_zero() {
                    return Err(reject("amount must be greater than zero"));
                }
                let account = self.account_mut(signer);
                account.earned = account
                    .earned
                    .checked_sub(*amount)
                    .ok_or_else(|| reject("insufficient earned balance"))?;
            }
            Op::Book { provider, fee } => {
                if !self.provider(provider).active {
                    return Err(reject("provider is not active"));
                }
                if *fee < self.constants.min_session_fee {
                    return Err(reject("session fee below minimum"));
                }
                let account = self.account_mut(signer);
                account.staked = account
                    .staked
                    .checked_sub(*fee)
                    .ok_or_else(|| reject("insufficient stake for session fee"))?;
                account.active = !account.staked.is_zero();
                self.stats.total_staked =
                    self.stats.total_staked.checked_sub(*fee).unwrap_or(Amount::ZERO);

                let handle = BookingHandle::new(self.bookings.len() as u64);
                self.bookings.push(BookingRecord {
                    handle,
                    patient: signer.clone(),
                    provider: provider.clone(),
                    created_at: self.block_time,
                    session_fee: *fee,
                    report_pointer: None,
                    status: BookingStatus::Pending.code(),
                });
                self.stats.total_bookings += 1;
            }
            Op::Cancel(handle) => {
                let index = self.booking_index(*handle)?;
                let booking = &self.bookings[index];
                if !booking.patient.matches(signer) {
                    return Err(reject("only the patient can cancel"));
                }
                if booking.status != BookingStatus::Pending.code() {
                    return Err(reject("booking is not pending"));
                }
                let fee = booking.session_fee;
                self.bookings[index].status = BookingStatus::Cancelled.code();

                let account = self.account_mut(signer);
                account.staked = account.staked.saturating_add(fee);
                account.active = true;
                self.stats.total_staked = self.stats.total_staked.saturating_add(fee);
            }
            Op::ReportPointer { handle, content_id } => {
                let index = self.booking_index(*handle)?;
                let booking = &self.bookings[index];
                if !booking.patient.matches(signer) && !booking.provider.matches(signer) {
                    return Err(reject("signer is not a party to this booking"));
                }
                if booking.status != BookingStatus::Pending.code() {
                    return Err(reject("booking is not pending"));
                }
                if booking.report_pointer.is_some() {
                    return Err(reject("report already recorded"));
                }
                if content_id.is_empty() {
                    return Err(reject("empty content identifier"));
                }
                let fee = booking.session_fee;
                let provider = booking.provider.clone();

                let booking = &mut self.bookings[index];
                booking.report_pointer = Some(content_id.clone());
                booking.status = BookingStatus::Completed.code();

                let profile = self.provider_mut(&provider);
                profile.session_count = profile.session_count.saturating_add(1);
                profile.total_earnings = profile.total_earnings.saturating_add(fee);
            }
            Op::RegisterProvider(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(reject("name required"));
                }
                if name.chars().count() > MAX_PROVIDER_NAME_LEN {
                    return Err(reject("name too long"));
                }
                let profile = self.provider_mut(signer);
                if profile.active {
                    return Err(reject("already registered"));
                }
                profile.display_name = name.to_string();
                profile.active = true;
            }
            Op::DeactivateProvider => {
                let profile = self.provider_mut(signer);
                if !profile.active {
                    return Err(reject("provider is not active"));
                }
                profile.active = false;
            }
            Op::ReactivateProvider => {
                let profile = self.provider_mut(signer);
                if profile.display_name.is_empty() {
                    return Err(reject("not registered"));
                }
                if profile.active {
                    return Err(reject("provider is already active"));
                }
                profile.active = true;
            }
        }
        Ok(())
    }

    fn next_receipt(&mut self, signer: &AccountId, op: &Op) -> TxReceipt {
        self.nonce += 1;
        self.block_time += BLOCK_INTERVAL;
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.nonce.to_le_bytes());
        hasher.update(signer.normalized().as_bytes());
        hasher.update(op.name().as_bytes());
        TxReceipt::new(format!("0x{}", hasher.finalize().to_hex()))
    }
}

impl MemoryLedger {
    /// A ledger with the deployed contract's constants.
    pub fn new() -> Arc<Self> {
        Self::with_constants(Self::default_constants())
    }

    pub fn with_constants(constants: GlobalConstants) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LedgerState::new(constants)),
        })
    }

    /// 1000 token stake cap, 1 token minimum fee, 10 token reward cap.
    pub const fn default_constants() -> GlobalConstants {
        GlobalConstants {
            max_stake: Amount::tokens(1000),
            min_session_fee: Amount::tokens(1),
            max_reward: Amount::tokens(10),
        }
    }

    /// A client that signs as `account`.
    pub fn connect(self: &Arc<Self>, account: AccountId) -> MemoryLedgerClient {
        MemoryLedgerClient {
            ledger: Arc::clone(self),
            account,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        let latency = self.lock().faults.latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn read<T>(&self, f: impl FnOnce(&LedgerState) -> T) -> Result<T> {
        self.delay().await;
        let mut state = self.lock();
        state.check_read()?;
        Ok(f(&state))
    }

    async fn submit(&self, signer: &AccountId, op: Op) -> Result<TxReceipt> {
        self.delay().await;
        let mut state = self.lock();
        state.submissions += 1;

        if state.faults.submissions_unavailable {
            return Err(LedgerError::Transport("ledger node unreachable".into()));
        }
        if let Some(reason) = state.faults.reject_next.take() {
            return Err(LedgerError::Rejected(reason));
        }
        if let Some(landed) = state.faults.ambiguous_next.take() {
            if landed && state.apply(signer, &op).is_ok() {
                state.next_receipt(signer, &op);
            }
            return Err(LedgerError::Timeout(format!(
                "{} confirmation not received",
                op.name()
            )));
        }

        state.apply(signer, &op)?;
        let receipt = state.next_receipt(signer, &op);
        tracing::debug!(op = op.name(), signer = %signer, tx = %receipt, "memory ledger applied");
        Ok(receipt)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn account(&self, id: &AccountId) -> AccountSnapshot {
        self.lock().account(id)
    }

    pub fn provider(&self, id: &AccountId) -> ProviderProfile {
        self.lock().provider(id)
    }

    pub fn booking(&self, handle: BookingHandle) -> Option<BookingRecord> {
        let state = self.lock();
        let index = usize::try_from(handle.index()).ok()?;
        state.bookings.get(index).cloned()
    }

    pub fn stats(&self) -> LedgerStats {
        self.lock().stats
    }

    /// Reads served or refused so far.
    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Submissions received so far, including refused ones.
    pub fn submission_count(&self) -> usize {
        self.lock().submissions
    }

    // ─────────────────────────────────────────────────────────────────────────
    // External changes
    // ─────────────────────────────────────────────────────────────────────────

    /// Overwrite an account, as a transaction from another device would.
    pub fn set_account(&self, id: &AccountId, snapshot: AccountSnapshot) {
        *self.lock().account_mut(id) = snapshot;
    }

    /// Overwrite a booking's raw status code, valid or not.
    pub fn set_booking_status(&self, handle: BookingHandle, code: u8) {
        let mut state = self.lock();
        if let Some(booking) = usize::try_from(handle.index())
            .ok()
            .and_then(|i| state.bookings.get_mut(i))
        {
            booking.status = code;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fault injection
    // ─────────────────────────────────────────────────────────────────────────

    pub fn set_reads_unavailable(&self, unavailable: bool) {
        self.lock().faults.reads_unavailable = unavailable;
    }

    /// Serve `n` more reads, then fail every read after.
    pub fn fail_reads_after(&self, n: usize) {
        self.lock().faults.reads_allowed = Some(n);
    }

    pub fn set_submissions_unavailable(&self, unavailable: bool) {
        self.lock().faults.submissions_unavailable = unavailable;
    }

    /// Time out the next submission. If `landed`, it is applied first.
    pub fn time_out_next_submission(&self, landed: bool) {
        self.lock().faults.ambiguous_next = Some(landed);
    }

    pub fn reject_next_submission(&self, reason: impl Into<String>) {
        self.lock().faults.reject_next = Some(reason.into());
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().faults.latency = latency;
    }

    pub fn clear_faults(&self) {
        self.lock().faults = Faults::default();
    }
}

/// A [`LedgerClient`] signing as one account of a [`MemoryLedger`].
#[derive(Clone)]
pub struct MemoryLedgerClient {
    ledger: Arc<MemoryLedger>,
    account: AccountId,
}

impl MemoryLedgerClient {
    pub fn ledger(&self) -> &Arc<MemoryLedger> {
        &self.ledger
    }
}

#[async_trait]
impl LedgerClient for MemoryLedgerClient {
    fn signer(&self) -> &AccountId {
        &self.account
    }

    async fn account_snapshot(&self, account: &AccountId) -> Result<AccountSnapshot> {
        self.ledger.read(|s| s.account(account)).await
    }

    async fn provider_profile(&self, account: &AccountId) -> Result<ProviderProfile> {
        self.ledger.read(|s| s.provider(account)).await
    }

    async fn bookings(&self, account: &AccountId, role: BookingRole) -> Result<Vec<BookingRecord>> {
        self.ledger
            .read(|s| {
                s.bookings
                    .iter()
                    .filter(|b| match role {
                        BookingRole::Patient => b.patient.matches(account),
                        BookingRole::Provider => b.provider.matches(account),
                    })
                    .cloned()
                    .collect()
            })
            .await
    }

    async fn global_constants(&self) -> Result<GlobalConstants> {
        self.ledger.read(|s| s.constants).await
    }

    async fn global_stats(&self) -> Result<LedgerStats> {
        self.ledger.read(|s| s.stats).await
    }

    async fn submit_stake(&self, amount: Amount) -> Result<TxReceipt> {
        self.ledger.submit(&self.account, Op::Stake(amount)).await
    }

    async fn submit_unstake(&self, amount: Amount) -> Result<TxReceipt> {
        self.ledger.submit(&self.account, Op::Unstake(amount)).await
    }

    async fn submit_earn(&self, amount: Amount) -> Result<TxReceipt> {
        self.ledger.submit(&self.account, Op::Earn(amount)).await
    }

    async fn submit_redeem(&self, amount: Amount) -> Result<TxReceipt> {
        self.ledger.submit(&self.account, Op::Redeem(amount)).await
    }

    async fn submit_booking(&self, provider: &AccountId, fee: Amount) -> Result<TxReceipt> {
        let op = Op::Book {
            provider: provider.clone(),
            fee,
        };
        self.ledger.submit(&self.account, op).await
    }

    async fn submit_cancel_booking(&self, handle: BookingHandle) -> Result<TxReceipt> {
        self.ledger.submit(&self.account, Op::Cancel(handle)).await
    }

    async fn submit_report_pointer(
        &self,
        handle: BookingHandle,
        content_id: &ContentId,
    ) -> Result<TxReceipt> {
        let op = Op::ReportPointer {
            handle,
            content_id: content_id.clone(),
        };
        self.ledger.submit(&self.account, op).await
    }

    async fn submit_register_provider(&self, display_name: &str) -> Result<TxReceipt> {
        let op = Op::RegisterProvider(display_name.to_string());
        self.ledger.submit(&self.account, op).await
    }

    async fn submit_deactivate_provider(&self) -> Result<TxReceipt> {
        self.ledger.submit(&self.account, Op::DeactivateProvider).await
    }

    async fn submit_reactivate_provider(&self) -> Result<TxReceipt> {
        self.ledger.submit(&self.account, Op::ReactivateProvider).await
    }
}
