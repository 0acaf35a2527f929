//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use habitstake::{Config, ExchangeConfig, LedgerMirror, MirrorConfig, ReportExchange};
use habitstake_core::{AccountId, Amount, BookingHandle};
use habitstake_ledger::{LedgerClient, MemoryLedger, MemoryLedgerClient};
use habitstake_store::MemoryContentStore;

pub type FixtureMirror = LedgerMirror<MemoryLedgerClient>;
pub type FixtureExchange = ReportExchange<MemoryLedgerClient, MemoryContentStore>;

pub const PATIENT: &str = "0xA11CE00000000000000000000000000000000001";
pub const PROVIDER: &str = "0xB0B0000000000000000000000000000000000002";
pub const STRANGER: &str = "0xC4A1000000000000000000000000000000000003";

/// A shared ledger and content store with three known accounts.
pub struct TestFixture {
    pub ledger: Arc<MemoryLedger>,
    pub store: Arc<MemoryContentStore>,
    pub patient: AccountId,
    pub provider: AccountId,
    /// Party to nothing.
    pub stranger: AccountId,
    pub config: Config,
}

/// A mirror and exchange signing as one account of the fixture.
pub struct FixtureSession {
    mirror: Arc<FixtureMirror>,
    exchange: FixtureExchange,
}

impl FixtureSession {
    pub fn mirror(&self) -> &Arc<FixtureMirror> {
        &self.mirror
    }

    pub fn exchange(&self) -> &FixtureExchange {
        &self.exchange
    }
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            ledger: MemoryLedger::new(),
            store: Arc::new(MemoryContentStore::new()),
            patient: AccountId::new(PATIENT),
            provider: AccountId::new(PROVIDER),
            stranger: AccountId::new(STRANGER),
            config,
        }
    }

    /// Short timeouts, for tests that provoke them.
    pub fn with_timeouts(read_ms: u64, submit_ms: u64, store_ms: u64) -> Self {
        use std::time::Duration;

        Self::with_config(Config {
            mirror: MirrorConfig {
                read_timeout: Duration::from_millis(read_ms),
                submit_timeout: Duration::from_millis(submit_ms),
            },
            exchange: ExchangeConfig {
                gateway_base: None,
                store_timeout: Duration::from_millis(store_ms),
            },
        })
    }

    pub fn client(&self, account: &AccountId) -> MemoryLedgerClient {
        self.ledger.connect(account.clone())
    }

    /// A session signing as `account`, sharing the fixture's store.
    pub fn session(&self, account: &AccountId) -> FixtureSession {
        let mirror = Arc::new(LedgerMirror::new(
            self.client(account),
            self.config.mirror.clone(),
        ));
        let exchange = ReportExchange::new(
            Arc::clone(&mirror),
            Arc::clone(&self.store),
            self.config.exchange.clone(),
        );
        FixtureSession { mirror, exchange }
    }

    pub fn patient_session(&self) -> FixtureSession {
        self.session(&self.patient)
    }

    pub fn provider_session(&self) -> FixtureSession {
        self.session(&self.provider)
    }

    /// Register the provider, stake for the patient and book one session,
    /// straight against the ledger.
    pub async fn booked_session(
        &self,
        stake: Amount,
        fee: Amount,
    ) -> habitstake_ledger::Result<BookingHandle> {
        let provider = self.client(&self.provider);
        if !self.ledger.provider(&self.provider).active {
            provider.submit_register_provider("Dr. Bob").await?;
        }

        let patient = self.client(&self.patient);
        patient.submit_stake(stake).await?;
        patient.submit_booking(&self.provider, fee).await?;
        Ok(BookingHandle::new(self.ledger.stats().total_bookings - 1))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitstake_core::BookingStatus;

    #[tokio::test]
    async fn test_booked_session() {
        let fixture = TestFixture::new();
        let handle = fixture
            .booked_session(Amount::tokens(50), Amount::tokens(5))
            .await
            .unwrap();

        let record = fixture.ledger.booking(handle).unwrap();
        assert!(record.patient.matches(&fixture.patient));
        assert!(record.provider.matches(&fixture.provider));
        assert_eq!(record.status, BookingStatus::Pending.code());
        assert_eq!(fixture.ledger.account(&fixture.patient).staked, Amount::tokens(45));
    }

    #[tokio::test]
    async fn test_sessions_share_store() {
        let fixture = TestFixture::new();
        let a = fixture.patient_session();
        let b = fixture.provider_session();
        assert!(Arc::ptr_eq(a.exchange().store(), b.exchange().store()));
        assert_eq!(a.mirror().account(), &fixture.patient);
    }
}
