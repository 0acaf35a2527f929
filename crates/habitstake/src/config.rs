//! Configuration for the mirror and the report exchange.
//!
//! Durations are written as whole seconds when deserialized:
//!
//! ```json
//! { "mirror": { "readTimeout": 15, "submitTimeout": 120 },
//!   "exchange": { "gatewayBase": "https://gateway.pinata.cloud", "storeTimeout": 60 } }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounds on ledger calls made by the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MirrorConfig {
    /// A read that takes longer counts as `LedgerUnavailable`.
    #[serde(with = "secs")]
    pub read_timeout: Duration,
    /// A submission that takes longer counts as `SubmissionAmbiguous`.
    #[serde(with = "secs")]
    pub submit_timeout: Duration,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(15),
            submit_timeout: Duration::from_secs(120),
        }
    }
}

/// Report exchange settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExchangeConfig {
    /// Gateway used for retrieval references. `None` uses the store's own.
    pub gateway_base: Option<String>,
    #[serde(with = "secs")]
    pub store_timeout: Duration,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            gateway_base: None,
            store_timeout: Duration::from_secs(60),
        }
    }
}

/// All facade settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mirror: MirrorConfig,
    pub exchange: ExchangeConfig,
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
