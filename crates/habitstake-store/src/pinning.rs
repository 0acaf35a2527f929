//! HTTP client for a Pinata-style pinning service.
//!
//! Writes go to the pinning API, reads go through a public gateway:
//!
//! ```text
//! POST {api_base}/pinning/pinJSONToIPFS   Authorization: Bearer {jwt}
//!      { pinataContent, pinataMetadata: { name, keyvalues }, pinataOptions: { cidVersion: 1 } }
//!   -> { IpfsHash, PinSize, Timestamp }
//!
//! GET  {gateway_base}/ipfs/{cid}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use habitstake_core::ContentId;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::traits::{gateway_reference, ContentStore, PutMetadata};

/// Pinning service settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinningConfig {
    pub api_base: String,
    pub gateway_base: String,
    /// Bearer token for the pinning API. Never logged.
    pub jwt: String,
    pub timeout_secs: u64,
}

impl PinningConfig {
    pub const DEFAULT_API_BASE: &'static str = "https://api.pinata.cloud";
    pub const DEFAULT_GATEWAY: &'static str = "https://gateway.pinata.cloud";

    /// Read `PINATA_JWT` (required) and `PINATA_GATEWAY` (optional).
    pub fn from_env() -> Result<Self> {
        let jwt = std::env::var("PINATA_JWT")
            .map_err(|_| StoreError::Config("PINATA_JWT is not set".into()))?;
        let mut config = Self {
            jwt,
            ..Self::default()
        };
        if let Ok(gateway) = std::env::var("PINATA_GATEWAY") {
            if !gateway.trim().is_empty() {
                config.gateway_base = gateway.trim().to_string();
            }
        }
        Ok(config)
    }
}

impl Default for PinningConfig {
    fn default() -> Self {
        Self {
            api_base: Self::DEFAULT_API_BASE.to_string(),
            gateway_base: Self::DEFAULT_GATEWAY.to_string(),
            jwt: String::new(),
            timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for PinningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinningConfig")
            .field("api_base", &self.api_base)
            .field("gateway_base", &self.gateway_base)
            .field("jwt", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinJsonRequest<'a> {
    pinata_content: &'a Value,
    pinata_metadata: PinMetadataBody<'a>,
    pinata_options: PinOptions,
}

#[derive(Serialize)]
struct PinMetadataBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    keyvalues: &'a std::collections::BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PinOptions {
    cid_version: u8,
}

#[derive(Deserialize)]
struct PinJsonResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// [`ContentStore`] backed by a pinning service.
pub struct PinningStore {
    config: PinningConfig,
    client: Client,
}

impl PinningStore {
    /// Build a client. Fails if the JWT is empty or not a valid header value.
    pub fn new(config: PinningConfig) -> Result<Self> {
        if config.jwt.trim().is_empty() {
            return Err(StoreError::Config("pinning JWT is empty".into()));
        }

        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.jwt.trim()))
            .map_err(|_| StoreError::Config("pinning JWT is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &PinningConfig {
        &self.config
    }

    async fn error_for(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        StoreError::Server { status, message }
    }
}

#[async_trait]
impl ContentStore for PinningStore {
    async fn put_with_metadata(&self, object: &Value, metadata: &PutMetadata) -> Result<ContentId> {
        let url = format!(
            "{}/pinning/pinJSONToIPFS",
            self.config.api_base.trim_end_matches('/')
        );
        let body = PinJsonRequest {
            pinata_content: object,
            pinata_metadata: PinMetadataBody {
                name: metadata.name.as_deref(),
                keyvalues: &metadata.key_values,
            },
            pinata_options: PinOptions { cid_version: 1 },
        };

        tracing::debug!(%url, name = ?metadata.name, "pinning object");
        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let pinned: PinJsonResponse = response.json().await?;
        if pinned.ipfs_hash.is_empty() {
            return Err(StoreError::InvalidResponse("empty IpfsHash".into()));
        }
        Ok(ContentId::new(pinned.ipfs_hash))
    }

    async fn get(&self, id: &ContentId) -> Result<Value> {
        let url = self.retrieval_reference(id);

        tracing::debug!(content_id = %id, "fetching object from gateway");
        let response = self.client.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.clone()));
        }
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| StoreError::InvalidResponse(e.to_string()))
    }

    fn retrieval_reference(&self, id: &ContentId) -> String {
        gateway_reference(&self.config.gateway_base, id)
    }
}
