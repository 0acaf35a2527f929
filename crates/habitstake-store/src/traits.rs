//! ContentStore trait: the abstract interface to a content-addressed store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use habitstake_core::ContentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Non-sensitive labels attached to a stored object.
///
/// Backends that support metadata (pinning services) index objects by it;
/// others ignore it. Never put report content here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutMetadata {
    pub name: Option<String>,
    #[serde(rename = "keyvalues")]
    pub key_values: BTreeMap<String, String>,
}

impl PutMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            key_values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_values.insert(key.into(), value.into());
        self
    }
}

/// Async interface to a content-addressed store.
///
/// Identical objects always yield the same identifier within one backend.
/// Implementations never retry a failed `put` on their own.
#[async_trait]
pub trait ContentStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Object Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Store an object and return its content identifier.
    async fn put_with_metadata(&self, object: &Value, metadata: &PutMetadata) -> Result<ContentId>;

    /// Store an object with no metadata.
    async fn put(&self, object: &Value) -> Result<ContentId> {
        self.put_with_metadata(object, &PutMetadata::default()).await
    }

    /// Fetch an object. Fails with `NotFound` if nothing is stored under `id`.
    async fn get(&self, id: &ContentId) -> Result<Value>;

    // ─────────────────────────────────────────────────────────────────────────
    // References
    // ─────────────────────────────────────────────────────────────────────────

    /// A human-followable link for `id`. Pure; makes no request.
    fn retrieval_reference(&self, id: &ContentId) -> String;
}

/// The local addressing scheme: `b3` + Blake3 hex of the object's JSON bytes.
///
/// `serde_json::Value` objects serialize with sorted keys, so logically
/// equal objects hash equally.
pub fn content_id_for(object: &Value) -> Result<ContentId> {
    let bytes = serde_json::to_vec(object)?;
    Ok(ContentId::new(format!("b3{}", blake3::hash(&bytes).to_hex())))
}

/// `{gateway}/ipfs/{id}`, tolerating a trailing slash or a bare host name.
pub fn gateway_reference(gateway_base: &str, id: &ContentId) -> String {
    let base = gateway_base.trim_end_matches('/');
    if base.starts_with("http://") || base.starts_with("https://") {
        format!("{base}/ipfs/{id}")
    } else {
        format!("https://{base}/ipfs/{id}")
    }
}
