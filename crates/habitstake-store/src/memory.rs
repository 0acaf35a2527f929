//! In-memory implementation of the ContentStore trait.
//!
//! Same addressing as [`SqliteContentStore`](crate::SqliteContentStore) with
//! no persistence. Counts calls and can be switched into failure modes, so
//! tests can assert exactly which store operations an orchestrator made.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use habitstake_core::ContentId;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::traits::{content_id_for, gateway_reference, ContentStore, PutMetadata};

const DEFAULT_GATEWAY: &str = "https://gateway.pinata.cloud";

/// In-memory content store. All data is lost when dropped.
pub struct MemoryContentStore {
    gateway_base: String,
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    objects: HashMap<ContentId, StoredObject>,
    put_calls: usize,
    get_calls: usize,
    unavailable: bool,
}

struct StoredObject {
    object: Value,
    metadata: PutMetadata,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::with_gateway(DEFAULT_GATEWAY)
    }

    pub fn with_gateway(gateway_base: impl Into<String>) -> Self {
        Self {
            gateway_base: gateway_base.into(),
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Make every subsequent call fail with `Unavailable` (or stop doing so).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Number of `put` calls made, including failed ones.
    pub fn put_count(&self) -> usize {
        self.read().put_calls
    }

    /// Number of `get` calls made, including failed ones.
    pub fn get_count(&self) -> usize {
        self.read().get_calls
    }

    /// Number of distinct objects stored.
    pub fn len(&self) -> usize {
        self.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().objects.is_empty()
    }

    pub fn contains(&self, id: &ContentId) -> bool {
        self.read().objects.contains_key(id)
    }

    /// Metadata recorded with an object, if stored.
    pub fn metadata(&self, id: &ContentId) -> Option<PutMetadata> {
        self.read().objects.get(id).map(|o| o.metadata.clone())
    }

    /// Every stored object, for assertions over what crossed the boundary.
    pub fn objects(&self) -> Vec<Value> {
        self.read().objects.values().map(|o| o.object.clone()).collect()
    }

    /// Store an object under an arbitrary identifier, bypassing addressing.
    ///
    /// Lets tests plant objects a well-behaved writer would never produce.
    pub fn insert_raw(&self, id: ContentId, object: Value) {
        self.write().objects.insert(
            id,
            StoredObject {
                object,
                metadata: PutMetadata::default(),
            },
        );
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryStoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryStoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put_with_metadata(&self, object: &Value, metadata: &PutMetadata) -> Result<ContentId> {
        let mut inner = self.write();
        inner.put_calls += 1;
        if inner.unavailable {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }

        let id = content_id_for(object)?;
        inner.objects.entry(id.clone()).or_insert_with(|| StoredObject {
            object: object.clone(),
            metadata: metadata.clone(),
        });
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Value> {
        let mut inner = self.write();
        inner.get_calls += 1;
        if inner.unavailable {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }

        inner
            .objects
            .get(id)
            .map(|o| o.object.clone())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn retrieval_reference(&self, id: &ContentId) -> String {
        gateway_reference(&self.gateway_base, id)
    }
}
