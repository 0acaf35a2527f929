//! SQLite implementation of the ContentStore trait.
//!
//! A local stand-in for the pinning service on development nodes, and an
//! offline cache of envelopes already fetched. Uses rusqlite with bundled
//! SQLite, wrapped in async via `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use habitstake_core::ContentId;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{content_id_for, gateway_reference, ContentStore, PutMetadata};

/// SQLite-backed content store.
///
/// Thread-safe via an internal mutex; every operation runs on the blocking
/// pool.
pub struct SqliteContentStore {
    conn: Arc<Mutex<Connection>>,
    gateway_base: String,
}

impl SqliteContentStore {
    /// Open a database file, creating and migrating it as needed.
    pub fn open(path: impl AsRef<Path>, gateway_base: impl Into<String>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?, gateway_base)
    }

    /// Open a private in-memory database.
    pub fn open_memory(gateway_base: impl Into<String>) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, gateway_base)
    }

    fn from_connection(mut conn: Connection, gateway_base: impl Into<String>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            gateway_base: gateway_base.into(),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("connection mutex poisoned: {e}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("blocking task failed: {e}")))?
    }

    /// Content identifiers labelled `key = value`, oldest first.
    pub async fn find_by_label(&self, key: &str, value: &str) -> Result<Vec<ContentId>> {
        let key = key.to_string();
        let value = value.to_string();
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT o.content_id FROM objects o
                 JOIN object_labels l ON l.content_id = o.content_id
                 WHERE l.key = ?1 AND l.value = ?2
                 ORDER BY o.stored_at, o.content_id",
            )?;
            let ids = stmt
                .query_map(params![key, value], |row| row.get::<_, String>(0))?
                .map(|r| r.map(ContentId::new))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
        .await
    }

    /// Number of stored objects.
    pub async fn count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM objects", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn put_with_metadata(&self, object: &Value, metadata: &PutMetadata) -> Result<ContentId> {
        let id = content_id_for(object)?;
        let body = serde_json::to_vec(object)?;
        let metadata = metadata.clone();
        let stored_id = id.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO objects (content_id, body, stored_at, name)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    stored_id.as_str(),
                    body,
                    chrono::Utc::now().timestamp_millis(),
                    metadata.name
                ],
            )?;
            // Identical content was stored before; keep its first labels.
            if inserted > 0 {
                for (key, value) in &metadata.key_values {
                    tx.execute(
                        "INSERT INTO object_labels (content_id, key, value) VALUES (?1, ?2, ?3)",
                        params![stored_id.as_str(), key, value],
                    )?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await?;

        tracing::debug!(content_id = %id, "stored object in sqlite");
        Ok(id)
    }

    async fn get(&self, id: &ContentId) -> Result<Value> {
        let lookup = id.clone();
        let body: Option<Vec<u8>> = self
            .blocking(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT body FROM objects WHERE content_id = ?1",
                        params![lookup.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?)
            })
            .await?;

        let body = body.ok_or_else(|| StoreError::NotFound(id.clone()))?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn retrieval_reference(&self, id: &ContentId) -> String {
        gateway_reference(&self.gateway_base, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const GATEWAY: &str = "https://gateway.pinata.cloud";

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = SqliteContentStore::open_memory(GATEWAY).unwrap();
        let object = json!({"cipherText": "abc", "sessionHandle": 1});

        let id = store.put(&object).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), object);
        assert_eq!(id, content_id_for(&object).unwrap());
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let store = SqliteContentStore::open_memory(GATEWAY).unwrap();
        let meta = PutMetadata::named("r").with("session", "1");

        let a = store.put_with_metadata(&json!({"a": 1}), &meta).await.unwrap();
        let b = store.put_with_metadata(&json!({"a": 1}), &meta).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_is_not_found() {
        let store = SqliteContentStore::open_memory(GATEWAY).unwrap();
        let err = store.get(&ContentId::new("b3nothing")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_by_label() {
        let store = SqliteContentStore::open_memory(GATEWAY).unwrap();
        let a = store
            .put_with_metadata(&json!({"n": 1}), &PutMetadata::named("a").with("patient", "p1"))
            .await
            .unwrap();
        store
            .put_with_metadata(&json!({"n": 2}), &PutMetadata::named("b").with("patient", "p2"))
            .await
            .unwrap();

        assert_eq!(store.find_by_label("patient", "p1").await.unwrap(), vec![a]);
        assert!(store.find_by_label("patient", "p3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("content.db");

        let id = {
            let store = SqliteContentStore::open(&path, GATEWAY).unwrap();
            store.put(&json!({"kept": true})).await.unwrap()
        };

        let store = SqliteContentStore::open(&path, GATEWAY).unwrap();
        assert_eq!(store.get(&id).await.unwrap(), json!({"kept": true}));
    }
}
