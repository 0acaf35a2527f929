//! Database schema migrations for SQLite.
//!
//! Each migration is a SQL batch taking the schema from version N to N+1.
//! Applied versions are recorded in `schema_migrations`.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current = current_version(conn)?;
    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Highest applied version, 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<u32> {
    let version: Option<u32> = conn
        .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| row.get(0))
        .optional()?
        .flatten();
    Ok(version.unwrap_or(0))
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {version}"
        ))),
    }
}

/// v1: object storage.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE objects (
            content_id TEXT PRIMARY KEY,      -- b3 + Blake3 hex of body
            body BLOB NOT NULL,               -- JSON bytes exactly as hashed
            stored_at INTEGER NOT NULL        -- local time of first put (Unix ms)
        );
        "#,
    )?;
    Ok(())
}

/// v2: pin metadata, queryable by key.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE objects ADD COLUMN name TEXT;

        CREATE TABLE object_labels (
            content_id TEXT NOT NULL REFERENCES objects(content_id),
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (content_id, key)
        );

        CREATE INDEX idx_object_labels_kv ON object_labels(key, value);
        "#,
    )?;
    Ok(())
}
