//! SQLite-backed key-value store.
//!
//! # Responsibility
//! - Persist the serialized collection under `STORAGE_KEY` in `kv_store`.
//!
//! # Invariants
//! - One row per key; `save` is a single upsert statement.

use super::{decode_collection, encode_collection, PersistentStore, StoreResult, STORAGE_KEY};
use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::model::collection::Collection;
use log::{debug, error};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Collection store over one SQLite connection.
pub struct SqliteKvStore {
    conn: Connection,
    key: String,
}

impl SqliteKvStore {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            key: STORAGE_KEY.to_string(),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Underlying connection, for diagnostics and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Returns the raw stored text under the collection key.
    pub fn read_raw(&self) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [self.key.as_str()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Replaces the raw stored text under the collection key.
    pub fn write_raw(&self, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![self.key.as_str(), value],
        )?;
        Ok(())
    }
}

impl PersistentStore for SqliteKvStore {
    fn load(&self) -> Collection {
        match self.read_raw() {
            Ok(raw) => decode_collection(raw.as_deref(), "sqlite"),
            Err(err) => {
                error!(
                    "event=store_load module=store status=error backend=sqlite error_code=read_failed error={}",
                    err
                );
                Collection::new()
            }
        }
    }

    fn save(&self, collection: &Collection) -> StoreResult<()> {
        let encoded = encode_collection(collection)?;
        self.write_raw(&encoded)?;
        debug!(
            "event=store_save module=store status=ok backend=sqlite items={} bytes={}",
            collection.len(),
            encoded.len()
        );
        Ok(())
    }
}
