//! Durable whole-value storage for the item collection.
//!
//! # Responsibility
//! - Define the `PersistentStore` contract used by the engine.
//! - Keep serialization of the collection in one place.
//!
//! # Invariants
//! - `load` never fails: absent data yields an empty collection and
//!   unreadable data is logged and degrades to empty.
//! - `save` replaces the stored value as a whole; no partial writes.

use crate::db::DbError;
use crate::model::collection::Collection;
use crate::model::item::Item;
use log::{error, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory_store;
mod sqlite_store;

pub use memory_store::MemoryStore;
pub use sqlite_store::SqliteKvStore;

/// Fixed logical key holding the serialized collection.
pub const STORAGE_KEY: &str = "todos";

pub type StoreResult<T> = Result<T, StoreError>;

/// Store write/read failure.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialize(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "failed to serialize collection: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Storage contract for the item collection.
pub trait PersistentStore {
    /// Reads the stored collection, falling back to empty.
    fn load(&self) -> Collection;

    /// Overwrites the stored collection.
    fn save(&self, collection: &Collection) -> StoreResult<()>;
}

/// Serializes a collection to the persisted JSON array layout.
pub fn encode_collection(collection: &Collection) -> StoreResult<String> {
    Ok(serde_json::to_string(collection)?)
}

/// Parses the persisted layout, recovering to empty on failure.
///
/// `backend` only labels log events.
pub fn decode_collection(raw: Option<&str>, backend: &str) -> Collection {
    let Some(raw) = raw else {
        return Collection::new();
    };

    let items = match serde_json::from_str::<Vec<Item>>(raw) {
        Ok(items) => items,
        Err(err) => {
            error!(
                "event=store_load module=store status=error backend={} error_code=parse_failed bytes={} error={}",
                backend,
                raw.len(),
                err
            );
            return Collection::new();
        }
    };

    let (collection, dropped) = Collection::from_items_dedup(items);
    if !dropped.is_empty() {
        warn!(
            "event=store_load module=store status=repaired backend={} dropped_duplicates={}",
            backend,
            dropped.len()
        );
    }
    collection
}
