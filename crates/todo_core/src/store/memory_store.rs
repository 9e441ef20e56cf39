//! In-memory store sharing one slot between clones.

use super::{decode_collection, encode_collection, PersistentStore, StoreResult};
use crate::model::collection::Collection;
use std::sync::{Arc, Mutex, MutexGuard};

/// Volatile store; clones observe the same stored value.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    value: Option<String>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with raw stored text.
    pub fn with_raw(value: impl Into<String>) -> Self {
        let store = Self::new();
        store.lock().value = Some(value.into());
        store
    }

    /// Current raw stored text.
    pub fn raw(&self) -> Option<String> {
        self.lock().value.clone()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PersistentStore for MemoryStore {
    fn load(&self) -> Collection {
        let raw = self.raw();
        decode_collection(raw.as_deref(), "memory")
    }

    fn save(&self, collection: &Collection) -> StoreResult<()> {
        let encoded = encode_collection(collection)?;
        let mut slot = self.lock();
        slot.value = Some(encoded);
        slot.saves += 1;
        Ok(())
    }
}
