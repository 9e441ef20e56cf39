//! Item-collection state engine.
//!
//! # Responsibility
//! - Own the canonical in-memory collection for a session.
//! - Commit each mutation, then persist it, then dispatch its
//!   acknowledgement.
//! - Be the only writer to the `PersistentStore`.
//!
//! # Invariants
//! - Ordering per operation: mutate -> save -> dispatch acknowledgement.
//! - `save` runs at most once per operation and never before hydration.
//! - Blank titles are rejected before any mutation or acknowledgement.
//! - Unmatched ids change nothing locally but are still acknowledged.
//! - Acknowledgement outcomes never roll back local state.

use crate::ack::{dispatch, AckClient, AckRequest, PendingAck};
use crate::clock::Clock;
use crate::model::collection::Collection;
use crate::model::item::{validate_title, Item, ItemId, ItemValidationError};
use crate::store::PersistentStore;
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Whether an operation changed the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Changed,
    /// Target id was not present.
    Unchanged,
}

/// Result of one engine operation.
#[derive(Debug)]
pub enum Receipt {
    /// Input failed validation; nothing was mutated or acknowledged.
    Rejected(ItemValidationError),
    /// Local step finished and the acknowledgement is in flight.
    Dispatched {
        change: Change,
        /// A save for this operation completed successfully.
        persisted: bool,
        /// Id of the affected (or created) item.
        item_id: ItemId,
        ack: PendingAck,
    },
}

impl Receipt {
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn change(&self) -> Option<Change> {
        match self {
            Self::Rejected(_) => None,
            Self::Dispatched { change, .. } => Some(*change),
        }
    }

    pub fn item_id(&self) -> Option<&ItemId> {
        match self {
            Self::Rejected(_) => None,
            Self::Dispatched { item_id, .. } => Some(item_id),
        }
    }

    /// Takes the acknowledgement handle, if one was dispatched.
    pub fn into_ack(self) -> Option<PendingAck> {
        match self {
            Self::Rejected(_) => None,
            Self::Dispatched { ack, .. } => Some(ack),
        }
    }
}

/// Session owner of the item collection.
pub struct ItemCollectionEngine<S: PersistentStore> {
    store: S,
    ack: Arc<dyn AckClient>,
    clock: Arc<dyn Clock>,
    collection: Collection,
    hydrated: bool,
}

impl<S: PersistentStore> ItemCollectionEngine<S> {
    /// Creates an empty engine that has not read the store yet.
    pub fn new(store: S, ack: Arc<dyn AckClient>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ack,
            clock,
            collection: Collection::new(),
            hydrated: false,
        }
    }

    /// Creates an engine and hydrates it from the store.
    pub fn open(store: S, ack: Arc<dyn AckClient>, clock: Arc<dyn Clock>) -> Self {
        let mut engine = Self::new(store, ack, clock);
        engine.hydrate();
        engine
    }

    /// Loads the stored collection once.
    ///
    /// Stored data replaces whatever is in memory; later calls do nothing.
    pub fn hydrate(&mut self) {
        if self.hydrated {
            debug!("event=engine_hydrate module=engine status=skipped reason=already_hydrated");
            return;
        }
        self.collection = self.store.load();
        self.hydrated = true;
        info!(
            "event=engine_hydrate module=engine status=ok items={}",
            self.collection.len()
        );
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn items(&self) -> &[Item] {
        self.collection.items()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.collection.get(id)
    }

    /// Number of items not yet completed.
    pub fn remaining_count(&self) -> usize {
        self.collection.remaining_count()
    }

    /// Prepends a new open item.
    pub fn create(&mut self, title: &str, content: &str) -> Receipt {
        if let Err(err) = validate_title(title) {
            debug!("event=item_create module=engine status=rejected reason={err}");
            return Receipt::Rejected(err);
        }

        let item = match Item::new(title, content, self.clock.now()) {
            Ok(item) => item,
            Err(err) => return Receipt::Rejected(err),
        };
        let item_id = item.id.clone();
        let next = self.collection.with_created(item);
        self.finish("item_create", item_id, next, AckRequest::created(title, content))
    }

    /// Flips `completed` on the matching item. `updated_at` is kept.
    pub fn toggle(&mut self, id: &ItemId) -> Receipt {
        let requested = !self.get(id).is_some_and(|item| item.completed);
        let next = self.collection.with_toggled(id);
        self.finish("item_toggle", id.clone(), next, AckRequest::toggled(requested))
    }

    /// Replaces title/content on the matching item and stamps `updated_at`.
    pub fn update(&mut self, id: &ItemId, title: &str, content: &str) -> Receipt {
        if let Err(err) = validate_title(title) {
            debug!("event=item_update module=engine status=rejected item_id={id} reason={err}");
            return Receipt::Rejected(err);
        }

        let next = self
            .collection
            .with_updated(id, title, content, self.clock.now());
        self.finish("item_update", id.clone(), next, AckRequest::updated(title, content))
    }

    /// Removes the matching item.
    pub fn delete(&mut self, id: &ItemId) -> Receipt {
        let next = self.collection.without(id);
        self.finish("item_delete", id.clone(), next, AckRequest::deleted())
    }

    fn finish(
        &mut self,
        event: &str,
        item_id: ItemId,
        next: Option<Collection>,
        request: AckRequest,
    ) -> Receipt {
        let (change, persisted) = match next {
            Some(next) => (Change::Changed, self.commit(event, next)),
            None => {
                debug!("event={event} module=engine status=noop item_id={item_id}");
                (Change::Unchanged, false)
            }
        };

        let ack = dispatch(Arc::clone(&self.ack), request);
        Receipt::Dispatched {
            change,
            persisted,
            item_id,
            ack,
        }
    }

    fn commit(&mut self, event: &str, next: Collection) -> bool {
        self.collection = next;

        if !self.hydrated {
            warn!("event={event} module=engine status=ok persisted=false reason=not_hydrated");
            return false;
        }

        match self.store.save(&self.collection) {
            Ok(()) => {
                info!(
                    "event={event} module=engine status=ok persisted=true items={}",
                    self.collection.len()
                );
                true
            }
            Err(err) => {
                error!(
                    "event={event} module=engine status=error error_code=save_failed error={err}"
                );
                false
            }
        }
    }
}
