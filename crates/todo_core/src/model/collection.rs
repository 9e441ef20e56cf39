//! Ordered item collection and its pure mutations.
//!
//! # Responsibility
//! - Hold items newest-first.
//! - Compute the next collection for each mutation without side effects.
//!
//! # Invariants
//! - Item ids are unique within a collection.
//! - `with_*` / `without` return `None` when nothing would change, so
//!   callers can skip redundant persistence writes.

use crate::model::item::{Item, ItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Newest-first sequence of items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Collection {
    items: Vec<Item>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from stored order, dropping repeated ids.
    ///
    /// Returns the collection and the ids that were discarded. The first
    /// occurrence of an id wins.
    pub fn from_items_dedup(items: Vec<Item>) -> (Self, Vec<ItemId>) {
        let mut seen = HashSet::with_capacity(items.len());
        let mut dropped = Vec::new();
        let mut kept = Vec::with_capacity(items.len());
        for item in items {
            if seen.insert(item.id.clone()) {
                kept.push(item);
            } else {
                dropped.push(item.id);
            }
        }
        (Self { items: kept }, dropped)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Number of items not yet completed.
    pub fn remaining_count(&self) -> usize {
        self.items.iter().filter(|item| !item.completed).count()
    }

    /// Prepends `item`. Returns `None` if its id is already present.
    pub fn with_created(&self, item: Item) -> Option<Self> {
        if self.contains(&item.id) {
            return None;
        }
        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.push(item);
        items.extend(self.items.iter().cloned());
        Some(Self { items })
    }

    /// Flips `completed` on the matching item.
    pub fn with_toggled(&self, id: &ItemId) -> Option<Self> {
        self.replace_matching(id, Item::toggled)
    }

    /// Replaces title/content on the matching item and stamps `updated_at`.
    pub fn with_updated(
        &self,
        id: &ItemId,
        title: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        self.replace_matching(id, |item| item.edited(title, content, now))
    }

    /// Removes the matching item.
    pub fn without(&self, id: &ItemId) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        let items = self
            .items
            .iter()
            .filter(|item| &item.id != id)
            .cloned()
            .collect();
        Some(Self { items })
    }

    fn replace_matching(&self, id: &ItemId, f: impl Fn(&Item) -> Item) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        let items = self
            .items
            .iter()
            .map(|item| if &item.id == id { f(item) } else { item.clone() })
            .collect();
        Some(Self { items })
    }
}

impl From<Collection> for Vec<Item> {
    fn from(value: Collection) -> Self {
        value.items
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
