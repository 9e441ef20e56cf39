//! Todo domain model.
//!
//! # Responsibility
//! - Define the item record and the newest-first collection.
//! - Keep mutation rules pure so the engine decides when to persist.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId`.
//! - Deletion is a hard removal from the collection.

pub mod collection;
pub mod item;
