//! Core domain logic for the todo app.
//! This crate is the single source of truth for collection invariants.

pub mod ack;
pub mod clock;
pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod store;

pub use ack::{
    AckClient, AckError, AckMethod, AckPayload, AckRequest, AckResponse, AckResult,
    HttpAckClient, LocalAckClient, PendingAck,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AckEndpoint, ConfigError, TodoConfig};
pub use engine::{Change, ItemCollectionEngine, Receipt};
pub use logging::{init_logging, logging_status};
pub use model::collection::Collection;
pub use model::item::{
    format_timestamp, truncate_to_millis, validate_title, Item, ItemId, ItemValidationError,
};
pub use store::{MemoryStore, PersistentStore, SqliteKvStore, StoreError, StoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
