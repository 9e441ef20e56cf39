//! Todo item domain model.
//!
//! # Responsibility
//! - Define the canonical to-do record persisted by the store.
//! - Own title validation shared by engine and UI boundary.
//! - Fix the wire format of timestamps (`createdAt` / `updatedAt`).
//!
//! # Invariants
//! - `id` is stable for the item lifetime and never reused.
//! - `title` is non-empty after trimming whitespace.
//! - `updated_at` only moves on title/content edits, never on toggle.

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Opaque, stable item identifier.
///
/// New ids are UUID v4 strings. Ids loaded from storage are kept verbatim,
/// so older numeric ids stay addressable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Allocates a fresh unique id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps a new id value supplied by a caller.
    ///
    /// # Errors
    /// - Returns `ItemValidationError::EmptyId` for blank input.
    pub fn parse(value: impl Into<String>) -> Result<Self, ItemValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ItemValidationError::EmptyId);
        }
        Ok(Self(value))
    }

    /// Wraps any value verbatim for addressing stored items.
    ///
    /// Blank values are allowed: they match a stored item with that id or
    /// nothing at all.
    pub fn lookup(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validation errors for item input and persisted item state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemValidationError {
    /// Title is empty or whitespace only.
    EmptyTitle,
    /// Identifier is empty or whitespace only.
    EmptyId,
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::EmptyId => write!(f, "item id must not be empty"),
        }
    }
}

impl Error for ItemValidationError {}

/// Checks the non-empty title rule used by create and update.
///
/// The title itself is stored untrimmed; only emptiness is judged on the
/// trimmed value. A byte order mark counts as blank.
pub fn validate_title(title: &str) -> Result<(), ItemValidationError> {
    if title
        .trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
        .is_empty()
    {
        return Err(ItemValidationError::EmptyTitle);
    }
    Ok(())
}

/// One to-do entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    /// Free text, may be empty.
    pub content: String,
    pub completed: bool,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
    /// Refreshed by title/content edits only.
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Creates an open item with a generated id and both timestamps at `now`.
    ///
    /// # Errors
    /// - Returns `ItemValidationError::EmptyTitle` for a blank title.
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ItemValidationError> {
        Self::with_id(ItemId::generate(), title, content, now)
    }

    /// Creates an open item with a caller-provided id.
    ///
    /// `now` is truncated to whole milliseconds.
    pub fn with_id(
        id: ItemId,
        title: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ItemValidationError> {
        let title = title.into();
        validate_title(&title)?;
        let now = truncate_to_millis(now);
        Ok(Self {
            id,
            title,
            content: content.into(),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns a copy with `completed` flipped. Timestamps are untouched.
    pub fn toggled(&self) -> Self {
        Self {
            completed: !self.completed,
            ..self.clone()
        }
    }

    /// Returns a copy with replaced title/content and `updated_at = now`,
    /// truncated to whole milliseconds.
    pub fn edited(&self, title: &str, content: &str, now: DateTime<Utc>) -> Self {
        Self {
            title: title.to_string(),
            content: content.to_string(),
            updated_at: truncate_to_millis(now),
            ..self.clone()
        }
    }
}

/// Drops precision below one millisecond, the finest the wire format keeps.
pub fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    value
        .duration_trunc(TimeDelta::milliseconds(1))
        .unwrap_or(value)
}

/// Formats a timestamp as persisted: RFC 3339, milliseconds, `Z` suffix.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Serde adapter for persisted timestamps.
///
/// Parsing accepts any RFC 3339 offset and normalizes to UTC.
pub(crate) mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_timestamp(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|value| value.with_timezone(&Utc))
            .map_err(|err| serde::de::Error::custom(format!("invalid timestamp `{raw}`: {err}")))
    }
}
