//! Remote event store contract.
//!
//! The store owns events; the query cache only holds copies. Writes are
//! async round-trips that may fail, and watched ranges receive pushed results
//! at any time (see [`RangePush`]).

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::event::CalendarEvent;
use crate::models::mutation::{EventPatch, NewEvent};

mod sqlite;

pub use sqlite::SqliteEventStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event {0} not found")]
    NotFound(String),
    #[error("event {0} is not editable")]
    NotEditable(String),
    #[error("event end must not be before its start")]
    InvalidRange,
    #[error("store rejected the change: {0}")]
    Rejected(String),
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Window of a range query, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventRange {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
}

impl EventRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether an event spanning `[start, end]` could be returned for this
    /// window once `buffer` is applied on both sides.
    ///
    /// The cache uses the same test as the store query so a patch reaches
    /// every entry the server would list the event in.
    pub fn could_contain(&self, start: DateTime<Utc>, end: DateTime<Utc>, buffer: Duration) -> bool {
        start <= self.end + buffer && end >= self.start - buffer
    }
}

impl std::fmt::Display for EventRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} .. {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// Fresh result of a watched range query, pushed by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangePush {
    pub range: EventRange,
    pub records: Vec<CalendarEvent>,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent, StoreError>;
    async fn update_event(&self, patch: EventPatch) -> Result<CalendarEvent, StoreError>;
    async fn delete_event(&self, id: &str) -> Result<(), StoreError>;
    async fn events_in_range(&self, range: EventRange) -> Result<Vec<CalendarEvent>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_could_contain_applies_buffer() {
        let week = EventRange::new(utc(26, 0), utc(31, 23));
        let day = Duration::days(1);

        assert!(week.could_contain(utc(27, 10), utc(27, 11), day));
        assert!(week.could_contain(utc(25, 10), utc(25, 11), day));
        assert!(!week.could_contain(utc(24, 10), utc(24, 11), day));
        assert!(!week.could_contain(utc(24, 10), utc(24, 11), Duration::zero()));
    }

    #[test]
    fn test_spanning_event_is_contained() {
        let day = EventRange::new(utc(27, 0), utc(27, 23));
        assert!(day.could_contain(utc(20, 0), utc(30, 0), Duration::zero()));
    }
}
