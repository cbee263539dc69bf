// Test fixtures - reusable test data
// Provides consistent events, stores and ranges across the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use calendar_dnd::models::event::CalendarEvent;
use calendar_dnd::models::mutation::{EventPatch, NewEvent};
use calendar_dnd::services::event_store::{EventRange, EventStore, SqliteEventStore, StoreError};

/// Sample instants and ranges, all in late January 2026
pub mod dates {
    use super::*;

    pub fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, day, hour, minute, 0).unwrap()
    }

    pub fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap()
    }

    /// Week view window, Mon Jan 26 - Sun Feb 1
    pub fn week_range() -> EventRange {
        EventRange::new(utc(26, 0, 0), Utc.with_ymd_and_hms(2026, 2, 1, 23, 59, 59).unwrap())
    }

    /// Month view window for January
    pub fn month_range() -> EventRange {
        EventRange::new(utc(1, 0, 0), utc(31, 23, 59))
    }

    /// Single day window for Jan 27
    pub fn day_range() -> EventRange {
        EventRange::new(utc(27, 0, 0), utc(27, 23, 59))
    }
}

/// Sample events for testing
pub mod events {
    use super::dates::utc;
    use super::*;

    /// The 10:00-11:00 review on Jan 27 used by the scenario tests
    pub fn review() -> CalendarEvent {
        CalendarEvent::timed("evt-review", "Design review", utc(27, 10, 0), utc(27, 11, 0)).unwrap()
    }

    pub fn lunch() -> CalendarEvent {
        CalendarEvent::timed("evt-lunch", "Lunch", utc(28, 12, 0), utc(28, 13, 0)).unwrap()
    }

    pub fn planning() -> CalendarEvent {
        CalendarEvent::timed("evt-planning", "Sprint planning", utc(12, 9, 0), utc(12, 10, 30)).unwrap()
    }

    pub fn offsite() -> CalendarEvent {
        CalendarEvent::all_day("evt-offsite", "Offsite", super::dates::jan(29), super::dates::jan(30)).unwrap()
    }

    pub fn standup_occurrence() -> CalendarEvent {
        CalendarEvent::timed(
            "evt-standup-0127",
            "Standup",
            utc(27, 9, 0),
            utc(27, 9, 0) + Duration::minutes(15),
        )
        .unwrap()
        .in_series("series-standup")
    }

    pub fn all() -> Vec<CalendarEvent> {
        vec![review(), lunch(), planning(), offsite()]
    }
}

/// Event store wrapper that counts writes and can be told to refuse them.
pub struct CountingStore {
    inner: SqliteEventStore,
    writes: AtomicUsize,
    refuse: bool,
}

impl CountingStore {
    pub fn seeded(events: &[CalendarEvent]) -> Arc<Self> {
        Arc::new(Self::build(events, false))
    }

    pub fn refusing(events: &[CalendarEvent]) -> Arc<Self> {
        Arc::new(Self::build(events, true))
    }

    fn build(events: &[CalendarEvent], refuse: bool) -> Self {
        let inner = SqliteEventStore::in_memory().unwrap();
        inner.add_calendar("work", "Work", Some("#10B981")).unwrap();
        for event in events {
            inner.insert_event(event).unwrap();
        }
        Self {
            inner,
            writes: AtomicUsize::new(0),
            refuse,
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &SqliteEventStore {
        &self.inner
    }

    fn record_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.refuse {
            Err(StoreError::Rejected("server unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl EventStore for CountingStore {
    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent, StoreError> {
        self.record_write()?;
        self.inner.create_event(event).await
    }

    async fn update_event(&self, patch: EventPatch) -> Result<CalendarEvent, StoreError> {
        self.record_write()?;
        self.inner.update_event(patch).await
    }

    async fn delete_event(&self, id: &str) -> Result<(), StoreError> {
        self.record_write()?;
        self.inner.delete_event(id).await
    }

    async fn events_in_range(&self, range: EventRange) -> Result<Vec<CalendarEvent>, StoreError> {
        self.inner.events_in_range(range).await
    }
}
