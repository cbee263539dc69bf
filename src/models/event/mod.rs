// Event module
// Calendar event model as held by the client-side cache

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::utils::date::{localize, utc_midnight};

mod color;

pub use color::{resolve_color, DEFAULT_EVENT_COLOR};

/// Prefix for ids of records that exist only in the local cache.
pub const PLACEHOLDER_ID_PREFIX: &str = "temp-";

/// How an event's time span is stored.
///
/// Exactly one representation is authoritative per event. Every variant can be
/// resolved to absolute instants with [`EventTiming::instants`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EventTiming {
    /// Absolute start/end instants.
    #[serde(rename_all = "camelCase")]
    Instants {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        start: DateTime<Utc>,
        #[serde(with = "chrono::serde::ts_milliseconds")]
        end: DateTime<Utc>,
    },
    /// Whole calendar dates, unaffected by time-zone shifts.
    #[serde(rename_all = "camelCase")]
    AllDay {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    /// Wall-clock times in an explicit zone, as entered on the event form.
    #[serde(rename_all = "camelCase")]
    Zoned {
        start_date: NaiveDate,
        start_time: NaiveTime,
        end_date: NaiveDate,
        end_time: NaiveTime,
        time_zone: Tz,
    },
}

impl EventTiming {
    /// Resolve to absolute instants. All-day dates resolve to midnight UTC.
    pub fn instants(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            EventTiming::Instants { start, end } => (*start, *end),
            EventTiming::AllDay {
                start_date,
                end_date,
            } => (utc_midnight(*start_date), utc_midnight(*end_date)),
            EventTiming::Zoned {
                start_date,
                start_time,
                end_date,
                end_time,
                time_zone,
            } => (
                localize(*time_zone, start_date.and_time(*start_time)),
                localize(*time_zone, end_date.and_time(*end_time)),
            ),
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, EventTiming::AllDay { .. })
    }
}

/// Whether an event is a plain calendar entry or a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[default]
    Event,
    Task,
}

/// Link from a scheduled event back to the external task it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLink {
    pub external_task_id: String,
    pub url: String,
}

fn default_editable() -> bool {
    true
}

/// Calendar event as seen by the drag-and-drop engine and the query cache.
///
/// The remote store owns events; everything here is a copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Local/display key. Occurrences of a recurring series have distinct ids.
    pub id: String,
    /// Store id. Absent for records that only exist optimistically.
    #[serde(default)]
    pub remote_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub timing: EventTiming,
    #[serde(default = "default_editable")]
    pub is_editable: bool,
    #[serde(default)]
    pub recurring_series_id: Option<String>,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub kind: EventKind,
    #[serde(default)]
    pub task_link: Option<TaskLink>,
}

fn default_color() -> String {
    DEFAULT_EVENT_COLOR.to_string()
}

impl CalendarEvent {
    /// Create a timed event with required fields
    ///
    /// # Examples
    /// ```
    /// use calendar_dnd::models::event::CalendarEvent;
    /// use chrono::{Duration, TimeZone, Utc};
    ///
    /// let start = Utc.with_ymd_and_hms(2026, 1, 27, 10, 0, 0).unwrap();
    /// let event = CalendarEvent::timed("evt-1", "Standup", start, start + Duration::hours(1)).unwrap();
    /// assert_eq!(event.duration(), Duration::hours(1));
    /// ```
    pub fn timed(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, String> {
        let id = id.into();
        let event = Self {
            remote_id: Some(id.clone()),
            id,
            title: title.into(),
            description: String::new(),
            color: default_color(),
            timing: EventTiming::Instants { start, end },
            is_editable: true,
            recurring_series_id: None,
            calendar_id: None,
            kind: EventKind::Event,
            task_link: None,
        };
        event.validate_for_form()?;
        Ok(event)
    }

    /// Create an all-day event spanning `start_date..=end_date`.
    pub fn all_day(
        id: impl Into<String>,
        title: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, String> {
        let id = id.into();
        let event = Self {
            remote_id: Some(id.clone()),
            id,
            title: title.into(),
            description: String::new(),
            color: default_color(),
            timing: EventTiming::AllDay {
                start_date,
                end_date,
            },
            is_editable: true,
            recurring_series_id: None,
            calendar_id: None,
            kind: EventKind::Event,
            task_link: None,
        };
        event.validate()?;
        Ok(event)
    }

    /// Mark this event as locked (not editable by the current user).
    pub fn locked(mut self) -> Self {
        self.is_editable = false;
        self
    }

    /// Mark this event as one occurrence of a recurring series.
    pub fn in_series(mut self, series_id: impl Into<String>) -> Self {
        self.recurring_series_id = Some(series_id.into());
        self
    }

    /// Identity used by the cache: the store id when known, else the local id.
    pub fn record_key(&self) -> &str {
        self.remote_id.as_deref().unwrap_or(&self.id)
    }

    /// True for records synthesized locally that the store has not confirmed yet.
    pub fn is_placeholder(&self) -> bool {
        self.remote_id.is_none()
    }

    pub fn is_all_day(&self) -> bool {
        self.timing.is_all_day()
    }

    pub fn is_recurring(&self) -> bool {
        self.recurring_series_id.is_some()
    }

    pub fn instants(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.timing.instants()
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.instants().0
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.instants().1
    }

    pub fn duration(&self) -> Duration {
        let (start, end) = self.instants();
        end - start
    }

    /// Validate the stored-record invariant (`end >= start`) and the colour.
    pub fn validate(&self) -> Result<(), String> {
        if let EventTiming::AllDay {
            start_date,
            end_date,
        } = &self.timing
        {
            if end_date < start_date {
                return Err("Event end date must not be before start date".to_string());
            }
        } else {
            let (start, end) = self.instants();
            if end < start {
                return Err("Event end time must not be before start time".to_string());
            }
        }

        if !self.color.starts_with('#') || (self.color.len() != 7 && self.color.len() != 4) {
            return Err("Color must be in hex format (#RRGGBB or #RGB)".to_string());
        }

        Ok(())
    }

    /// Stricter check used by create/edit forms: non-empty title, `end > start`.
    pub fn validate_for_form(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Event title cannot be empty".to_string());
        }

        if !self.is_all_day() {
            let (start, end) = self.instants();
            if end <= start {
                return Err("Event end time must be after start time".to_string());
            }
        }

        self.validate()
    }
}
