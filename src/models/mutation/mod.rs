// Mutation module
// Descriptors handed from drop resolution to the optimistic cache

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::event::{resolve_color, CalendarEvent, EventKind, EventTiming, TaskLink};

/// Which occurrences of a recurring series an edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringScope {
    /// Only the dragged occurrence.
    This,
    /// The dragged occurrence and all future ones.
    All,
}

impl RecurringScope {
    pub fn label(&self) -> &'static str {
        match self {
            RecurringScope::This => "this occurrence",
            RecurringScope::All => "all future occurrences",
        }
    }
}

/// What kind of user action produced an update; selects the success message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateKind {
    #[default]
    Drag,
    Edit,
}

/// Partial update of an event's time fields.
///
/// Unset fields are left untouched. `start`/`end` describe a timed event,
/// `start_date`/`end_date` an all-day one; `all_day` switches between them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    /// Store id of the event.
    pub id: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: Option<bool>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub scope: Option<RecurringScope>,
}

impl EventPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_scope(mut self, scope: Option<RecurringScope>) -> Self {
        self.scope = scope;
        self
    }

    /// Apply the patch to a copy of `event`.
    ///
    /// A timed result always uses absolute instants as its authoritative
    /// representation; an all-day result uses whole dates.
    pub fn apply_to(&self, event: &CalendarEvent) -> CalendarEvent {
        let mut patched = event.clone();
        let all_day = self.all_day.unwrap_or_else(|| event.is_all_day());

        patched.timing = if all_day {
            match (&event.timing, self.start_date, self.end_date) {
                (_, Some(start_date), Some(end_date)) => EventTiming::AllDay {
                    start_date,
                    end_date,
                },
                (
                    EventTiming::AllDay {
                        start_date,
                        end_date,
                    },
                    start,
                    end,
                ) => EventTiming::AllDay {
                    start_date: start.unwrap_or(*start_date),
                    end_date: end.unwrap_or(*end_date),
                },
                (timing, start, end) => {
                    let (s, e) = timing.instants();
                    EventTiming::AllDay {
                        start_date: start.unwrap_or_else(|| s.date_naive()),
                        end_date: end.unwrap_or_else(|| e.date_naive()),
                    }
                }
            }
        } else {
            let (current_start, current_end) = event.instants();
            EventTiming::Instants {
                start: self.start.unwrap_or(current_start),
                end: self.end.unwrap_or(current_end),
            }
        };

        patched
    }
}

/// A new event to be created in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub timing: EventTiming,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub kind: EventKind,
    #[serde(default)]
    pub task_link: Option<TaskLink>,
}

impl NewEvent {
    pub fn new(title: impl Into<String>, timing: EventTiming) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            timing,
            calendar_id: None,
            color: None,
            kind: EventKind::Event,
            task_link: None,
        }
    }

    /// Local stand-in record shown until the store confirms the create.
    pub fn to_placeholder(&self, placeholder_id: impl Into<String>) -> CalendarEvent {
        CalendarEvent {
            id: placeholder_id.into(),
            remote_id: None,
            title: self.title.clone(),
            description: self.description.clone(),
            color: resolve_color(self.color.as_deref(), None),
            timing: self.timing.clone(),
            is_editable: true,
            recurring_series_id: None,
            calendar_id: self.calendar_id.clone(),
            kind: self.kind,
            task_link: self.task_link.clone(),
        }
    }
}
