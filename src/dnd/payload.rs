//! Typed drag data and drop zones.
//!
//! Anything attached to a drag arrives as loosely typed JSON. It is parsed into
//! [`DragPayload`] / [`DropTarget`] before any decision is made; data that does
//! not match is treated as "no recognized drag", never as an error.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::handles::ResizeEdge;
use crate::models::event::CalendarEvent;
use crate::models::task::TaskItem;
use crate::models::ui::ViewKind;

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DragPayload {
    #[serde(rename = "event", rename_all = "camelCase")]
    EventMove {
        event: CalendarEvent,
        /// View the drag started from, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_view: Option<ViewKind>,
    },
    #[serde(rename = "event-resize")]
    EventResize { event: CalendarEvent, edge: ResizeEdge },
    #[serde(rename = "task", rename_all = "camelCase")]
    TaskSchedule { task_item: TaskItem },
}

impl DragPayload {
    pub fn event_move(event: CalendarEvent) -> Self {
        DragPayload::EventMove {
            event,
            source_view: None,
        }
    }

    /// The event carried by move and resize drags.
    pub fn event(&self) -> Option<&CalendarEvent> {
        match self {
            DragPayload::EventMove { event, .. } | DragPayload::EventResize { event, .. } => {
                Some(event)
            }
            DragPayload::TaskSchedule { .. } => None,
        }
    }

    /// The wire tag of the payload, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            DragPayload::EventMove { .. } => "event",
            DragPayload::EventResize { .. } => "event-resize",
            DragPayload::TaskSchedule { .. } => "task",
        }
    }
}

/// Zone the pointer is over when the drag ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DropTarget {
    /// One 15-minute block of the day/week time grid.
    #[serde(rename = "time-block")]
    TimeBlock {
        #[serde(rename = "slotStartTimestamp", with = "chrono::serde::ts_milliseconds")]
        slot_start: DateTime<Utc>,
    },
    /// A month-grid day or the all-day row of the day/week grid.
    #[serde(rename = "day-cell")]
    DayCell { date: NaiveDate },
}

impl DropTarget {
    pub fn is_time_block(&self) -> bool {
        matches!(self, DropTarget::TimeBlock { .. })
    }
}

/// Parse attached drag data; `None` when it is not a recognized payload.
pub fn parse_payload(data: &Value) -> Option<DragPayload> {
    match serde_json::from_value::<DragPayload>(data.clone()) {
        Ok(payload) => Some(payload),
        Err(err) => {
            log::debug!("Ignoring unrecognized drag data: {}", err);
            None
        }
    }
}

/// Parse zone data; `None` when it is not a recognized drop target.
pub fn parse_target(data: &Value) -> Option<DropTarget> {
    serde_json::from_value::<DropTarget>(data.clone()).ok()
}

/// Pick the drop target among every zone under the pointer.
///
/// Unrecognized zones are skipped. A time block is more specific than a day
/// cell, so the first valid time block wins; otherwise the first valid day
/// cell applies.
pub fn resolve_target(candidates: &[Value]) -> Option<DropTarget> {
    let parsed: Vec<DropTarget> = candidates.iter().filter_map(parse_target).collect();

    parsed
        .iter()
        .find(|target| target.is_time_block())
        .or_else(|| parsed.first())
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn event_json() -> Value {
        json!({
            "id": "evt-1",
            "remoteId": "evt-1",
            "title": "Review",
            "timing": { "kind": "instants", "start": 1769508000000i64, "end": 1769511600000i64 }
        })
    }

    #[test]
    fn test_parse_event_move() {
        let payload = parse_payload(&json!({
            "type": "event",
            "event": event_json(),
            "sourceView": "month"
        }))
        .unwrap();

        match &payload {
            DragPayload::EventMove { event, source_view } => {
                assert_eq!(event.id, "evt-1");
                assert_eq!(*source_view, Some(ViewKind::Month));
            }
            other => panic!("unexpected payload {:?}", other),
        }
        assert_eq!(payload.kind(), "event");
        assert!(payload.event().unwrap().is_editable);
    }

    #[test]
    fn test_parse_resize_and_task() {
        let resize = parse_payload(&json!({
            "type": "event-resize",
            "event": event_json(),
            "edge": "bottom"
        }))
        .unwrap();
        assert!(matches!(
            resize,
            DragPayload::EventResize {
                edge: ResizeEdge::Bottom,
                ..
            }
        ));

        let task = parse_payload(&json!({
            "type": "task",
            "taskItem": {
                "_id": "t1",
                "externalTaskId": "lin_1",
                "title": "Ship it",
                "url": "https://example.test/t1"
            }
        }))
        .unwrap();
        assert!(task.event().is_none());
    }

    #[test]
    fn test_invalid_payloads_are_not_recognized() {
        assert!(parse_payload(&json!(null)).is_none());
        assert!(parse_payload(&json!({ "type": "sticker" })).is_none());
        assert!(parse_payload(&json!({ "type": "event-resize", "event": event_json(), "edge": "left" })).is_none());
        assert!(parse_payload(&json!({ "type": "event" })).is_none());
    }

    #[test]
    fn test_time_block_wins_over_day_cell() {
        let target = resolve_target(&[
            json!({ "type": "day-cell", "date": "2026-01-27" }),
            json!({ "type": "time-block", "slotStartTimestamp": 1769522400000i64 }),
        ])
        .unwrap();

        assert_eq!(
            target,
            DropTarget::TimeBlock {
                slot_start: Utc.with_ymd_and_hms(2026, 1, 27, 14, 0, 0).unwrap()
            }
        );
    }

    #[test]
    fn test_day_cell_applies_when_time_block_invalid() {
        let target = resolve_target(&[
            json!({ "type": "time-block", "slotStartTimestamp": "soon" }),
            json!({ "type": "day-cell", "date": "2026-01-30" }),
        ]);

        assert_eq!(
            target,
            Some(DropTarget::DayCell {
                date: NaiveDate::from_ymd_opt(2026, 1, 30).unwrap()
            })
        );
    }

    #[test]
    fn test_no_valid_target() {
        assert_eq!(resolve_target(&[]), None);
        assert_eq!(resolve_target(&[json!({ "type": "sidebar" })]), None);
    }
}
