//! Drop resolution: `(payload, target)` → mutation descriptor.
//!
//! Pure and synchronous. The recurring-scope question and the optimistic
//! dispatch happen afterwards in [`super::coordinator`].

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use super::handles::ResizeEdge;
use super::payload::{DragPayload, DropTarget};
use crate::models::event::{CalendarEvent, EventKind, EventTiming};
use crate::models::mutation::{EventPatch, NewEvent};
use crate::models::settings::Settings;
use crate::models::slot::SLOT_MINUTES;
use crate::models::task::TaskItem;
use crate::models::ui::ViewKind;
use crate::utils::date::{local_date, localize};

/// Shortest event a resize may produce.
pub fn min_event_duration() -> Duration {
    Duration::minutes(i64::from(SLOT_MINUTES))
}

/// Everything a drop needs to know beyond the payload and the target.
#[derive(Debug, Clone, PartialEq)]
pub struct DropContext {
    pub time_zone: Tz,
    /// View hosting the drop zones.
    pub view: ViewKind,
    pub task_duration: Duration,
    pub task_day_start_hour: u32,
    pub task_day_end_hour: u32,
    /// Calendar receiving events created from tasks.
    pub calendar_id: Option<String>,
}

impl DropContext {
    /// Task drops go to the configured default calendar, else the first known one.
    pub fn from_settings(settings: &Settings, view: ViewKind, calendar_ids: &[String]) -> Self {
        Self {
            time_zone: settings.time_zone,
            view,
            task_duration: settings.task_duration(),
            task_day_start_hour: settings.task_day_start_hour,
            task_day_end_hour: settings.task_day_end_hour,
            calendar_id: settings
                .default_calendar_id
                .clone()
                .or_else(|| calendar_ids.first().cloned()),
        }
    }
}

/// Why a drop produced nothing, without telling the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The event only exists optimistically.
    Unsaved,
    /// The drop leaves the event where it is.
    NoChange,
    /// Resizes only apply on the time grid.
    ResizeOffGrid,
    /// No calendar to create a task event in.
    NoCalendar,
}

/// Policy rejections; each one is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Locked,
    /// The dragged edge would cross the opposite edge.
    InvertedRange,
    /// The result would be shorter than one slot.
    TooShort,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::Locked => "You cannot move this event!",
            Rejection::InvertedRange => "An event cannot end before it starts",
            Rejection::TooShort => "Events must be at least 15 minutes long",
        }
    }
}

/// Result of resolving a drop.
#[derive(Debug, Clone, PartialEq)]
pub enum DropDecision {
    Ignore(IgnoreReason),
    Reject(Rejection),
    /// Reschedule an existing event. `event` is the dragged copy.
    Update { event: CalendarEvent, patch: EventPatch },
    /// Schedule a task as a new event.
    Create(NewEvent),
}

impl DropDecision {
    pub fn is_mutation(&self) -> bool {
        matches!(self, DropDecision::Update { .. } | DropDecision::Create(_))
    }
}

/// Compute the mutation for a finished drop.
pub fn resolve_drop(payload: &DragPayload, target: &DropTarget, ctx: &DropContext) -> DropDecision {
    let decision = match payload {
        DragPayload::TaskSchedule { task_item } => schedule_task(task_item, target, ctx),
        DragPayload::EventMove { event, .. } | DragPayload::EventResize { event, .. } => {
            guard(event).unwrap_or_else(|| match (payload, target) {
                (DragPayload::EventResize { edge, .. }, DropTarget::TimeBlock { slot_start }) => {
                    resize_to_slot(event, *edge, *slot_start)
                }
                (DragPayload::EventResize { .. }, DropTarget::DayCell { .. }) => {
                    DropDecision::Ignore(IgnoreReason::ResizeOffGrid)
                }
                (_, DropTarget::TimeBlock { slot_start }) => move_to_slot(event, *slot_start),
                (_, DropTarget::DayCell { date }) if ctx.view.has_time_grid() => {
                    move_to_all_day(event, *date)
                }
                (_, DropTarget::DayCell { date }) => move_to_day(event, *date, ctx.time_zone),
            })
        }
    };

    match &decision {
        DropDecision::Ignore(reason) => log::debug!("Drop of {} ignored: {:?}", payload.kind(), reason),
        DropDecision::Reject(rejection) => log::info!("Drop of {} rejected: {:?}", payload.kind(), rejection),
        DropDecision::Create(_) | DropDecision::Update { .. } => {}
    }
    decision
}

fn guard(event: &CalendarEvent) -> Option<DropDecision> {
    if event.remote_id.is_none() {
        Some(DropDecision::Ignore(IgnoreReason::Unsaved))
    } else if !event.is_editable {
        Some(DropDecision::Reject(Rejection::Locked))
    } else {
        None
    }
}

fn update(event: &CalendarEvent, patch: EventPatch) -> DropDecision {
    DropDecision::Update {
        event: event.clone(),
        patch,
    }
}

fn store_id(event: &CalendarEvent) -> String {
    event.record_key().to_string()
}

fn move_to_slot(event: &CalendarEvent, slot_start: DateTime<Utc>) -> DropDecision {
    let mut patch = EventPatch::new(store_id(event));

    if event.is_all_day() {
        // An all-day event dropped on the grid becomes a one-slot timed event
        patch.all_day = Some(false);
        patch.start = Some(slot_start);
        patch.end = Some(slot_start + min_event_duration());
        return update(event, patch);
    }

    let (start, end) = event.instants();
    if start == slot_start {
        return DropDecision::Ignore(IgnoreReason::NoChange);
    }

    patch.start = Some(slot_start);
    patch.end = Some(slot_start + (end - start));
    update(event, patch)
}

fn resize_to_slot(event: &CalendarEvent, edge: ResizeEdge, slot_start: DateTime<Utc>) -> DropDecision {
    if event.is_all_day() {
        return DropDecision::Ignore(IgnoreReason::ResizeOffGrid);
    }

    let (start, end) = event.instants();
    let (new_start, new_end) = match edge {
        ResizeEdge::Top => (slot_start, end),
        ResizeEdge::Bottom => (start, slot_start),
    };

    if new_end <= new_start {
        return DropDecision::Reject(Rejection::InvertedRange);
    }
    if new_end - new_start < min_event_duration() {
        return DropDecision::Reject(Rejection::TooShort);
    }
    if (new_start, new_end) == (start, end) {
        return DropDecision::Ignore(IgnoreReason::NoChange);
    }

    let mut patch = EventPatch::new(store_id(event));
    match edge {
        ResizeEdge::Top => patch.start = Some(new_start),
        ResizeEdge::Bottom => patch.end = Some(new_end),
    }
    update(event, patch)
}

/// All-day row of the day/week grid: the event becomes all-day on `date`.
fn move_to_all_day(event: &CalendarEvent, date: NaiveDate) -> DropDecision {
    if let EventTiming::AllDay {
        start_date,
        end_date,
    } = &event.timing
    {
        if *start_date == date && *end_date == date {
            return DropDecision::Ignore(IgnoreReason::NoChange);
        }
    }

    let mut patch = EventPatch::new(store_id(event));
    patch.all_day = Some(true);
    patch.start_date = Some(date);
    patch.end_date = Some(date);
    update(event, patch)
}

/// Month day cell: shift by whole days, keeping time of day and span.
fn move_to_day(event: &CalendarEvent, date: NaiveDate, tz: Tz) -> DropDecision {
    let mut patch = EventPatch::new(store_id(event));

    if let EventTiming::AllDay {
        start_date,
        end_date,
    } = &event.timing
    {
        let delta = date - *start_date;
        if delta.num_days() == 0 {
            return DropDecision::Ignore(IgnoreReason::NoChange);
        }
        patch.all_day = Some(true);
        patch.start_date = Some(date);
        patch.end_date = Some(*end_date + delta);
        return update(event, patch);
    }

    let (start, end) = event.instants();
    let local_start = start.with_timezone(&tz).naive_local();
    let local_end = end.with_timezone(&tz).naive_local();
    let delta = date - local_start.date();
    if delta.num_days() == 0 {
        return DropDecision::Ignore(IgnoreReason::NoChange);
    }

    // Wall-clock arithmetic, so a DST change between the dates keeps the times
    let new_start = localize(tz, local_start + delta);
    let new_end = localize(tz, local_end + delta);
    patch.all_day = Some(false);
    patch.start = Some(new_start);
    patch.end = Some(new_end.max(new_start));
    patch.start_date = Some(local_date(new_start, tz));
    patch.end_date = Some(local_date(new_end, tz));
    update(event, patch)
}

fn schedule_task(task: &TaskItem, target: &DropTarget, ctx: &DropContext) -> DropDecision {
    let Some(calendar_id) = ctx.calendar_id.clone() else {
        log::warn!("No calendar available to schedule task {}", task.id);
        return DropDecision::Ignore(IgnoreReason::NoCalendar);
    };

    let (start, end) = match target {
        DropTarget::TimeBlock { slot_start } => (*slot_start, *slot_start + ctx.task_duration),
        DropTarget::DayCell { date } => (
            localize(ctx.time_zone, date.and_time(hour(ctx.task_day_start_hour))),
            localize(
                ctx.time_zone,
                date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(ctx.task_day_end_hour)),
            ),
        ),
    };

    let mut new_event = NewEvent::new(task.title.clone(), EventTiming::Instants { start, end });
    new_event.calendar_id = Some(calendar_id);
    new_event.kind = EventKind::Task;
    new_event.task_link = Some(task.link());
    DropDecision::Create(new_event)
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h.min(23), 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Range an event would occupy if dropped on `target`, for the drop ring.
///
/// Only event moves over a time block have one; all-day events occupy one slot.
pub fn move_drop_range(payload: &DragPayload, target: &DropTarget) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let (DragPayload::EventMove { event, .. }, DropTarget::TimeBlock { slot_start }) = (payload, target) else {
        return None;
    };
    let duration = if event.is_all_day() {
        min_event_duration()
    } else {
        event.duration()
    };
    Some((*slot_start, *slot_start + duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, d, h, m, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    fn meeting() -> CalendarEvent {
        CalendarEvent::timed("evt-1", "Review", utc(27, 10, 0), utc(27, 11, 0)).unwrap()
    }

    fn ctx(view: ViewKind) -> DropContext {
        DropContext::from_settings(&Settings::default(), view, &["cal-1".to_string()])
    }

    fn block(d: u32, h: u32, m: u32) -> DropTarget {
        DropTarget::TimeBlock { slot_start: utc(d, h, m) }
    }

    fn patch_of(decision: DropDecision) -> EventPatch {
        match decision {
            DropDecision::Update { patch, .. } => patch,
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_move_to_time_block_preserves_duration() {
        let patch = patch_of(resolve_drop(
            &DragPayload::event_move(meeting()),
            &block(27, 14, 0),
            &ctx(ViewKind::Week),
        ));
        assert_eq!(patch.id, "evt-1");
        assert_eq!(patch.start, Some(utc(27, 14, 0)));
        assert_eq!(patch.end, Some(utc(27, 15, 0)));
        assert_eq!(patch.all_day, None);
    }

    #[test]
    fn test_move_to_same_slot_is_no_op() {
        let decision = resolve_drop(&DragPayload::event_move(meeting()), &block(27, 10, 0), &ctx(ViewKind::Day));
        assert_eq!(decision, DropDecision::Ignore(IgnoreReason::NoChange));
    }

    #[test]
    fn test_all_day_to_time_block_becomes_one_slot() {
        let event = CalendarEvent::all_day("evt-2", "Offsite", date(27), date(28)).unwrap();
        let patch = patch_of(resolve_drop(&DragPayload::event_move(event), &block(27, 9, 0), &ctx(ViewKind::Week)));
        assert_eq!(patch.all_day, Some(false));
        assert_eq!(patch.end, Some(utc(27, 9, 15)));
    }

    #[test]
    fn test_resize_edges() {
        let bottom = DragPayload::EventResize {
            event: meeting(),
            edge: ResizeEdge::Bottom,
        };
        let patch = patch_of(resolve_drop(&bottom, &block(27, 11, 30), &ctx(ViewKind::Day)));
        assert_eq!(patch.start, None);
        assert_eq!(patch.end, Some(utc(27, 11, 30)));

        let top = DragPayload::EventResize {
            event: meeting(),
            edge: ResizeEdge::Top,
        };
        let patch = patch_of(resolve_drop(&top, &block(27, 9, 15), &ctx(ViewKind::Day)));
        assert_eq!(patch.start, Some(utc(27, 9, 15)));
        assert_eq!(patch.end, None);
    }

    #[test]
    fn test_resize_across_opposite_edge_is_rejected() {
        let bottom = DragPayload::EventResize {
            event: meeting(),
            edge: ResizeEdge::Bottom,
        };
        assert_eq!(
            resolve_drop(&bottom, &block(27, 9, 0), &ctx(ViewKind::Day)),
            DropDecision::Reject(Rejection::InvertedRange)
        );
        assert_eq!(
            resolve_drop(&bottom, &block(27, 10, 0), &ctx(ViewKind::Day)),
            DropDecision::Reject(Rejection::InvertedRange)
        );

        let short = CalendarEvent::timed("evt-3", "Sync", utc(27, 10, 0), utc(27, 10, 5)).unwrap();
        let top = DragPayload::EventResize {
            event: short,
            edge: ResizeEdge::Top,
        };
        assert_eq!(
            resolve_drop(&top, &block(27, 9, 55), &ctx(ViewKind::Day)),
            DropDecision::Reject(Rejection::TooShort)
        );
    }

    #[test]
    fn test_resize_on_day_cell_is_ignored() {
        let payload = DragPayload::EventResize {
            event: meeting(),
            edge: ResizeEdge::Top,
        };
        let target = DropTarget::DayCell { date: date(28) };
        assert_eq!(
            resolve_drop(&payload, &target, &ctx(ViewKind::Week)),
            DropDecision::Ignore(IgnoreReason::ResizeOffGrid)
        );
    }

    #[test]
    fn test_locked_and_unsaved_events() {
        let locked = DragPayload::event_move(meeting().locked());
        assert_eq!(
            resolve_drop(&locked, &block(27, 14, 0), &ctx(ViewKind::Week)),
            DropDecision::Reject(Rejection::Locked)
        );
        assert_eq!(Rejection::Locked.message(), "You cannot move this event!");

        let mut unsaved = meeting();
        unsaved.remote_id = None;
        assert_eq!(
            resolve_drop(&DragPayload::event_move(unsaved), &block(27, 14, 0), &ctx(ViewKind::Week)),
            DropDecision::Ignore(IgnoreReason::Unsaved)
        );
    }

    #[test]
    fn test_month_day_cell_keeps_time_of_day() {
        let target = DropTarget::DayCell { date: date(30) };
        let patch = patch_of(resolve_drop(&DragPayload::event_move(meeting()), &target, &ctx(ViewKind::Month)));
        assert_eq!(patch.start, Some(utc(30, 10, 0)));
        assert_eq!(patch.end, Some(utc(30, 11, 0)));
        assert_eq!(patch.start_date, Some(date(30)));
    }

    #[test]
    fn test_month_day_cell_same_day_is_no_op() {
        let target = DropTarget::DayCell { date: date(27) };
        assert_eq!(
            resolve_drop(&DragPayload::event_move(meeting()), &target, &ctx(ViewKind::Month)),
            DropDecision::Ignore(IgnoreReason::NoChange)
        );
    }

    #[test]
    fn test_month_day_cell_shifts_all_day_span() {
        let event = CalendarEvent::all_day("evt-2", "Offsite", date(27), date(29)).unwrap();
        let target = DropTarget::DayCell { date: date(20) };
        let patch = patch_of(resolve_drop(&DragPayload::event_move(event), &target, &ctx(ViewKind::Month)));
        assert_eq!(patch.start_date, Some(date(20)));
        assert_eq!(patch.end_date, Some(date(22)));
        assert_eq!(patch.all_day, Some(true));
    }

    #[test]
    fn test_week_day_cell_converts_to_all_day() {
        let target = DropTarget::DayCell { date: date(29) };
        let patch = patch_of(resolve_drop(&DragPayload::event_move(meeting()), &target, &ctx(ViewKind::Week)));
        assert_eq!(patch.all_day, Some(true));
        assert_eq!(patch.start_date, Some(date(29)));
        assert_eq!(patch.end_date, Some(date(29)));
    }

    #[test]
    fn test_day_cell_uses_calendar_zone() {
        // 23:30 in New York on Jan 26 is 04:30 UTC on Jan 27
        let event = CalendarEvent::timed("evt-4", "Late call", utc(27, 4, 30), utc(27, 5, 0)).unwrap();
        let mut context = ctx(ViewKind::Month);
        context.time_zone = chrono_tz::America::New_York;
        let target = DropTarget::DayCell { date: date(28) };
        let patch = patch_of(resolve_drop(&DragPayload::event_move(event), &target, &context));
        assert_eq!(patch.start, Some(utc(29, 4, 30)));
        assert_eq!(patch.start_date, Some(date(28)));
    }

    fn task() -> DragPayload {
        DragPayload::TaskSchedule {
            task_item: TaskItem {
                id: "t1".to_string(),
                external_task_id: "lin_1".to_string(),
                title: "Write release notes".to_string(),
                identifier: Some("ENG-42".to_string()),
                url: "https://example.test/ENG-42".to_string(),
            },
        }
    }

    #[test]
    fn test_task_on_time_block_creates_hour_event() {
        let decision = resolve_drop(&task(), &block(27, 14, 0), &ctx(ViewKind::Week));
        let DropDecision::Create(new_event) = decision else {
            panic!("expected create");
        };
        assert_eq!(new_event.title, "Write release notes");
        assert_eq!(new_event.kind, EventKind::Task);
        assert_eq!(new_event.calendar_id.as_deref(), Some("cal-1"));
        assert_eq!(new_event.timing.instants(), (utc(27, 14, 0), utc(27, 15, 0)));
        assert_eq!(new_event.task_link.unwrap().external_task_id, "lin_1");
    }

    #[test]
    fn test_task_on_day_cell_uses_day_window() {
        let decision = resolve_drop(&task(), &DropTarget::DayCell { date: date(30) }, &ctx(ViewKind::Month));
        let DropDecision::Create(new_event) = decision else {
            panic!("expected create");
        };
        assert_eq!(new_event.timing.instants(), (utc(30, 9, 0), utc(30, 10, 0)));
    }

    #[test]
    fn test_task_without_calendar_is_aborted() {
        let context = DropContext::from_settings(&Settings::default(), ViewKind::Week, &[]);
        assert_eq!(
            resolve_drop(&task(), &block(27, 14, 0), &context),
            DropDecision::Ignore(IgnoreReason::NoCalendar)
        );
    }

    #[test]
    fn test_default_calendar_wins_over_first() {
        let settings = Settings {
            default_calendar_id: Some("work".to_string()),
            ..Settings::default()
        };
        let context = DropContext::from_settings(&settings, ViewKind::Week, &["cal-1".to_string()]);
        assert_eq!(context.calendar_id.as_deref(), Some("work"));
    }

    #[test]
    fn test_move_drop_range() {
        let range = move_drop_range(&DragPayload::event_move(meeting()), &block(27, 14, 0));
        assert_eq!(range, Some((utc(27, 14, 0), utc(27, 15, 0))));

        let all_day = CalendarEvent::all_day("evt-2", "Offsite", date(27), date(27)).unwrap();
        let range = move_drop_range(&DragPayload::event_move(all_day), &block(27, 14, 0));
        assert_eq!(range, Some((utc(27, 14, 0), utc(27, 14, 15))));

        let resize = DragPayload::EventResize {
            event: meeting(),
            edge: ResizeEdge::Top,
        };
        assert_eq!(move_drop_range(&resize, &block(27, 14, 0)), None);
        assert_eq!(move_drop_range(&task(), &block(27, 14, 0)), None);
    }
}
