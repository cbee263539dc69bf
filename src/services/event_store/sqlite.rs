// SQLite event store
// Reference implementation of the remote store contract

use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{EventRange, EventStore, RangePush, StoreError};
use crate::models::event::{resolve_color, CalendarEvent, EventKind, EventTiming, TaskLink};
use crate::models::mutation::{EventPatch, NewEvent, RecurringScope};
use crate::services::database::Database;

const EVENT_COLUMNS: &str = "id, title, description, color, timing, is_editable, \
                             recurring_series_id, calendar_id, kind, task_link";

struct Watcher {
    ranges: Vec<EventRange>,
    sender: mpsc::UnboundedSender<RangePush>,
}

/// Event store backed by a local SQLite database.
///
/// Enforces the store-side rules: locked events cannot be updated, `end`
/// may not precede `start`, and range queries apply the same buffer the
/// cache's overlap test does.
pub struct SqliteEventStore {
    db: Mutex<Database>,
    range_buffer: Duration,
    watchers: Mutex<Vec<Watcher>>,
}

impl SqliteEventStore {
    pub fn new(db: Database) -> Result<Self> {
        db.initialize_schema()?;
        Ok(Self {
            db: Mutex::new(db),
            range_buffer: Duration::days(1),
            watchers: Mutex::new(Vec::new()),
        })
    }

    pub fn open(path: &str) -> Result<Self> {
        Self::new(Database::new(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    pub fn with_range_buffer(mut self, buffer: Duration) -> Self {
        self.range_buffer = buffer;
        self
    }

    pub fn add_calendar(&self, id: &str, name: &str, color: Option<&str>) -> Result<(), StoreError> {
        self.db().connection().execute(
            "INSERT OR REPLACE INTO calendars (id, name, color) VALUES (?1, ?2, ?3)",
            params![id, name, color],
        )?;
        Ok(())
    }

    /// Calendar ids in creation order.
    pub fn calendar_ids(&self) -> Result<Vec<String>, StoreError> {
        let db = self.db();
        let mut stmt = db
            .connection()
            .prepare("SELECT id FROM calendars ORDER BY created_at, rowid")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Store an existing record under its own id (imports, seeding).
    pub fn insert_event(&self, event: &CalendarEvent) -> Result<CalendarEvent, StoreError> {
        let mut record = event.clone();
        let id = record.record_key().to_string();
        record.id = id.clone();
        record.remote_id = Some(id);
        check_record(&record)?;

        let db = self.db();
        write_event(db.connection(), &record, true)?;
        self.publish(db.connection());
        Ok(record)
    }

    pub fn get_event(&self, id: &str) -> Result<Option<CalendarEvent>, StoreError> {
        load_event(self.db().connection(), id)
    }

    /// Receive a fresh result for every watched range after each write.
    ///
    /// The current results are pushed immediately.
    pub fn subscribe(&self, ranges: Vec<EventRange>) -> mpsc::UnboundedReceiver<RangePush> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let db = self.db();
        for range in &ranges {
            match query_range(db.connection(), *range, self.range_buffer) {
                Ok(records) => {
                    let _ = sender.send(RangePush { range: *range, records });
                }
                Err(err) => log::error!("Failed to load watched range {}: {}", range, err),
            }
        }
        self.lock_watchers().push(Watcher { ranges, sender });
        receiver
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_watchers(&self) -> MutexGuard<'_, Vec<Watcher>> {
        self.watchers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, conn: &Connection) {
        let mut watchers = self.lock_watchers();
        watchers.retain(|watcher| !watcher.sender.is_closed());

        for watcher in watchers.iter() {
            for range in &watcher.ranges {
                match query_range(conn, *range, self.range_buffer) {
                    Ok(records) => {
                        let _ = watcher.sender.send(RangePush { range: *range, records });
                    }
                    Err(err) => log::error!("Failed to refresh watched range {}: {}", range, err),
                }
            }
        }
    }

    fn calendar_color(conn: &Connection, calendar_id: Option<&str>) -> Result<Option<String>, StoreError> {
        let Some(id) = calendar_id else {
            return Ok(None);
        };
        let color = conn
            .query_row("SELECT color FROM calendars WHERE id = ?1", [id], |row| {
                row.get::<_, Option<String>>(0)
            })
            .optional()?;
        Ok(color.flatten())
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn create_event(&self, event: NewEvent) -> Result<CalendarEvent, StoreError> {
        let db = self.db();
        let conn = db.connection();

        let calendar_color = Self::calendar_color(conn, event.calendar_id.as_deref())?;
        let id = Uuid::new_v4().to_string();
        let mut record = event.to_placeholder(id.clone());
        record.remote_id = Some(id);
        record.color = resolve_color(event.color.as_deref(), calendar_color.as_deref());
        check_record(&record)?;

        write_event(conn, &record, true)?;
        log::info!("Created event {} ({})", record.id, record.title);
        self.publish(conn);
        Ok(record)
    }

    async fn update_event(&self, patch: EventPatch) -> Result<CalendarEvent, StoreError> {
        let db = self.db();
        let conn = db.connection();

        let tx = conn.unchecked_transaction()?;
        let updated = apply_patch(&tx, &patch)?;
        tx.commit()?;

        log::info!("Updated event {}", updated.id);
        self.publish(conn);
        Ok(updated)
    }

    async fn delete_event(&self, id: &str) -> Result<(), StoreError> {
        let db = self.db();
        let conn = db.connection();

        let rows = conn.execute("DELETE FROM events WHERE id = ?1", [id])?;
        if rows == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }

        log::info!("Deleted event {}", id);
        self.publish(conn);
        Ok(())
    }

    async fn events_in_range(&self, range: EventRange) -> Result<Vec<CalendarEvent>, StoreError> {
        query_range(self.db().connection(), range, self.range_buffer)
    }
}

fn check_record(event: &CalendarEvent) -> Result<(), StoreError> {
    let (start, end) = event.instants();
    if end < start {
        return Err(StoreError::InvalidRange);
    }
    event.validate().map_err(StoreError::Rejected)
}

fn apply_patch(conn: &Connection, patch: &EventPatch) -> Result<CalendarEvent, StoreError> {
    let current = load_event(conn, &patch.id)?.ok_or_else(|| StoreError::NotFound(patch.id.clone()))?;
    if !current.is_editable {
        return Err(StoreError::NotEditable(patch.id.clone()));
    }

    let updated = patch.apply_to(&current);
    check_record(&updated)?;

    if patch.scope == Some(RecurringScope::All) {
        if let Some(series_id) = &current.recurring_series_id {
            shift_following_occurrences(conn, series_id, &current, &updated)?;
        }
    }

    write_event(conn, &updated, false)?;
    Ok(updated)
}

/// Apply the same shift to every later occurrence of the series.
fn shift_following_occurrences(
    conn: &Connection,
    series_id: &str,
    before: &CalendarEvent,
    after: &CalendarEvent,
) -> Result<(), StoreError> {
    if before.is_all_day() != after.is_all_day() {
        return Err(StoreError::Rejected(
            "Cannot change the all-day status of every occurrence".to_string(),
        ));
    }

    let (old_start, old_end) = before.instants();
    let (new_start, new_end) = after.instants();
    let (start_shift, end_shift) = (new_start - old_start, new_end - old_end);

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM events WHERE recurring_series_id = ?1 AND id != ?2 AND start_ms >= ?3",
        EVENT_COLUMNS
    ))?;
    let rows = stmt
        .query_map(params![series_id, before.id, old_start.timestamp_millis()], read_row)?
        .collect::<Result<Vec<_>, _>>()?;

    for row in rows {
        let mut occurrence = row.into_event()?;
        if !occurrence.is_editable {
            log::debug!("Skipping locked occurrence {}", occurrence.id);
            continue;
        }

        occurrence.timing = match &occurrence.timing {
            EventTiming::AllDay {
                start_date,
                end_date,
            } => EventTiming::AllDay {
                start_date: *start_date + Duration::days(start_shift.num_days()),
                end_date: *end_date + Duration::days(end_shift.num_days()),
            },
            timing => {
                let (start, end) = timing.instants();
                EventTiming::Instants {
                    start: start + start_shift,
                    end: end + end_shift,
                }
            }
        };
        check_record(&occurrence)?;
        write_event(conn, &occurrence, false)?;
    }

    Ok(())
}

fn write_event(conn: &Connection, event: &CalendarEvent, insert: bool) -> Result<(), StoreError> {
    let (start, end) = event.instants();
    let timing = serde_json::to_string(&event.timing)?;
    let task_link = event.task_link.as_ref().map(serde_json::to_string).transpose()?;
    let kind = match event.kind {
        EventKind::Event => "event",
        EventKind::Task => "task",
    };
    let is_all_day = event.is_all_day() as i32;
    let is_editable = event.is_editable as i32;

    let rows = if insert {
        conn.execute(
            "INSERT INTO events (
                id, title, description, color, timing, start_ms, end_ms, is_all_day,
                is_editable, recurring_series_id, calendar_id, kind, task_link
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                event.id,
                event.title,
                event.description,
                event.color,
                timing,
                start.timestamp_millis(),
                end.timestamp_millis(),
                is_all_day,
                is_editable,
                event.recurring_series_id,
                event.calendar_id,
                kind,
                task_link,
            ],
        )?
    } else {
        conn.execute(
            "UPDATE events SET
                title = ?2, description = ?3, color = ?4, timing = ?5, start_ms = ?6,
                end_ms = ?7, is_all_day = ?8, is_editable = ?9, recurring_series_id = ?10,
                calendar_id = ?11, kind = ?12, task_link = ?13, updated_at = ?14
             WHERE id = ?1",
            params![
                event.id,
                event.title,
                event.description,
                event.color,
                timing,
                start.timestamp_millis(),
                end.timestamp_millis(),
                is_all_day,
                is_editable,
                event.recurring_series_id,
                event.calendar_id,
                kind,
                task_link,
                Utc::now().to_rfc3339(),
            ],
        )?
    };

    if rows == 0 {
        return Err(StoreError::NotFound(event.id.clone()));
    }
    Ok(())
}

fn load_event(conn: &Connection, id: &str) -> Result<Option<CalendarEvent>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS),
            [id],
            read_row,
        )
        .optional()?;
    row.map(EventRow::into_event).transpose()
}

fn query_range(conn: &Connection, range: EventRange, buffer: Duration) -> Result<Vec<CalendarEvent>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM events WHERE start_ms <= ?1 AND end_ms >= ?2 ORDER BY start_ms, id",
        EVENT_COLUMNS
    ))?;
    let rows = stmt
        .query_map(
            params![
                (range.end + buffer).timestamp_millis(),
                (range.start - buffer).timestamp_millis()
            ],
            read_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(EventRow::into_event).collect()
}

/// Raw column values; JSON columns are decoded outside the row callback.
struct EventRow {
    id: String,
    title: String,
    description: String,
    color: String,
    timing: String,
    is_editable: bool,
    recurring_series_id: Option<String>,
    calendar_id: Option<String>,
    kind: String,
    task_link: Option<String>,
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        timing: row.get(4)?,
        is_editable: row.get::<_, i32>(5)? != 0,
        recurring_series_id: row.get(6)?,
        calendar_id: row.get(7)?,
        kind: row.get(8)?,
        task_link: row.get(9)?,
    })
}

impl EventRow {
    fn into_event(self) -> Result<CalendarEvent, StoreError> {
        let timing: EventTiming = serde_json::from_str(&self.timing)?;
        let task_link: Option<TaskLink> = self
            .task_link
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let kind = if self.kind == "task" {
            EventKind::Task
        } else {
            EventKind::Event
        };

        Ok(CalendarEvent {
            remote_id: Some(self.id.clone()),
            id: self.id,
            title: self.title,
            description: self.description,
            color: self.color,
            timing,
            is_editable: self.is_editable,
            recurring_series_id: self.recurring_series_id,
            calendar_id: self.calendar_id,
            kind,
            task_link,
        })
    }
}
