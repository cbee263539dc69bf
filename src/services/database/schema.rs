use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    create_calendars_table(conn)?;
    create_events_table(conn)?;
    create_event_indexes(conn)?;
    Ok(())
}

fn create_calendars_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS calendars (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create calendars table")?;

    Ok(())
}

/// `timing` holds the authoritative representation as JSON; `start_ms` and
/// `end_ms` are the resolved instants used by range queries. `task_link` is
/// JSON and only set on task events.
fn create_events_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            color TEXT NOT NULL,
            timing TEXT NOT NULL,
            start_ms INTEGER NOT NULL,
            end_ms INTEGER NOT NULL,
            is_all_day INTEGER NOT NULL DEFAULT 0,
            is_editable INTEGER NOT NULL DEFAULT 1,
            recurring_series_id TEXT,
            calendar_id TEXT REFERENCES calendars(id) ON DELETE SET NULL,
            kind TEXT NOT NULL DEFAULT 'event',
            task_link TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("Failed to create events table")?;

    Ok(())
}

fn create_event_indexes(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_span ON events (start_ms, end_ms)",
        [],
    )
    .context("Failed to create events span index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_series ON events (recurring_series_id)",
        [],
    )
    .context("Failed to create events series index")?;

    Ok(())
}
