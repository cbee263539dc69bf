// Date utility functions
// Time-zone localisation and human-readable schedule strings

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Resolve a wall-clock time in `tz` to an absolute instant.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times that
/// fall into a DST gap are pushed forward by the gap, the way a wall clock
/// would read them.
pub fn localize(tz: Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => {
            // Gaps are at most a couple of hours; walk forward until the clock exists.
            (1..=4)
                .filter_map(|step| {
                    tz.from_local_datetime(&(naive + Duration::minutes(30 * step)))
                        .earliest()
                })
                .next()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
        }
    }
}

/// Midnight UTC of a calendar date; the instant all-day records resolve to.
pub fn utc_midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Calendar date of an instant as seen in `tz`.
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// "Tue, Jan 27"
pub fn format_day(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

/// "2:00 PM"
pub fn format_clock(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%-I:%M %p").to_string()
}

/// Success message shown when a drag reschedules an event with explicit instants.
pub fn timed_schedule_message(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    tz: Tz,
) -> Option<String> {
    let first = start.or(end)?;
    let day = format_day(local_date(first, tz));
    let time = match end {
        Some(end) if Some(end) != start && start.is_some() => {
            format!("{} – {}", format_clock(first, tz), format_clock(end, tz))
        }
        _ => format_clock(first, tz),
    };
    Some(format!("Event scheduled for {} at {}", day, time))
}

/// Success message shown when a drag moves an event to whole days.
pub fn all_day_schedule_message(start_date: NaiveDate) -> String {
    format!("Event scheduled for {}", format_day(start_date))
}
