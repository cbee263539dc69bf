//! Client-side cache of range query results.
//!
//! Entries are keyed by `(query kind, range)`. An event may sit in several
//! entries at once (a month window and a week window overlap), so every
//! optimistic write goes through [`EventRange::could_contain`] with the same
//! buffer the store applies to its range query.
//!
//! Writes outside the fetch/push path are crate-private: callers go through
//! [`optimistic::OptimisticMutations`], which pairs each patch with its
//! rollback or reconciliation.
//!
//! Each entry carries a write `version` and the version of the last server
//! write (`pushed_version`). A snapshot remembers the version its own patch
//! produced, which is how rollback and reconciliation decide whether to
//! restore verbatim, revert only their own record, or leave newer server data
//! alone.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Duration;

use crate::models::event::CalendarEvent;
use crate::models::mutation::EventPatch;
use crate::services::event_store::{EventRange, RangePush};

pub mod live;
pub mod optimistic;

pub use live::{pump_pushes, spawn_pump};
pub use optimistic::{MutationOutcome, OptimisticMutations};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKind {
    EventsInRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    pub kind: QueryKind,
    pub range: EventRange,
}

impl QueryKey {
    pub fn events_in_range(range: EventRange) -> Self {
        Self {
            kind: QueryKind::EventsInRange,
            range,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheEntry {
    /// `None` while the first fetch is outstanding.
    records: Option<Vec<CalendarEvent>>,
    version: u64,
    pushed_version: u64,
    stale: bool,
    fetch_generation: u64,
    fetching: bool,
}

impl CacheEntry {
    pub fn records(&self) -> Option<&[CalendarEvent]> {
        self.records.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.records.is_none()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    fn write(&mut self, records: Vec<CalendarEvent>) {
        self.records = Some(records);
        self.version += 1;
    }

    fn write_from_server(&mut self, records: Vec<CalendarEvent>) {
        self.write(records);
        self.pushed_version = self.version;
        self.stale = false;
    }

    /// The server wrote this entry after `version` was produced.
    fn pushed_since(&self, version: u64) -> bool {
        self.pushed_version > version
    }
}

/// Proof of an in-flight fetch; stale once fetches are cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    key: QueryKey,
    generation: u64,
}

impl FetchTicket {
    pub fn range(&self) -> EventRange {
        self.key.range
    }
}

/// What one mutation did to one entry.
#[derive(Debug)]
struct EntrySnapshot {
    key: QueryKey,
    previous: Vec<CalendarEvent>,
    /// Entry version right after this mutation's patch.
    written_version: u64,
    /// Records with the touched key before the patch, with their positions.
    prior: Vec<(usize, CalendarEvent)>,
}

/// Pre-mutation state of every entry one optimistic patch touched.
///
/// Consumed by exactly one rollback; never cloned or shared.
#[derive(Debug)]
pub struct Snapshot {
    record_key: String,
    entries: Vec<EntrySnapshot>,
}

impl Snapshot {
    fn new(record_key: impl Into<String>) -> Self {
        Self {
            record_key: record_key.into(),
            entries: Vec::new(),
        }
    }

    pub fn record_key(&self) -> &str {
        &self.record_key
    }

    pub fn touched_ranges(&self) -> Vec<EventRange> {
        self.entries.iter().map(|e| e.key.range).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct QueryCache {
    entries: BTreeMap<QueryKey, CacheEntry>,
    buffer: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(Duration::days(1))
    }
}

impl QueryCache {
    pub fn new(buffer: Duration) -> Self {
        Self {
            entries: BTreeMap::new(),
            buffer,
        }
    }

    pub fn buffer(&self) -> Duration {
        self.buffer
    }

    /// Whether an event could appear in the result for `range`.
    pub fn could_contain(&self, range: &EventRange, event: &CalendarEvent) -> bool {
        let (start, end) = event.instants();
        range.could_contain(start, end, self.buffer)
    }

    pub fn entry(&self, range: EventRange) -> Option<&CacheEntry> {
        self.entries.get(&QueryKey::events_in_range(range))
    }

    pub fn records(&self, range: EventRange) -> Option<&[CalendarEvent]> {
        self.entry(range).and_then(CacheEntry::records)
    }

    pub fn ranges(&self) -> Vec<EventRange> {
        self.entries.keys().map(|key| key.range).collect()
    }

    /// Observable contents, for comparing cache states.
    pub fn contents(&self) -> BTreeMap<EventRange, Option<Vec<CalendarEvent>>> {
        self.entries
            .iter()
            .map(|(key, entry)| (key.range, entry.records.clone()))
            .collect()
    }

    /// Ranges marked for a background refetch.
    pub fn stale_ranges(&self) -> Vec<EventRange> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.stale)
            .map(|(key, _)| key.range)
            .collect()
    }

    /// Register a query; it stays loading until its first fetch or push.
    pub fn register(&mut self, range: EventRange) -> QueryKey {
        let key = QueryKey::events_in_range(range);
        self.entries.entry(key).or_default();
        key
    }

    pub fn begin_fetch(&mut self, range: EventRange) -> FetchTicket {
        let key = self.register(range);
        let generation = match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.fetching = true;
                entry.fetch_generation
            }
            None => 0,
        };
        FetchTicket { key, generation }
    }

    /// Store a fetch result unless fetches were cancelled since it began.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, records: Vec<CalendarEvent>) -> bool {
        match self.entries.get_mut(&ticket.key) {
            Some(entry) if entry.fetch_generation == ticket.generation => {
                entry.write_from_server(records);
                entry.fetching = false;
                true
            }
            _ => {
                log::debug!("Discarding cancelled fetch for {}", ticket.key.range);
                false
            }
        }
    }

    /// Cancel the outstanding fetches of entries that could hold any of
    /// `touched`, so a result read before the write cannot overwrite it.
    ///
    /// Cancelled entries are marked stale for [`QueryCache::stale_ranges`],
    /// whether the write later succeeds or fails. Returns their ranges.
    pub fn cancel_fetches(&mut self, touched: &[&CalendarEvent]) -> Vec<EventRange> {
        let buffer = self.buffer;
        self.cancel_where(|range| touched.iter().any(|event| fits(range, event, buffer)))
    }

    /// Cancel every outstanding fetch; for writes whose record is not cached.
    pub fn cancel_all_fetches(&mut self) -> Vec<EventRange> {
        self.cancel_where(|_| true)
    }

    fn cancel_where(&mut self, affected: impl Fn(&EventRange) -> bool) -> Vec<EventRange> {
        let mut cancelled = Vec::new();
        for (key, entry) in self.entries.iter_mut() {
            if !entry.fetching || !affected(&key.range) {
                continue;
            }
            entry.fetch_generation += 1;
            entry.fetching = false;
            entry.stale = true;
            cancelled.push(key.range);
        }
        if !cancelled.is_empty() {
            log::debug!("Cancelled {} in-flight fetch(es)", cancelled.len());
        }
        cancelled
    }

    /// First cached copy of a record, from any loaded entry.
    pub fn cached_record(&self, record_key: &str) -> Option<&CalendarEvent> {
        self.entries
            .values()
            .filter_map(|entry| entry.records.as_ref())
            .flat_map(|records| records.iter())
            .find(|record| record.record_key() == record_key)
    }

    /// Server push for a watched range; always authoritative.
    pub fn receive_push(&mut self, push: RangePush) {
        let key = self.register(push.range);
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.write_from_server(push.records);
        }
    }

    /// Mark every entry for a background refetch.
    pub fn invalidate(&mut self) {
        for entry in self.entries.values_mut() {
            entry.stale = true;
        }
    }

    /// Optimistically apply `patch` to every loaded entry.
    ///
    /// Entries holding the record get the patched copy, or lose it when it no
    /// longer overlaps their range. Entries without it gain it when the new
    /// span overlaps. `dragged` stands in when no entry holds the record.
    pub(crate) fn apply_update(&mut self, patch: &EventPatch, dragged: Option<&CalendarEvent>) -> Snapshot {
        let mut snapshot = Snapshot::new(patch.id.clone());
        let template = self.cached_record(&patch.id).or(dragged).cloned();
        let Some(template) = template else {
            log::debug!("Event {} is not cached; nothing to patch", patch.id);
            return snapshot;
        };
        let patched = patch.apply_to(&template);
        let buffer = self.buffer;

        for (key, entry) in self.entries.iter_mut() {
            let Some(records) = entry.records.as_ref() else {
                continue;
            };
            let prior = positions_of(records, &patch.id);
            let fits = fits(&key.range, &patched, buffer);
            if prior.is_empty() && !fits {
                continue;
            }

            let previous = records.clone();
            let mut next = previous.clone();
            if prior.is_empty() {
                next.push(patched.clone());
            } else {
                for (index, record) in &prior {
                    next[*index] = patch.apply_to(record);
                }
                if !fits {
                    next.retain(|record| record.record_key() != patch.id);
                }
            }

            entry.write(next);
            snapshot.entries.push(EntrySnapshot {
                key: *key,
                previous,
                written_version: entry.version,
                prior,
            });
        }

        snapshot
    }

    /// Add a locally synthesized record to every loaded entry it overlaps.
    pub(crate) fn insert_placeholder(&mut self, placeholder: &CalendarEvent) -> Snapshot {
        let mut snapshot = Snapshot::new(placeholder.record_key());
        let buffer = self.buffer;

        for (key, entry) in self.entries.iter_mut() {
            let Some(records) = entry.records.as_ref() else {
                continue;
            };
            if !fits(&key.range, placeholder, buffer) {
                continue;
            }

            let previous = records.clone();
            let mut next = previous.clone();
            next.push(placeholder.clone());
            entry.write(next);
            snapshot.entries.push(EntrySnapshot {
                key: *key,
                previous,
                written_version: entry.version,
                prior: Vec::new(),
            });
        }

        snapshot
    }

    /// Remove a record from every loaded entry holding it.
    pub(crate) fn remove_record(&mut self, record_key: &str) -> Snapshot {
        let mut snapshot = Snapshot::new(record_key);

        for (key, entry) in self.entries.iter_mut() {
            let Some(records) = entry.records.as_ref() else {
                continue;
            };
            let prior = positions_of(records, record_key);
            if prior.is_empty() {
                continue;
            }

            let previous = records.clone();
            let next = previous
                .iter()
                .filter(|record| record.record_key() != record_key)
                .cloned()
                .collect();
            entry.write(next);
            snapshot.entries.push(EntrySnapshot {
                key: *key,
                previous,
                written_version: entry.version,
                prior,
            });
        }

        snapshot
    }

    /// Undo a failed mutation.
    ///
    /// Entries nobody touched since the patch are restored verbatim. Entries
    /// the server has written since are left alone. Entries another mutation
    /// wrote since get only this mutation's record reverted.
    pub(crate) fn rollback(&mut self, snapshot: Snapshot) {
        let Snapshot { record_key, entries } = snapshot;

        for touched in entries {
            let Some(entry) = self.entries.get_mut(&touched.key) else {
                continue;
            };
            if entry.version == touched.written_version {
                entry.write(touched.previous);
            } else if entry.pushed_since(touched.written_version) {
                log::debug!("Keeping server data for {} over rollback", touched.key.range);
            } else if let Some(records) = entry.records.as_ref() {
                let next = revert_record(records, &record_key, touched.prior);
                entry.write(next);
            }
        }
    }

    /// Replace the optimistic record with the server's copy in every entry the
    /// mutation touched. Safe to repeat.
    ///
    /// `snapshot.record_key()` is the key the optimistic record was written
    /// under (a placeholder id for creates). Entries the server has written
    /// since the patch already hold server truth and are skipped.
    pub(crate) fn reconcile(&mut self, snapshot: &Snapshot, server: &CalendarEvent) {
        let local_key = snapshot.record_key();
        let server_key = server.record_key();
        let buffer = self.buffer;

        for touched in &snapshot.entries {
            let Some(entry) = self.entries.get_mut(&touched.key) else {
                continue;
            };
            if entry.pushed_since(touched.written_version) {
                continue;
            }
            let Some(records) = entry.records.as_ref() else {
                continue;
            };

            let keep = fits(&touched.key.range, server, buffer);
            let mut next = Vec::with_capacity(records.len());
            let mut placed = false;
            for record in records {
                let key = record.record_key();
                if key != local_key && key != server_key {
                    next.push(record.clone());
                } else if keep && !placed {
                    next.push(server.clone());
                    placed = true;
                }
            }

            if next != *records {
                entry.write(next);
            }
        }
    }
}

fn positions_of(records: &[CalendarEvent], record_key: &str) -> Vec<(usize, CalendarEvent)> {
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.record_key() == record_key)
        .map(|(index, record)| (index, record.clone()))
        .collect()
}

/// Put back the prior copies of one record without touching its neighbours.
///
/// A record still listed is reverted where it now sits; one that was dropped
/// goes back at its old index, clamped to the current length.
fn revert_record(
    records: &[CalendarEvent],
    record_key: &str,
    prior: Vec<(usize, CalendarEvent)>,
) -> Vec<CalendarEvent> {
    let current = records.iter().position(|record| record.record_key() == record_key);
    let mut next: Vec<CalendarEvent> = records
        .iter()
        .filter(|record| record.record_key() != record_key)
        .cloned()
        .collect();

    match current {
        Some(at) => {
            for (offset, (_, record)) in prior.into_iter().enumerate() {
                next.insert((at + offset).min(next.len()), record);
            }
        }
        None => {
            for (index, record) in prior {
                next.insert(index.min(next.len()), record);
            }
        }
    }
    next
}

fn fits(range: &EventRange, event: &CalendarEvent, buffer: Duration) -> bool {
    let (start, end) = event.instants();
    range.could_contain(start, end, buffer)
}

/// Shared handle to the cache.
///
/// The lock is only held for synchronous sections; it is never held across
/// an `.await`.
#[derive(Debug, Clone, Default)]
pub struct CacheHandle {
    inner: Arc<Mutex<QueryCache>>,
}

impl CacheHandle {
    pub fn new(cache: QueryCache) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cache)),
        }
    }

    /// Run `f` with exclusive access to the cache.
    pub fn with<R>(&self, f: impl FnOnce(&mut QueryCache) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn contents(&self) -> BTreeMap<EventRange, Option<Vec<CalendarEvent>>> {
        self.with(|cache| cache.contents())
    }
}
