// Optimistic mutations
//
// Every remote write is wrapped the same way: cancel outstanding fetches of
// the ranges the write can reach, patch the cache and toast right away, then either reconcile with the
// server copy or roll the patch back.

use std::sync::Arc;

use chrono_tz::Tz;
use uuid::Uuid;

use super::CacheHandle;
use crate::models::event::{CalendarEvent, PLACEHOLDER_ID_PREFIX};
use crate::models::mutation::{EventPatch, NewEvent, UpdateKind};
use crate::services::event_store::{EventRange, EventStore};
use crate::services::notification::Notifier;
use crate::utils::date::{all_day_schedule_message, timed_schedule_message};

/// How a remote write ended, as far as the cache is concerned.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The store accepted the write; carries its copy of the record.
    Committed(CalendarEvent),
    Deleted,
    /// The store refused the write and the cache was restored.
    RolledBack { reason: String },
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        !matches!(self, MutationOutcome::RolledBack { .. })
    }
}

pub struct OptimisticMutations {
    cache: CacheHandle,
    store: Arc<dyn EventStore>,
    notifier: Arc<dyn Notifier>,
    time_zone: Tz,
}

impl OptimisticMutations {
    pub fn new(
        cache: CacheHandle,
        store: Arc<dyn EventStore>,
        notifier: Arc<dyn Notifier>,
        time_zone: Tz,
    ) -> Self {
        Self {
            cache,
            store,
            notifier,
            time_zone,
        }
    }

    pub fn cache(&self) -> &CacheHandle {
        &self.cache
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Reschedule an event.
    ///
    /// `dragged` is the copy the user interacted with; it is used when the
    /// record is not cached under any range yet.
    pub async fn update_event(
        &self,
        patch: EventPatch,
        dragged: Option<&CalendarEvent>,
        kind: UpdateKind,
    ) -> MutationOutcome {
        let snapshot = self.cache.with(|cache| {
            let current = cache.cached_record(&patch.id).or(dragged).cloned();
            match current {
                Some(current) => {
                    let patched = patch.apply_to(&current);
                    cache.cancel_fetches(&[&current, &patched]);
                }
                None => {
                    cache.cancel_all_fetches();
                }
            }
            cache.apply_update(&patch, dragged)
        });
        self.notifier
            .notify_success(&update_message(&patch, kind, self.time_zone));

        let id = patch.id.clone();
        match self.store.update_event(patch).await {
            Ok(server) => {
                self.cache.with(|cache| {
                    cache.reconcile(&snapshot, &server);
                    cache.invalidate();
                });
                MutationOutcome::Committed(server)
            }
            Err(err) => {
                log::error!("Failed to update event {}: {}", id, err);
                self.cache.with(|cache| cache.rollback(snapshot));
                self.notifier.notify_error("Failed to update event on server");
                MutationOutcome::RolledBack {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Create an event, showing a placeholder until the store assigns an id.
    pub async fn create_event(&self, new_event: NewEvent) -> MutationOutcome {
        let placeholder =
            new_event.to_placeholder(format!("{}{}", PLACEHOLDER_ID_PREFIX, Uuid::new_v4()));
        let snapshot = self.cache.with(|cache| {
            cache.cancel_fetches(&[&placeholder]);
            cache.insert_placeholder(&placeholder)
        });
        self.notifier.notify_success("Event created");

        match self.store.create_event(new_event).await {
            Ok(server) => {
                self.cache.with(|cache| {
                    cache.reconcile(&snapshot, &server);
                    cache.invalidate();
                });
                MutationOutcome::Committed(server)
            }
            Err(err) => {
                log::error!("Failed to create event {:?}: {}", placeholder.title, err);
                self.cache.with(|cache| cache.rollback(snapshot));
                self.notifier.notify_error("Failed to create event");
                MutationOutcome::RolledBack {
                    reason: err.to_string(),
                }
            }
        }
    }

    pub async fn delete_event(&self, id: &str) -> MutationOutcome {
        let snapshot = self.cache.with(|cache| {
            let current = cache.cached_record(id).cloned();
            match current {
                Some(current) => cache.cancel_fetches(&[&current]),
                None => cache.cancel_all_fetches(),
            };
            cache.remove_record(id)
        });
        self.notifier.notify_success("Event deleted");

        match self.store.delete_event(id).await {
            Ok(()) => {
                self.cache.with(|cache| cache.invalidate());
                MutationOutcome::Deleted
            }
            Err(err) => {
                log::error!("Failed to delete event {}: {}", id, err);
                self.cache.with(|cache| cache.rollback(snapshot));
                self.notifier.notify_error("Failed to delete event");
                MutationOutcome::RolledBack {
                    reason: err.to_string(),
                }
            }
        }
    }

    /// Fetch one range into the cache. Returns whether the result was kept.
    pub async fn load_range(&self, range: EventRange) -> bool {
        let ticket = self.cache.with(|cache| cache.begin_fetch(range));
        match self.store.events_in_range(range).await {
            Ok(records) => self.cache.with(|cache| cache.complete_fetch(ticket, records)),
            Err(err) => {
                log::warn!("Failed to load events for {}: {}", range, err);
                false
            }
        }
    }

    /// Refetch every range marked stale; returns how many were refreshed.
    pub async fn refetch_stale(&self) -> usize {
        let stale = self.cache.with(|cache| cache.stale_ranges());
        let mut refreshed = 0;
        for range in stale {
            if self.load_range(range).await {
                refreshed += 1;
            }
        }
        refreshed
    }
}

fn update_message(patch: &EventPatch, kind: UpdateKind, tz: Tz) -> String {
    if kind == UpdateKind::Drag {
        if patch.all_day == Some(true) {
            if let Some(start_date) = patch.start_date {
                return all_day_schedule_message(start_date);
            }
        } else if let Some(message) = timed_schedule_message(patch.start, patch.end, tz) {
            return message;
        }
    }
    "Event updated successfully".to_string()
}
