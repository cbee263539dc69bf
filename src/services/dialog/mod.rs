//! Recurring-scope dialog.
//!
//! Dropping an occurrence of a recurring series asks the user whether the
//! change applies to this occurrence or to all future ones. Cancelling the
//! dialog aborts the drop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::{oneshot, Notify};

use crate::models::event::CalendarEvent;
use crate::models::mutation::RecurringScope;

/// Asks the user which occurrences an edit applies to.
#[async_trait]
pub trait RecurringScopeDialog: Send + Sync {
    /// `None` when the user dismissed the dialog.
    async fn request_scope(&self, event: &CalendarEvent) -> Option<RecurringScope>;
}

/// Dialog that always answers the same way (scripted replays, tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedScope(pub Option<RecurringScope>);

#[async_trait]
impl RecurringScopeDialog for FixedScope {
    async fn request_scope(&self, _event: &CalendarEvent) -> Option<RecurringScope> {
        self.0
    }
}

struct PendingScope {
    request: u64,
    event_title: String,
    responder: oneshot::Sender<Option<RecurringScope>>,
}

/// State for the scope dialog a UI renders.
///
/// `request_scope` parks until the UI calls [`ScopePrompt::confirm`] or
/// [`ScopePrompt::cancel`]. A second request while one is open cancels the
/// first. A request whose future is dropped closes its dialog.
#[derive(Default)]
pub struct ScopePrompt {
    pending: Mutex<Option<PendingScope>>,
    opened: Notify,
    next_request: AtomicU64,
}

impl ScopePrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if there's a pending question
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Title of the event the open dialog is about.
    pub fn pending_title(&self) -> Option<String> {
        self.lock().as_ref().map(|p| p.event_title.clone())
    }

    /// Resolves once a request is waiting for an answer.
    pub async fn opened(&self) {
        self.opened.notified().await;
    }

    /// Answer the open dialog. Returns false when nothing was open.
    pub fn confirm(&self, scope: RecurringScope) -> bool {
        self.respond(Some(scope))
    }

    /// Dismiss the open dialog. Returns false when nothing was open.
    pub fn cancel(&self) -> bool {
        self.respond(None)
    }

    fn respond(&self, answer: Option<RecurringScope>) -> bool {
        match self.lock().take() {
            Some(pending) => {
                // The requester may have gone away; nothing to do then
                let _ = pending.responder.send(answer);
                true
            }
            None => false,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PendingScope>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears a request's dialog if it is still open when the request goes away.
struct OpenRequest<'a> {
    prompt: &'a ScopePrompt,
    request: u64,
}

impl Drop for OpenRequest<'_> {
    fn drop(&mut self) {
        let mut pending = self.prompt.lock();
        if pending.as_ref().is_some_and(|p| p.request == self.request) {
            log::debug!("Scope request {} abandoned; closing dialog", self.request);
            *pending = None;
        }
    }
}

#[async_trait]
impl RecurringScopeDialog for ScopePrompt {
    async fn request_scope(&self, event: &CalendarEvent) -> Option<RecurringScope> {
        let (tx, rx) = oneshot::channel();
        let request = self.next_request.fetch_add(1, Ordering::Relaxed);
        let previous = self.lock().replace(PendingScope {
            request,
            event_title: event.title.clone(),
            responder: tx,
        });
        let _open = OpenRequest { prompt: self, request };
        if let Some(previous) = previous {
            log::debug!("Superseding open scope dialog for {}", previous.event_title);
            let _ = previous.responder.send(None);
        }
        self.opened.notify_one();

        rx.await.unwrap_or(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;

    fn occurrence() -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2026, 1, 27, 10, 0, 0).unwrap();
        CalendarEvent::timed("occ-1", "Weekly sync", start, start + Duration::hours(1))
            .unwrap()
            .in_series("series-1")
    }

    #[tokio::test]
    async fn test_confirm_resolves_request() {
        let prompt = Arc::new(ScopePrompt::new());
        let asking = {
            let prompt = prompt.clone();
            tokio::spawn(async move { prompt.request_scope(&occurrence()).await })
        };

        prompt.opened().await;
        assert_eq!(prompt.pending_title().as_deref(), Some("Weekly sync"));
        assert!(prompt.confirm(RecurringScope::All));

        assert_eq!(asking.await.unwrap(), Some(RecurringScope::All));
        assert!(!prompt.is_open());
    }

    #[tokio::test]
    async fn test_cancel_resolves_to_none() {
        let prompt = Arc::new(ScopePrompt::new());
        let asking = {
            let prompt = prompt.clone();
            tokio::spawn(async move { prompt.request_scope(&occurrence()).await })
        };

        prompt.opened().await;
        assert!(prompt.cancel());
        assert_eq!(asking.await.unwrap(), None);
        assert!(!prompt.cancel());
    }

    #[tokio::test]
    async fn test_aborted_request_closes_dialog() {
        let prompt = Arc::new(ScopePrompt::new());
        let asking = {
            let prompt = prompt.clone();
            tokio::spawn(async move { prompt.request_scope(&occurrence()).await })
        };

        prompt.opened().await;
        assert!(prompt.is_open());
        asking.abort();
        assert!(asking.await.unwrap_err().is_cancelled());

        assert_eq!(prompt.pending_title(), None);
        assert!(!prompt.cancel());
    }

    #[tokio::test]
    async fn test_superseded_request_keeps_newer_dialog() {
        let prompt = Arc::new(ScopePrompt::new());
        let first = {
            let prompt = prompt.clone();
            tokio::spawn(async move { prompt.request_scope(&occurrence()).await })
        };
        prompt.opened().await;

        let second = {
            let prompt = prompt.clone();
            tokio::spawn(async move {
                let mut other = occurrence();
                other.title = "Retro".to_string();
                prompt.request_scope(&other).await
            })
        };
        prompt.opened().await;

        assert_eq!(first.await.unwrap(), None);
        assert_eq!(prompt.pending_title().as_deref(), Some("Retro"));
        assert!(prompt.confirm(RecurringScope::This));
        assert_eq!(second.await.unwrap(), Some(RecurringScope::This));
    }

    #[tokio::test]
    async fn test_fixed_scope() {
        let dialog = FixedScope(Some(RecurringScope::This));
        assert_eq!(dialog.request_scope(&occurrence()).await, Some(RecurringScope::This));
        assert_eq!(FixedScope(None).request_scope(&occurrence()).await, None);
    }
}
