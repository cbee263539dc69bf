//! User-facing notifications.
//!
//! Fire-and-forget: the engine never reads anything back from a [`Notifier`].

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sink for success/failure messages.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);
    fn notify_error(&self, message: &str);
}

/// Types of toast notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// Success message (green)
    Success,
    /// Error message (red)
    Error,
}

impl ToastLevel {
    /// Get the icon for this toast level
    pub fn icon(&self) -> &'static str {
        match self {
            ToastLevel::Success => "✓",
            ToastLevel::Error => "✗",
        }
    }
}

/// A single toast notification
#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub created_at: Instant,
    /// How long to show this toast
    pub duration: Duration,
}

impl Toast {
    pub fn new(message: impl Into<String>, level: ToastLevel) -> Self {
        Self {
            message: message.into(),
            level,
            created_at: Instant::now(),
            duration: Duration::from_secs(3),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }
}

/// Toasts waiting to be shown, in arrival order.
#[derive(Debug, Default)]
pub struct ToastQueue {
    toasts: Mutex<Vec<Toast>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, toast: Toast) {
        self.lock().push(toast);
    }

    /// Remove expired toasts
    pub fn cleanup(&self) {
        self.lock().retain(|t| !t.is_expired());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages of the given level, oldest first.
    pub fn messages(&self, level: ToastLevel) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|t| t.level == level)
            .map(|t| t.message.clone())
            .collect()
    }

    /// Take every queued toast.
    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Toast>> {
        self.toasts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for ToastQueue {
    fn notify_success(&self, message: &str) {
        self.add(Toast::new(message, ToastLevel::Success));
    }

    fn notify_error(&self, message: &str) {
        self.add(Toast::new(message, ToastLevel::Error).with_duration(Duration::from_secs(5)));
    }
}

/// Writes notifications to the log; used by headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_success(&self, message: &str) {
        log::info!("{}", message);
    }

    fn notify_error(&self, message: &str) {
        log::error!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_keeps_order_and_levels() {
        let queue = ToastQueue::new();
        queue.notify_success("Event created");
        queue.notify_error("Failed to create event");
        queue.notify_success("Event deleted");

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.messages(ToastLevel::Success), vec!["Event created", "Event deleted"]);
        assert_eq!(queue.messages(ToastLevel::Error), vec!["Failed to create event"]);
    }

    #[test]
    fn test_cleanup_drops_expired() {
        let queue = ToastQueue::new();
        queue.add(Toast::new("gone", ToastLevel::Success).with_duration(Duration::ZERO));
        queue.notify_success("stays");
        queue.cleanup();
        assert_eq!(queue.messages(ToastLevel::Success), vec!["stays"]);
    }

    #[test]
    fn test_drain_empties_queue() {
        let queue = ToastQueue::new();
        queue.notify_error("Failed to delete event");
        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].level.icon(), "✗");
        assert!(queue.is_empty());
    }
}
