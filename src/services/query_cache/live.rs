// Live subscription pump
// Forwards pushed range results from the store into the shared cache.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::CacheHandle;
use crate::services::event_store::RangePush;

/// Apply pushes until the sending side closes. Returns how many were applied.
pub async fn pump_pushes(mut receiver: mpsc::UnboundedReceiver<RangePush>, cache: CacheHandle) -> usize {
    let mut applied = 0;
    while let Some(push) = receiver.recv().await {
        log::debug!("Push for {} ({} records)", push.range, push.records.len());
        cache.with(|c| c.receive_push(push));
        applied += 1;
    }
    log::debug!("Live subscription closed after {} pushes", applied);
    applied
}

/// Run [`pump_pushes`] on the current tokio runtime.
pub fn spawn_pump(receiver: mpsc::UnboundedReceiver<RangePush>, cache: CacheHandle) -> JoinHandle<usize> {
    tokio::spawn(pump_pushes(receiver, cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::CalendarEvent;
    use crate::services::event_store::EventRange;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_pushes_land_in_cache() {
        let range = EventRange::new(
            Utc.with_ymd_and_hms(2026, 1, 26, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
        );
        let start = Utc.with_ymd_and_hms(2026, 1, 27, 10, 0, 0).unwrap();
        let event = CalendarEvent::timed("e1", "Review", start, start + chrono::Duration::hours(1)).unwrap();

        let cache = CacheHandle::default();
        let (sender, receiver) = mpsc::unbounded_channel();
        let pump = spawn_pump(receiver, cache.clone());

        sender
            .send(RangePush {
                range,
                records: vec![event.clone()],
            })
            .unwrap();
        drop(sender);

        assert_eq!(pump.await.unwrap(), 1);
        cache.with(|c| {
            assert_eq!(c.records(range).unwrap().to_vec(), vec![event]);
            assert!(!c.entry(range).unwrap().is_stale());
        });
    }
}
