use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

/// Payloads an observer may fall behind by before it is dropped.
pub const OBSERVER_BUFFER: usize = 16;

pub type ObserverId = u64;

/// The set of connected metric observers.
///
/// The lock is held only to mutate the set or copy it; sends happen outside
/// it and never block, so one slow observer cannot stall the others.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Mutex<HashMap<ObserverId, mpsc::Sender<Arc<str>>>>,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn observers(&self) -> std::sync::MutexGuard<'_, HashMap<ObserverId, mpsc::Sender<Arc<str>>>> {
        self.observers.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> (ObserverId, mpsc::Receiver<Arc<str>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(OBSERVER_BUFFER);
        self.observers().insert(id, tx);
        tracing::debug!("Metrics observer {id} subscribed");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let removed = self.observers().remove(&id).is_some();
        if removed {
            tracing::debug!("Metrics observer {id} unsubscribed");
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sends `payload` to every observer. Observers that are closed or full
    /// are unsubscribed. Returns the number of successful deliveries.
    pub fn broadcast(&self, payload: &str) -> usize {
        let targets: Vec<(ObserverId, mpsc::Sender<Arc<str>>)> = self
            .observers()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let payload: Arc<str> = Arc::from(payload);
        let mut delivered = 0;
        for (id, tx) in targets {
            match tx.try_send(Arc::clone(&payload)) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Dropping metrics observer {id}: {e}");
                    self.unsubscribe(id);
                }
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_all() {
        let registry = ObserverRegistry::new();
        let (_a, mut rx_a) = registry.subscribe();
        let (_b, mut rx_b) = registry.subscribe();

        assert_eq!(registry.broadcast("tick"), 2);
        assert_eq!(&*rx_a.recv().await.unwrap(), "tick");
        assert_eq!(&*rx_b.recv().await.unwrap(), "tick");
    }

    #[tokio::test]
    async fn test_closed_observer_is_dropped_and_others_still_served() {
        let registry = ObserverRegistry::new();
        let (_gone, rx_gone) = registry.subscribe();
        let (_live, mut rx_live) = registry.subscribe();
        drop(rx_gone);

        assert_eq!(registry.broadcast("one"), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(&*rx_live.recv().await.unwrap(), "one");

        assert_eq!(registry.broadcast("two"), 1);
        assert_eq!(&*rx_live.recv().await.unwrap(), "two");
    }

    #[test]
    fn test_full_observer_is_dropped() {
        let registry = ObserverRegistry::new();
        let (_slow, _rx) = registry.subscribe();

        for _ in 0..OBSERVER_BUFFER {
            assert_eq!(registry.broadcast("x"), 1);
        }
        assert_eq!(registry.broadcast("x"), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let registry = ObserverRegistry::new();
        let (id, _rx) = registry.subscribe();
        let (other, _rx2) = registry.subscribe();
        assert_ne!(id, other);

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert_eq!(registry.len(), 1);
    }
}
