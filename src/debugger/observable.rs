//! `Slot<T>`: a current value plus subscribers, with scoped
//! subscription cancellation (spec §9 "Observables with scoped
//! subscription").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A handle returned by `Slot::each`. Dropping it does not
/// unsubscribe — call `cancel()` explicitly, mirroring the teacher's
/// explicit `remove_event_handlers` rather than relying on `Drop`
/// (subscriptions commonly outlive the handle's own scope).
pub struct Subscription {
    id: u64,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }
}

pub struct Slot<T> {
    value: RwLock<T>,
    subscribers: RwLock<Vec<(u64, Subscriber<T>)>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Slot<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: RwLock::new(initial),
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn get(&self) -> T {
        self.value.read().await.clone()
    }

    /// Sets a new value and notifies every current subscriber with it.
    pub async fn set(&self, value: T) {
        *self.value.write().await = value.clone();
        let subscribers = self.subscribers.read().await;
        for (_, callback) in subscribers.iter() {
            callback(&value);
        }
    }

    /// Subscribes `callback`, immediately invoking it once with the
    /// current value ("use on main" — a late subscriber still sees
    /// present state rather than waiting for the next change).
    pub async fn each<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let callback: Subscriber<T> = Arc::new(callback);
        callback(&*self.value.read().await);
        self.subscribers.write().await.push((id, callback));
        Subscription { id }
    }

    pub async fn cancel(&self, subscription: Subscription) {
        self.subscribers
            .write()
            .await
            .retain(|(id, _)| *id != subscription.id);
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn each_fires_immediately_with_current_value() {
        let slot = Slot::new(1);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        slot.each(move |v| seen_clone.store(*v, Ordering::SeqCst))
            .await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn set_notifies_all_live_subscribers() {
        let slot = Slot::new(0);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        slot.each(move |v| seen_clone.store(*v, Ordering::SeqCst))
            .await;
        slot.set(42).await;
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[tokio::test]
    async fn cancel_stops_further_notifications() {
        let slot = Slot::new(0);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let subscription = slot
            .each(move |v| seen_clone.store(*v, Ordering::SeqCst))
            .await;
        slot.cancel(subscription).await;
        slot.set(99).await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(slot.subscriber_count().await, 0);
    }
}
