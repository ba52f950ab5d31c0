//! Subscriber registry owned by a facade.
//!
//! # Invariants
//! - Subscribers are called in subscription order.
//! - `clear` is called on every teardown so no subscriber outlives the
//!   validity window it subscribed in.

use uuid::Uuid;

/// Handle returned by [`Observers::subscribe`].
pub type SubscriptionId = Uuid;

type Callback<E> = Box<dyn FnMut(&E) + Send>;

pub struct Observers<E> {
    subscribers: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&E) + Send + 'static) -> SubscriptionId {
        let id = Uuid::new_v4();
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes one subscriber; returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    /// Delivers `event` to every subscriber and returns how many were called.
    pub fn notify(&mut self, event: &E) -> usize {
        for (_, callback) in self.subscribers.iter_mut() {
            callback(event);
        }
        self.subscribers.len()
    }

    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Observers;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn notifies_until_unsubscribed_or_cleared() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut observers = Observers::<u32>::new();

        let counter = Arc::clone(&hits);
        let first = observers.subscribe(move |value| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });
        let counter = Arc::clone(&hits);
        observers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(observers.notify(&10), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 11);

        assert!(observers.unsubscribe(first));
        assert!(!observers.unsubscribe(first));
        assert_eq!(observers.notify(&10), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 12);

        observers.clear();
        assert!(observers.is_empty());
        assert_eq!(observers.notify(&10), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 12);
    }
}
