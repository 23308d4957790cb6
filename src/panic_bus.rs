//! Process-wide channel for fatal conditions.
//!
//! Any component may [`PanicBus::publish`] a [`PanicMessage`]; every callback
//! subscribed at that moment is invoked synchronously, in subscription order.
//!
//! # Rules
//!
//! - **No persistence**: a message published with no subscribers is dropped.
//! - **No replay**: subscribing after a publish never sees that message.
//! - **Isolation**: a callback that panics is caught and logged; the remaining
//!   callbacks still receive the message.
//!
//! The binary installs the root subscriber, which logs the message and exits
//! the process with a non-zero status.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tracing::error;

/// A fatal condition reported by a named component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicMessage {
    pub service_name: String,
    pub message: String,
}

impl PanicMessage {
    pub fn new(service_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            message: message.into(),
        }
    }
}

type Callback = Arc<dyn Fn(&PanicMessage) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

/// Fan-out channel for fatal conditions.
///
/// Cheap to clone; all clones share the same subscriber set.
#[derive(Clone, Default)]
pub struct PanicBus {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl std::fmt::Debug for PanicBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanicBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl PanicBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `message` to every current subscriber.
    pub fn publish(&self, message: PanicMessage) {
        // Snapshot so callbacks may subscribe/unsubscribe without deadlocking.
        let callbacks: Vec<Callback> = lock(&self.subscribers)
            .callbacks
            .values()
            .cloned()
            .collect();

        for callback in callbacks {
            let delivered = std::panic::catch_unwind(AssertUnwindSafe(|| callback(&message)));
            if delivered.is_err() {
                error!(
                    service = %message.service_name,
                    "Panic bus subscriber panicked while handling message"
                );
            }
        }
    }

    /// Registers `callback` for all messages published from now on.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PanicMessage) + Send + Sync + 'static,
    {
        let mut subscribers = lock(&self.subscribers);
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        subscribers.callbacks.insert(id, Arc::new(callback));

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Number of callbacks currently subscribed.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).callbacks.len()
    }
}

/// Handle returned by [`PanicBus::subscribe`].
#[derive(Debug)]
#[must_use = "dropping a Subscription keeps the callback subscribed; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    /// Removes the callback from the bus. No-op if the bus is gone.
    pub fn unsubscribe(self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            lock(&subscribers).callbacks.remove(&self.id);
        }
    }
}

fn lock(subscribers: &Mutex<Subscribers>) -> MutexGuard<'_, Subscribers> {
    // A poisoned lock only means a panic happened while holding it; the map is still usable.
    subscribers
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
