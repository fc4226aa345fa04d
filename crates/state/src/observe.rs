//! Explicit change subscriptions
//!
//! Stores announce which part of their state changed by topic. Consumers
//! register a listener and hold the returned [`Subscription`]; dropping it
//! (or calling [`Subscription::unsubscribe`]) detaches the listener.
//!
//! Listeners run after the store has released its locks, so a listener
//! may read the store or call its actions.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

/// Listener registry for events of type `E`
pub struct Subscribers<E> {
    inner: Arc<Mutex<Registry<E>>>,
}

impl<E: 'static> Subscribers<E> {
    /// Empty registry
    pub fn new() -> Self {
        Subscribers {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register `listener`; it stays attached while the handle lives.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.inner.lock();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::new(listener)));
            id
        };

        let weak: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.inner);
        Subscription {
            detach: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.lock().listeners.retain(|(lid, _)| *lid != id);
                }
            })),
        }
    }

    /// Deliver `event` to every attached listener, in registration order.
    pub fn notify(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of attached listeners
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Whether no listener is attached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for Subscribers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Subscribers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscribers")
            .field("listeners", &self.inner.lock().listeners.len())
            .finish()
    }
}

/// Handle keeping a listener attached
#[must_use = "dropping a Subscription detaches its listener"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Detach the listener now
    pub fn unsubscribe(mut self) {
        self.run_detach();
    }

    fn run_detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}
