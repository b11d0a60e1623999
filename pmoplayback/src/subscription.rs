//! Listener ownership for media resource notifications.
//!
//! A [`Subscription`] is the handle returned when a callback is registered on
//! a media resource. Cancelling or dropping the handle unregisters the
//! callback, so the owner decides exactly when a listener stops receiving
//! events. [`ListenerSet`] is the registry adapters use to implement their
//! notification channels.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Handle to a registered callback.
///
/// The callback stays registered until [`Subscription::cancel`] is called
/// or the handle is dropped.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps the unregister action of a listener.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to release (adapters without the channel).
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Unregisters the callback now.
    pub fn cancel(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

struct Listeners<T> {
    next_id: u64,
    callbacks: HashMap<u64, Callback<T>>,
}

/// Set of callbacks notified with a value of type `T`.
pub struct ListenerSet<T> {
    inner: Arc<Mutex<Listeners<T>>>,
}

impl<T> Clone for ListenerSet<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> Default for ListenerSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ListenerSet<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Listeners {
                next_id: 1,
                callbacks: HashMap::new(),
            })),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners<T>> {
        lock(&self.inner)
    }

    /// Registers `callback`; the returned handle unregisters it.
    pub fn add(&self, callback: impl Fn(T) + Send + Sync + 'static) -> Subscription
    where
        T: Send,
    {
        let id = {
            let mut listeners = self.listeners();
            let id = listeners.next_id;
            listeners.next_id += 1;
            listeners.callbacks.insert(id, Arc::new(callback));
            id
        };

        let weak: Weak<Mutex<Listeners<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).callbacks.remove(&id);
            }
        })
    }

    /// Calls every registered callback with `value`.
    ///
    /// Callbacks run outside the registry lock, so they may register or
    /// cancel listeners themselves.
    pub fn notify(&self, value: T) {
        let callbacks: Vec<Callback<T>> = self.listeners().callbacks.values().cloned().collect();
        for callback in callbacks {
            callback(value.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.listeners().callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every callback. Outstanding handles become no-ops.
    pub fn clear(&self) {
        self.listeners().callbacks.clear();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
