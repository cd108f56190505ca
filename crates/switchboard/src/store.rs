//! Generic reactive value cell with subscriptions and optional persistence.
//!
//! `KeyedStore` holds one value, hands out clones, and notifies subscribers
//! on change. Two mutation paths exist:
//!
//! - `set_state` / `set_state_with`: replace, persist, notify. The common
//!   case.
//! - `replace_silent` / `update_silent` plus an explicit `notify_listeners`:
//!   for callers that must interleave other work (collaborator
//!   re-registration) between the write and the notification. The selection
//!   registry uses this to uphold its write -> re-register -> notify
//!   ordering guarantee.
//!
//! Notification semantics: subscribers run in subscription order against the
//! listener set as it existed when notification began; a listener subscribed
//! mid-notification is not invoked for that round. A panicking listener is
//! caught and logged, and the remaining listeners still run.

use crate::persistence::DurableStore;
use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::warn;

/// Subscriber callback. Receives a reference to the new state.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Durable persistence wiring for a store.
///
/// `encode` projects the state to a string on every write; returning `None`
/// skips the write (nothing serializable). `decode` rebuilds a state from
/// the persisted string at construction time; stores whose state cannot be
/// fully rebuilt (e.g. it contains function values) leave it as `None` and
/// rehydrate through their own stale-snapshot path.
pub struct Persistence<T> {
    pub key: String,
    pub medium: Arc<dyn DurableStore>,
    pub encode: Arc<dyn Fn(&T) -> Option<String> + Send + Sync>,
    pub decode: Option<Arc<dyn Fn(&str) -> Option<T> + Send + Sync>>,
}

impl<T> fmt::Debug for Persistence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persistence").field("key", &self.key).finish()
    }
}

struct ListenerSet<T> {
    next_id: u64,
    entries: Vec<(u64, Listener<T>)>,
}

impl<T> Default for ListenerSet<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

/// Handle returned by `subscribe`. Unsubscribing is explicit and idempotent;
/// dropping the handle leaves the listener registered.
pub struct Subscription {
    cancel: Arc<dyn Fn() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        (self.cancel)()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Subscription(..)")
    }
}

/// Reactive value cell.
pub struct KeyedStore<T> {
    state: Mutex<T>,
    listeners: Arc<Mutex<ListenerSet<T>>>,
    persistence: Option<Persistence<T>>,
}

impl<T: Clone> KeyedStore<T> {
    pub fn new(initial: T) -> Self {
        Self {
            state: Mutex::new(initial),
            listeners: Arc::new(Mutex::new(ListenerSet::default())),
            persistence: None,
        }
    }

    /// Build a store wired to a durable medium, hydrating from it when a
    /// decoder is provided. Hydration failures are logged and ignored; the
    /// store starts from `initial` as if persistence were disabled.
    pub fn with_persistence(initial: T, persistence: Persistence<T>) -> Self {
        let mut state = initial;
        if let Some(decode) = &persistence.decode {
            match persistence.medium.get_item(&persistence.key) {
                Ok(Some(raw)) => match decode(&raw) {
                    Some(hydrated) => state = hydrated,
                    None => warn!(
                        "discarding undecodable persisted state for '{}'",
                        persistence.key
                    ),
                },
                Ok(None) => {}
                Err(e) => warn!(
                    "failed to read persisted state for '{}': {e:#}",
                    persistence.key
                ),
            }
        }
        Self {
            state: Mutex::new(state),
            listeners: Arc::new(Mutex::new(ListenerSet::default())),
            persistence: Some(persistence),
        }
    }

    /// Current value, cloned. No side effects.
    pub fn get_state(&self) -> T {
        self.state.lock().clone()
    }

    /// Run a closure against the current value without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.state.lock();
        f(&*guard)
    }

    /// Replace the value, persist, notify.
    pub fn set_state(&self, next: T) {
        let snapshot = self.write(next);
        self.notify_with(&snapshot);
    }

    /// Replace the value via a functional update, persist, notify.
    pub fn set_state_with(&self, f: impl FnOnce(&T) -> T) {
        let snapshot = {
            let mut guard = self.state.lock();
            let next = f(&*guard);
            *guard = next;
            guard.clone()
        };
        self.persist(&snapshot);
        self.notify_with(&snapshot);
    }

    /// Replace the value and persist, without notifying. Pair with
    /// `notify_listeners` once the surrounding operation is ready to
    /// publish.
    pub fn replace_silent(&self, next: T) {
        let _ = self.write(next);
    }

    /// Mutate the value in place and persist, without notifying.
    pub fn update_silent(&self, f: impl FnOnce(&mut T)) {
        let snapshot = {
            let mut guard = self.state.lock();
            f(&mut *guard);
            guard.clone()
        };
        self.persist(&snapshot);
    }

    /// Publish the current value to all subscribers.
    pub fn notify_listeners(&self) {
        let snapshot = self.get_state();
        self.notify_with(&snapshot);
    }

    /// Register a listener. Returns a handle whose `unsubscribe` removes it.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription
    where
        T: 'static,
    {
        let id = {
            let mut set = self.listeners.lock();
            let id = set.next_id;
            set.next_id += 1;
            set.entries.push((id, Arc::new(listener)));
            id
        };
        let weak: Weak<Mutex<ListenerSet<T>>> = Arc::downgrade(&self.listeners);
        Subscription {
            cancel: Arc::new(move || {
                if let Some(set) = weak.upgrade() {
                    set.lock().entries.retain(|(entry_id, _)| *entry_id != id);
                }
            }),
        }
    }

    fn write(&self, next: T) -> T {
        let snapshot = {
            let mut guard = self.state.lock();
            *guard = next;
            guard.clone()
        };
        self.persist(&snapshot);
        snapshot
    }

    fn persist(&self, value: &T) {
        let Some(p) = &self.persistence else {
            return;
        };
        let Some(encoded) = (p.encode)(value) else {
            return;
        };
        if let Err(e) = p.medium.set_item(&p.key, &encoded) {
            warn!("failed to persist state for '{}': {e:#}", p.key);
        }
    }

    fn notify_with(&self, value: &T) {
        // Snapshot the listener set up front: subscribers added while this
        // notification is running are not invoked for it.
        let entries: Vec<(u64, Listener<T>)> = self.listeners.lock().entries.clone();
        for (id, listener) in entries {
            if catch_unwind(AssertUnwindSafe(|| listener(value))).is_err() {
                warn!("subscriber {id} panicked during notification; continuing");
            }
        }
    }
}

impl<T: Clone + Default> Default for KeyedStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
