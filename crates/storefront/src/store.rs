//! Observable state container.
//!
//! A [`Store`] owns a state value. [`Store::set_state`] shallow-merges a
//! partial update into it and then calls every subscriber, synchronously and
//! in subscription order, with the new state. There is no batching: two calls
//! mean two notifications.

use std::fmt;

/// State that can absorb a partial update.
pub trait Merge {
    /// A partial version of the state, typically every field wrapped in `Option`.
    type Patch;

    /// Overwrite the fields present in `patch`, leaving the others untouched.
    fn merge(&mut self, patch: Self::Patch);
}

/// Handle returned by [`Store::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<S> = Box<dyn Fn(&S) + Send>;

/// Observable state container.
pub struct Store<S> {
    state: S,
    listeners: Vec<(SubscriptionId, Listener<S>)>,
    next_id: u64,
}

impl<S: fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<S> Store<S> {
    /// Create a store holding `state` with no subscribers.
    #[must_use]
    pub const fn new(state: S) -> Self {
        Self {
            state,
            listeners: Vec::new(),
            next_id: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &S {
        &self.state
    }

    /// Register a listener. It is not called until the next change.
    pub fn subscribe(&mut self, listener: impl Fn(&S) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.listeners.len()
    }

    /// Apply an arbitrary mutation, then notify every subscriber.
    pub fn update<R>(&mut self, mutate: impl FnOnce(&mut S) -> R) -> R {
        let result = mutate(&mut self.state);
        self.notify();
        result
    }

    /// Call every subscriber with the current state.
    pub fn notify(&self) {
        for (_, listener) in &self.listeners {
            listener(&self.state);
        }
    }
}

impl<S: Merge> Store<S> {
    /// Shallow-merge `patch` into the state and notify subscribers.
    pub fn set_state(&mut self, patch: S::Patch) {
        self.update(|state| state.merge(patch));
    }
}
