//! Dependency Registry
//!
//! One `Dep` exists per observed property, and one more per observed object.
//! It holds the subscribers interested in that property, in the order they
//! registered, and re-runs them when the property is written.
//!
//! # Ownership
//!
//! A registry references its subscribers weakly. Subscribers own strong
//! references to the registries they joined, so an observed tree never keeps
//! a subscriber alive on its own: once every handle to a subscriber is
//! dropped, the registry skips it and prunes the dead entry on the next
//! notification.
//!
//! # Iteration Policy
//!
//! `notify` works on a snapshot of the subscriber list taken before the first
//! update runs:
//!
//! - subscribers added while the pass is running are not invoked in that
//!   pass, only from the next notification on;
//! - subscribers removed while the pass is running are still invoked once
//!   in that pass. A disposed subscriber ignores the call.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::context::ActiveSlot;
use super::subscriber::{Subscribe, SubscriberId};

/// Identifier of a dependency registry.
///
/// Allocated from a process-wide counter, so ids only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

type Entry = (SubscriberId, Weak<dyn Subscribe>);

/// A dependency registry. Clones share the same subscriber list.
#[derive(Clone)]
pub struct Dep {
    inner: Arc<DepInner>,
}

struct DepInner {
    id: DepId,
    /// Duplicates are permitted here; subscribers dedupe by `DepId`.
    subs: RwLock<Vec<Entry>>,
}

impl Dep {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DepInner {
                id: DepId::next(),
                subs: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// Append a subscriber. No uniqueness check.
    pub fn add_sub(&self, subscriber: &Arc<dyn Subscribe>) {
        self.inner
            .subs
            .write()
            .push((subscriber.id(), Arc::downgrade(subscriber)));
    }

    /// Remove the first entry for `subscriber`, if there is one.
    pub fn remove_sub(&self, subscriber: SubscriberId) {
        let mut subs = self.inner.subs.write();
        if let Some(index) = subs.iter().position(|(id, _)| *id == subscriber) {
            subs.remove(index);
        }
    }

    /// Register the subscriber occupying the active slot, if any.
    pub fn depend(&self) {
        if let Some(subscriber) = ActiveSlot::current() {
            tracing::trace!(dep = self.inner.id.0, subscriber = ?subscriber.id(), "depend");
            subscriber.add_dep(self);
        }
    }

    /// Synchronously update every subscriber, in registration order.
    pub fn notify(&self) {
        let snapshot: Vec<Arc<dyn Subscribe>> = {
            let mut subs = self.inner.subs.write();
            subs.retain(|(_, weak)| weak.strong_count() > 0);
            subs.iter().filter_map(|(_, weak)| weak.upgrade()).collect()
        };

        tracing::debug!(dep = self.inner.id.0, subscribers = snapshot.len(), "notify");

        for subscriber in snapshot {
            subscriber.update();
        }
    }

    /// Number of entries currently held, duplicates included.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subs.read().len()
    }

    /// Whether both handles refer to the same registry.
    pub fn ptr_eq(&self, other: &Dep) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.inner.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
