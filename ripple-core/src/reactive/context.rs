//! Active-Subscriber Slot
//!
//! The slot names the subscriber whose getter is currently running. Property
//! reads consult it to decide which subscriber to attribute themselves to,
//! which is how dependencies are discovered without any explicit
//! subscribe call.
//!
//! # Implementation
//!
//! The slot is thread-local and holds at most one subscriber. It is filled
//! immediately before a getter runs and cleared as soon as the getter
//! returns, through the [`ActiveSlot`] guard.
//!
//! It is deliberately not a stack. A getter that evaluates another
//! subscriber re-entrantly overwrites the slot, and once the inner
//! evaluation finishes the slot is empty, so the outer getter's remaining
//! reads go unattributed. Overwrites are logged so they can be found.

use std::cell::RefCell;
use std::sync::Arc;

use super::subscriber::{Subscribe, SubscriberId};

thread_local! {
    static ACTIVE: RefCell<Option<Arc<dyn Subscribe>>> = const { RefCell::new(None) };
}

/// Guard that occupies the slot and clears it when dropped.
///
/// Clearing on drop keeps the slot consistent even if a getter panics.
pub struct ActiveSlot {
    subscriber_id: SubscriberId,
}

impl ActiveSlot {
    /// Put `subscriber` in the slot for the lifetime of the returned guard.
    pub fn enter(subscriber: Arc<dyn Subscribe>) -> Self {
        let subscriber_id = subscriber.id();
        let previous = ACTIVE.with(|slot| slot.borrow_mut().replace(subscriber));

        if let Some(previous) = previous {
            tracing::warn!(
                current = ?previous.id(),
                incoming = ?subscriber_id,
                "active subscriber overwritten by re-entrant evaluation"
            );
        }

        Self { subscriber_id }
    }

    /// The subscriber currently occupying the slot, if any.
    pub fn current() -> Option<Arc<dyn Subscribe>> {
        ACTIVE.with(|slot| slot.borrow().clone())
    }

    /// Whether some subscriber is evaluating on this thread.
    pub fn is_occupied() -> bool {
        ACTIVE.with(|slot| slot.borrow().is_some())
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        let cleared = ACTIVE.with(|slot| slot.borrow_mut().take());

        if let Some(cleared) = cleared {
            if cleared.id() != self.subscriber_id {
                tracing::trace!(
                    owner = ?self.subscriber_id,
                    cleared = ?cleared.id(),
                    "slot cleared by a different evaluation than the one that filled it"
                );
            }
        }
    }
}
