//! Reactive Core
//!
//! This module implements implicit dependency tracking over observed
//! objects: reading a property inside a subscriber's computation makes the
//! subscriber a dependent, and writing the property later re-runs it.
//!
//! # Concepts
//!
//! ## Observed objects
//!
//! An [`Observed`] object backs every own property with a dependency
//! registry ([`Dep`]). Nested objects are observed too, and carry a registry
//! of their own.
//!
//! ## Subscribers
//!
//! A [`Subscriber`] is a derived computation (a [`Path`] or a getter
//! function) bound to a callback. It is re-evaluated whenever a property it
//! read changes, and the callback fires when the result changes.
//!
//! ## The active slot
//!
//! [`ActiveSlot`] names the subscriber currently evaluating. It is what
//! connects a property read to the subscriber doing the reading.
//!
//! # Implementation Notes
//!
//! Everything is synchronous: a write notifies its registry, which re-runs
//! subscribers, which invoke callbacks, all before the write returns. There
//! is no batching and no cycle detection; a callback that writes a property
//! its own subscriber depends on recurses.

mod context;
mod dep;
mod observer;
mod path;
mod subscriber;

pub use context::ActiveSlot;
pub use dep::{Dep, DepId};
pub use observer::{make_reactive, observe, Observed};
pub use path::Path;
pub use subscriber::{Subscribe, Subscriber, SubscriberId};
