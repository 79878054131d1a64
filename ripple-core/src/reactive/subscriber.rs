//! Subscribers
//!
//! A [`Subscriber`] pairs a derived computation with a change callback. The
//! computation is either a [`Path`] or an arbitrary getter function over the
//! observed root.
//!
//! # Lifecycle
//!
//! 1. On construction the getter runs once, with the subscriber in the
//!    active slot, so every property it reads registers the subscriber.
//!
//! 2. When one of those properties is written, its registry calls
//!    `update`, which re-runs the getter. If the result differs (strict
//!    equality) from the stored value, the value is replaced and the
//!    callback receives `(new, old)`. Otherwise the re-run is silent.
//!
//! 3. Dependencies are only ever added. A property read on some earlier
//!    evaluation keeps notifying the subscriber even if later evaluations no
//!    longer read it.
//!
//! 4. `dispose` (or dropping every handle) detaches the subscriber.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::context::ActiveSlot;
use super::dep::{Dep, DepId};
use super::observer::Observed;
use super::path::Path;
use crate::error::Result;
use crate::value::Value;

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything a [`Dep`] can hold and notify.
pub trait Subscribe: Send + Sync {
    fn id(&self) -> SubscriberId;

    /// Called by a registry when a dependency changed.
    fn update(self: Arc<Self>);

    /// Record `dep` as a dependency, joining it at most once.
    fn add_dep(self: Arc<Self>, dep: &Dep);
}

type Getter = Box<dyn Fn(&Observed) -> Value + Send + Sync>;
type Callback = Box<dyn Fn(&Value, &Value) + Send + Sync>;

enum Source {
    Path(Path),
    Getter(Getter),
}

impl Source {
    fn evaluate(&self, root: &Observed) -> Value {
        match self {
            Source::Path(path) => path.resolve(root),
            Source::Getter(getter) => getter(root),
        }
    }
}

struct Watcher {
    id: SubscriberId,
    root: Observed,
    source: Source,
    callback: Callback,
    value: Mutex<Value>,
    deps: Mutex<IndexMap<DepId, Dep>>,
    disposed: AtomicBool,
    evaluations: AtomicUsize,
}

impl Watcher {
    /// Evaluate the source with this watcher in the active slot.
    fn get(self: &Arc<Self>) -> Value {
        let _slot = ActiveSlot::enter(self.clone());
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        self.source.evaluate(&self.root)
    }

    fn run(self: &Arc<Self>) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let new_value = self.get();
        let old_value = {
            let mut current = self.value.lock();
            if new_value.strict_eq(&current) {
                return;
            }
            std::mem::replace(&mut *current, new_value.clone())
        };

        tracing::debug!(subscriber = ?self.id, new = %new_value, old = %old_value, "changed");
        (self.callback)(&new_value, &old_value);
    }
}

impl Subscribe for Watcher {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn update(self: Arc<Self>) {
        self.run();
    }

    fn add_dep(self: Arc<Self>, dep: &Dep) {
        if self.disposed.load(Ordering::SeqCst) {
            return;
        }

        let joined = {
            let mut deps = self.deps.lock();
            if deps.contains_key(&dep.id()) {
                false
            } else {
                deps.insert(dep.id(), dep.clone());
                true
            }
        };

        if joined {
            tracing::trace!(subscriber = ?self.id, dep = dep.id().raw(), "joined");
            dep.add_sub(&(self as Arc<dyn Subscribe>));
        }
    }
}

/// A derived computation over an observed root with a change callback.
///
/// Clones share the same subscriber. The subscriber lives as long as any
/// handle does.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use parking_lot::Mutex;
/// use ripple_core::reactive::{make_reactive, Subscriber};
/// use serde_json::json;
///
/// let data = make_reactive(json!({ "a": { "b": 1 } }));
/// let root = data.as_object().unwrap();
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = seen.clone();
/// let _sub = Subscriber::new(root, "a.b", move |new, old| {
///     log.lock().push((new.to_string(), old.to_string()));
/// })
/// .unwrap();
///
/// root.set("a", json!({ "b": 5 }));
/// assert_eq!(*seen.lock(), vec![("5".to_string(), "1".to_string())]);
/// ```
#[derive(Clone)]
pub struct Subscriber {
    inner: Arc<Watcher>,
}

impl Subscriber {
    /// Subscribe to a dotted path expression.
    ///
    /// Fails with `Error::InvalidExpression` if the expression does not
    /// parse; no subscriber is created in that case.
    pub fn new<F>(root: &Observed, expression: &str, callback: F) -> Result<Self>
    where
        F: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        let path = Path::parse(expression)?;
        Ok(Self::from_path(root, path, callback))
    }

    /// Subscribe to an already parsed path.
    pub fn from_path<F>(root: &Observed, path: Path, callback: F) -> Self
    where
        F: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        Self::build(root, Source::Path(path), Box::new(callback))
    }

    /// Subscribe to an arbitrary getter over the root.
    pub fn with_getter<G, F>(root: &Observed, getter: G, callback: F) -> Self
    where
        G: Fn(&Observed) -> Value + Send + Sync + 'static,
        F: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        Self::build(root, Source::Getter(Box::new(getter)), Box::new(callback))
    }

    fn build(root: &Observed, source: Source, callback: Callback) -> Self {
        let inner = Arc::new(Watcher {
            id: SubscriberId::new(),
            root: root.clone(),
            source,
            callback,
            value: Mutex::new(Value::Undefined),
            deps: Mutex::new(IndexMap::new()),
            disposed: AtomicBool::new(false),
            evaluations: AtomicUsize::new(0),
        });

        let initial = inner.get();
        tracing::debug!(subscriber = ?inner.id, value = %initial, "subscribed");
        *inner.value.lock() = initial;

        Self { inner }
    }

    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    /// The value computed by the last evaluation that changed it.
    pub fn value(&self) -> Value {
        self.inner.value.lock().clone()
    }

    /// The path this subscriber follows, if it was built from one.
    pub fn path(&self) -> Option<&Path> {
        match &self.inner.source {
            Source::Path(path) => Some(path),
            Source::Getter(_) => None,
        }
    }

    /// Evaluate without storing the result or invoking the callback.
    ///
    /// Dependencies read during evaluation are still recorded.
    pub fn get(&self) -> Value {
        self.inner.get()
    }

    /// Re-run and fire the callback if the value changed.
    pub fn update(&self) {
        self.inner.clone().update();
    }

    /// Detach from every registry joined so far.
    ///
    /// Later updates are no-ops and the stored value is frozen.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let deps = std::mem::take(&mut *self.inner.deps.lock());
        for dep in deps.values() {
            dep.remove_sub(self.inner.id);
        }
        tracing::debug!(subscriber = ?self.inner.id, deps = deps.len(), "disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Number of distinct registries joined so far.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.lock().len()
    }

    /// Whether this subscriber has joined `dep`.
    pub fn depends_on(&self, dep: &Dep) -> bool {
        self.inner.deps.lock().contains_key(&dep.id())
    }

    /// Number of times the source has been evaluated, initial run included.
    pub fn eval_count(&self) -> usize {
        self.inner.evaluations.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.inner.id)
            .field("path", &self.path().map(Path::as_str))
            .field("value", &self.value())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
