//! Observed Objects
//!
//! An [`Observed`] is an object whose every own property is individually
//! trackable. Each property is backed by its own [`Dep`], and the object as
//! a whole carries one more.
//!
//! # How Observation Works
//!
//! 1. Reading a property while a subscriber occupies the active slot
//!    registers that subscriber with the property's registry. If the
//!    property holds a nested object, the subscriber is registered with the
//!    nested object's own registry too.
//!
//! 2. Writing a property compares the new value with the stored one. An
//!    equal write (NaN included) does nothing. Otherwise the value is
//!    stored, observed (if it is an object), and the property's registry is
//!    notified, followed by the replaced object's own registry if the old
//!    value was an object.
//!
//! 3. Reading a property that does not exist depends on the object's own
//!    registry, and adding a property notifies it, so subscribers that
//!    looked for a missing key re-run once it appears.
//!
//! # Re-observation
//!
//! Observing an object always hands it fresh registries, for itself and
//! every property below it, even if it was observed before. Subscribers
//! attached to the old registries stay attached to nothing until their next
//! evaluation re-registers them.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::ser::{Serialize, Serializer};

use super::context::ActiveSlot;
use super::dep::Dep;
use crate::value::Value;

/// Handle to an observed object. Clones share the same object.
#[derive(Clone)]
pub struct Observed {
    inner: Arc<ObservedInner>,
}

struct ObservedInner {
    /// Notified when a property is added.
    dep: RwLock<Dep>,
    props: RwLock<IndexMap<String, Property>>,
}

struct Property {
    dep: Dep,
    value: Value,
}

impl Property {
    fn new(value: Value) -> Self {
        Self {
            dep: Dep::new(),
            value,
        }
    }
}

/// What a write did, decided under the lock and acted on after it.
enum Write {
    Replaced { dep: Dep, old: Value },
    Added,
}

impl Observed {
    /// Create an empty observed object.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ObservedInner {
                dep: RwLock::new(Dep::new()),
                props: RwLock::new(IndexMap::new()),
            }),
        }
    }

    /// Tracked read of `key`.
    pub fn get(&self, key: &str) -> Value {
        let found = self
            .inner
            .props
            .read()
            .get(key)
            .map(|property| (property.dep.clone(), property.value.clone()));

        let Some((dep, value)) = found else {
            self.dep().depend();
            return Value::Undefined;
        };

        if ActiveSlot::is_occupied() {
            tracing::trace!(key, dep = dep.id().raw(), "tracked read");
            dep.depend();
            if let Value::Object(child) = &value {
                child.dep().depend();
            }
        }

        value
    }

    /// Untracked read of `key`.
    pub fn peek(&self, key: &str) -> Value {
        self.inner
            .props
            .read()
            .get(key)
            .map(|property| property.value.clone())
            .unwrap_or_default()
    }

    /// Write `key`, notifying dependents if the value changed.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();

        let write = {
            let mut props = self.inner.props.write();
            match props.get_mut(key) {
                Some(property) => {
                    if property.value.same_value(&value) {
                        return;
                    }
                    let old = std::mem::replace(&mut property.value, value.clone());
                    Write::Replaced {
                        dep: property.dep.clone(),
                        old,
                    }
                }
                None => {
                    props.insert(key.to_owned(), Property::new(value.clone()));
                    Write::Added
                }
            }
        };

        tracing::debug!(key, value = %value, "write");
        observe(&value);

        match write {
            Write::Replaced { dep, old } => {
                dep.notify();
                if let Value::Object(old) = old {
                    old.dep().notify();
                }
            }
            Write::Added => self.dep().notify(),
        }
    }

    /// The object's own registry.
    pub fn dep(&self) -> Dep {
        self.inner.dep.read().clone()
    }

    /// The registry backing `key`, if the property exists.
    pub fn property_dep(&self, key: &str) -> Option<Dep> {
        self.inner
            .props
            .read()
            .get(key)
            .map(|property| property.dep.clone())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.props.read().contains_key(key)
    }

    /// Own keys in insertion order. Untracked.
    pub fn keys(&self) -> Vec<String> {
        self.inner.props.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.props.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.props.read().is_empty()
    }

    /// Untracked snapshot of own entries in insertion order.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.inner
            .props
            .read()
            .iter()
            .map(|(key, property)| (key.clone(), property.value.clone()))
            .collect()
    }

    /// Untracked deep snapshot as JSON.
    ///
    /// An object that contains itself, directly or further down, appears as
    /// `null` where the cycle closes. Objects shared without a cycle are
    /// written out in full at every occurrence.
    pub fn to_json(&self) -> serde_json::Value {
        self.to_json_within(&mut HashSet::new())
    }

    fn to_json_within(&self, ancestors: &mut HashSet<usize>) -> serde_json::Value {
        let address = Arc::as_ptr(&self.inner) as usize;
        if !ancestors.insert(address) {
            tracing::trace!("cycle closed while converting to json");
            return serde_json::Value::Null;
        }

        let map = self
            .entries()
            .into_iter()
            .map(|(key, value)| {
                let json = match &value {
                    Value::Object(child) => child.to_json_within(ancestors),
                    other => other.to_json(),
                };
                (key, json)
            })
            .collect();

        ancestors.remove(&address);
        serde_json::Value::Object(map)
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Observed) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Give this object and everything below it fresh registries.
    fn rewrap(&self, seen: &mut HashSet<usize>) {
        if !seen.insert(Arc::as_ptr(&self.inner) as usize) {
            return;
        }

        *self.inner.dep.write() = Dep::new();

        let children: Vec<Observed> = {
            let mut props = self.inner.props.write();
            props
                .values_mut()
                .filter_map(|property| {
                    property.dep = Dep::new();
                    property.value.as_object().cloned()
                })
                .collect()
        };

        for child in children {
            child.rewrap(seen);
        }
    }
}

/// Make `value` trackable.
///
/// Primitives are left alone and yield `None`. Objects are (re-)observed
/// recursively and returned.
pub fn observe(value: &Value) -> Option<Observed> {
    let object = value.as_object()?;
    object.rewrap(&mut HashSet::new());
    Some(object.clone())
}

/// Observe `value` and hand it back.
///
/// ```rust
/// use ripple_core::reactive::make_reactive;
/// use serde_json::json;
///
/// let data = make_reactive(json!({ "user": { "name": "ada" } }));
/// let user = data.as_object().unwrap().peek("user");
/// assert_eq!(user.as_object().unwrap().peek("name").as_str(), Some("ada"));
/// ```
pub fn make_reactive(value: impl Into<Value>) -> Value {
    let value = value.into();
    observe(&value);
    value
}

impl Default for Observed {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Observed
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let props = iter
            .into_iter()
            .map(|(key, value)| (key.into(), Property::new(value.into())))
            .collect();

        Self {
            inner: Arc::new(ObservedInner {
                dep: RwLock::new(Dep::new()),
                props: RwLock::new(props),
            }),
        }
    }
}

impl Serialize for Observed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observed")
            .field("dep", &self.dep().id())
            .field("keys", &self.keys())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Subscriber;
    use serde_json::json;

    fn object(json: serde_json::Value) -> Observed {
        match make_reactive(json) {
            Value::Object(object) => object,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn observe_ignores_primitives() {
        assert!(observe(&Value::Number(1.0)).is_none());
        assert!(observe(&Value::Null).is_none());
        assert!(observe(&Value::Undefined).is_none());
    }

    #[test]
    fn every_property_gets_its_own_registry() {
        let data = object(json!({ "a": 1, "b": { "c": 2 } }));

        let a = data.property_dep("a").unwrap();
        let b = data.property_dep("b").unwrap();
        assert_ne!(a.id(), b.id());

        let nested = data.peek("b");
        let nested = nested.as_object().unwrap();
        assert!(nested.property_dep("c").is_some());
        assert_ne!(nested.dep().id(), b.id());
    }

    #[test]
    fn keys_keep_insertion_order() {
        let data: Observed = [("z", 1), ("a", 2), ("m", 3)].into_iter().collect();
        data.set("b", 4);
        assert_eq!(data.keys(), ["z", "a", "m", "b"]);
        assert_eq!(data.len(), 4);
    }

    #[test]
    fn set_stores_and_get_reads_back() {
        let data = object(json!({ "a": 1 }));
        data.set("a", 2);
        assert_eq!(data.get("a"), Value::Number(2.0));
        assert!(data.get("missing").is_undefined());
    }

    #[test]
    fn same_value_write_keeps_registry() {
        let data = object(json!({ "a": { "b": 1 } }));
        let before = data.property_dep("a").unwrap();

        let same = data.peek("a");
        data.set("a", same);

        assert!(data.property_dep("a").unwrap().ptr_eq(&before));
    }

    #[test]
    fn assigning_an_object_gives_the_subtree_fresh_registries() {
        let data = object(json!({ "a": 1 }));
        let child = object(json!({ "x": { "y": 1 } }));
        let child_dep = child.dep().id();
        let x_dep = child.property_dep("x").unwrap().id();

        data.set("a", child.clone());

        // The property keeps its registry; the new subtree is re-observed.
        assert_ne!(child.dep().id(), child_dep);
        assert_ne!(child.property_dep("x").unwrap().id(), x_dep);
    }

    #[test]
    fn nulling_a_subtree_collapses_it_to_a_leaf() {
        let data = object(json!({ "a": { "b": 1 } }));
        data.set("a", Value::Null);
        assert!(data.peek("a").as_object().is_none());

        data.set("a", json!({ "b": 2 }));
        let restored = data.peek("a");
        assert_eq!(restored.as_object().unwrap().peek("b"), Value::Number(2.0));
    }

    #[test]
    fn reobserving_a_cycle_terminates() {
        let data = object(json!({ "a": {} }));
        let inner = data.peek("a");
        inner.as_object().unwrap().set("parent", data.clone());
        assert!(inner.as_object().unwrap().contains_key("parent"));
    }

    #[test]
    fn cycles_close_as_null_in_json() {
        let data = object(json!({ "a": {} }));
        data.peek("a").as_object().unwrap().set("parent", data.clone());

        let expected = json!({ "a": { "parent": null } });
        assert_eq!(data.to_json(), expected);
        assert_eq!(serde_json::to_value(&data).unwrap(), expected);
    }

    #[test]
    fn shared_objects_are_written_at_every_occurrence() {
        let shared = object(json!({ "v": 1 }));
        let data: Observed = [("x", shared.clone()), ("y", shared)].into_iter().collect();
        assert_eq!(data.to_json(), json!({ "x": { "v": 1.0 }, "y": { "v": 1.0 } }));
    }

    #[test]
    fn nested_read_depends_on_the_child_object() {
        let data = object(json!({ "a": { "b": 1 } }));
        let sub = Subscriber::with_getter(&data, |d| d.get("a"), |_, _| {});
        assert_eq!(sub.eval_count(), 1);

        // Only the child's own registry hears about a new key.
        data.peek("a").as_object().unwrap().set("c", 2);
        assert_eq!(sub.eval_count(), 2);
    }

    #[test]
    fn replacing_an_object_notifies_its_own_registry() {
        let data = object(json!({ "a": { "b": 1 } }));
        let old = data.peek("a");
        data.set("c", old.clone());

        // Reached through `c` only: registered on `c` and on the object itself.
        let sub = Subscriber::with_getter(&data, |d| d.get("c"), |_, _| {});
        let object_dep = old.as_object().unwrap().dep();
        assert!(sub.depends_on(&object_dep));
        assert!(!sub.depends_on(&data.property_dep("a").unwrap()));

        data.set("a", json!({ "b": 2 }));
        assert_eq!(sub.eval_count(), 2);
    }

    #[test]
    fn serializes_untracked_snapshot() {
        let data = object(json!({ "name": "ada", "age": 36 }));
        let rendered = serde_json::to_value(&data).unwrap();
        assert_eq!(rendered, json!({ "name": "ada", "age": 36.0 }));
    }
}
