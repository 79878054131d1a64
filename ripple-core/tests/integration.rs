//! Integration Tests for the Reactive Core
//!
//! These tests drive observed objects and subscribers together, the way a
//! view layer would.

use std::sync::Arc;

use parking_lot::Mutex;
use proptest::prelude::*;
use serde_json::json;

use ripple_core::reactive::{make_reactive, Observed, Path, Subscriber};
use ripple_core::view::{Directive, Sink, ViewModel};
use ripple_core::{Error, Value};

type Log = Arc<Mutex<Vec<(Value, Value)>>>;

fn root(json: serde_json::Value) -> Observed {
    match make_reactive(json) {
        Value::Object(object) => object,
        other => panic!("expected object, got {other:?}"),
    }
}

fn watch(data: &Observed, expression: &str) -> (Subscriber, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    let subscriber = Subscriber::new(data, expression, move |new, old| {
        sink.lock().push((new.clone(), old.clone()));
    })
    .unwrap();
    (subscriber, log)
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

/// Writing the current value again notifies nobody; a new value notifies
/// with (new, old).
#[test]
fn equal_write_is_silent() {
    let data = root(json!({ "a": 1 }));
    let (_sub, log) = watch(&data, "a");

    data.set("a", 1);
    assert!(log.lock().is_empty());

    data.set("a", 2);
    assert_eq!(*log.lock(), vec![(num(2.0), num(1.0))]);
}

/// Writing NaN over NaN is not a change.
#[test]
fn nan_write_over_nan_is_silent() {
    let data = root(json!({ "a": 0 }));
    data.set("a", f64::NAN);
    let (sub, log) = watch(&data, "a");

    data.set("a", f64::NAN);
    assert!(log.lock().is_empty());
    assert_eq!(sub.eval_count(), 1);
}

/// Replacing an object wakes subscribers of its leaves, and the new leaves
/// are tracked from then on.
#[test]
fn replacing_a_subtree_then_writing_its_leaf() {
    let data = root(json!({ "a": { "b": 1 } }));
    let (_sub, log) = watch(&data, "a.b");

    data.set("a", json!({ "b": 5 }));
    assert_eq!(*log.lock(), vec![(num(5.0), num(1.0))]);

    data.peek("a").as_object().unwrap().set("b", 9);
    assert_eq!(*log.lock(), vec![(num(5.0), num(1.0)), (num(9.0), num(5.0))]);
}

/// A deep path fires exactly once per distinct change.
#[test]
fn deep_path_fires_once_per_change() {
    let data = root(json!({ "a": { "b": { "c": "x" } } }));
    let (_sub, log) = watch(&data, "a.b.c");

    let b = data.peek("a").as_object().unwrap().peek("b");
    let b = b.as_object().unwrap().clone();
    b.set("c", "y");
    b.set("c", "y");
    b.set("c", "z");

    assert_eq!(
        *log.lock(),
        vec![
            (Value::from("y"), Value::from("x")),
            (Value::from("z"), Value::from("y")),
        ]
    );
}

/// Subscribers on one property are notified in the order they subscribed.
#[test]
fn notification_follows_registration_order() {
    let data = root(json!({ "a": 1 }));
    let order = Arc::new(Mutex::new(Vec::new()));

    let subs: Vec<Subscriber> = ["first", "second", "third"]
        .into_iter()
        .map(|name| {
            let order = order.clone();
            Subscriber::new(&data, "a", move |_, _| order.lock().push(name)).unwrap()
        })
        .collect();

    data.set("a", 2);
    assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    drop(subs);
}

/// An invalid expression creates no subscriber at all.
#[test]
fn invalid_expression_never_subscribes() {
    let data = root(json!({ "a": 1 }));
    let fired = Arc::new(Mutex::new(false));
    let flag = fired.clone();

    let result = Subscriber::new(&data, "a;b", move |_, _| *flag.lock() = true);
    assert!(matches!(result, Err(Error::InvalidExpression { .. })));

    data.set("a", 2);
    data.set("b", 3);
    assert!(!*fired.lock());
    assert_eq!(data.property_dep("a").unwrap().subscriber_count(), 0);
}

/// Dependencies are never pruned: a branch read once keeps notifying.
#[test]
fn dependencies_from_abandoned_branches_persist() {
    let data = root(json!({ "flag": true, "x": 1, "y": 100 }));
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();

    let sub = Subscriber::with_getter(
        &data,
        |d| {
            if d.get("flag").as_bool().unwrap_or(false) {
                d.get("x")
            } else {
                d.get("y")
            }
        },
        move |new, old| sink.lock().push((new.clone(), old.clone())),
    );
    let x_dep = data.property_dep("x").unwrap();

    data.set("flag", false);
    assert_eq!(sub.value(), num(100.0));
    let evaluations = sub.eval_count();

    // `x` is no longer read, yet writing it still re-runs the subscriber.
    data.set("x", 2);
    assert!(sub.depends_on(&x_dep));
    assert_eq!(sub.eval_count(), evaluations + 1);
    assert_eq!(*log.lock(), vec![(num(100.0), num(1.0))]);
}

/// Reading a key before it exists subscribes to the object; adding it
/// wakes the subscriber.
#[test]
fn adding_a_key_wakes_readers_of_the_missing_key() {
    let data = root(json!({}));
    let (sub, log) = watch(&data, "later");
    assert!(sub.value().is_undefined());

    data.set("later", "here");
    assert_eq!(*log.lock(), vec![(Value::from("here"), Value::Undefined)]);

    // From now on the property's own registry is used.
    data.set("later", "again");
    assert_eq!(log.lock().len(), 2);
}

/// Nulling a subtree and bringing it back reconnects through the parent.
#[test]
fn null_then_object_reconnects() {
    let data = root(json!({ "a": { "b": 1 } }));
    let (sub, log) = watch(&data, "a.b");

    data.set("a", Value::Null);
    data.set("a", json!({ "b": 3 }));

    assert_eq!(sub.value(), num(3.0));
    assert_eq!(
        *log.lock(),
        vec![(Value::Undefined, num(1.0)), (num(3.0), Value::Undefined)]
    );
}

/// A subscriber holding an object reference (not a leaf) is notified when
/// the whole object is replaced.
#[test]
fn whole_object_subscribers_see_replacement() {
    let data = root(json!({ "a": { "b": 1 } }));
    let (sub, log) = watch(&data, "a");
    let first = sub.value();

    data.set("a", json!({ "b": 1 }));

    let log = log.lock();
    assert_eq!(log.len(), 1);
    assert!(log[0].1.strict_eq(&first));
    assert!(!log[0].0.strict_eq(&first));
}

/// A subscriber that evaluates another subscriber inside its getter loses
/// attribution for the reads that follow.
#[test]
fn reentrant_evaluation_loses_attribution() {
    let data = root(json!({ "inner": 1, "after": 2 }));
    let (inner, _) = watch(&data, "inner");
    let nested = inner.clone();

    let outer = Subscriber::with_getter(
        &data,
        move |d| {
            nested.get();
            d.get("after")
        },
        |_, _| {},
    );

    assert!(!outer.depends_on(&data.property_dep("after").unwrap()));
}

#[derive(Default)]
struct Rendered(Mutex<Vec<String>>);

impl Sink for Rendered {
    fn apply(&self, _directive: Directive, content: &str) {
        self.0.lock().push(content.to_owned());
    }
}

/// End to end: a view model with a method, a text binding and a model
/// binding over the same data.
#[test]
fn view_model_round_trip() {
    let vm = ViewModel::builder(root(json!({ "form": { "name": "ada" }, "clicks": 0 })))
        .method("click", |vm| {
            let clicks = vm.data().peek("clicks").as_number().unwrap_or(0.0);
            vm.set("clicks", clicks + 1.0);
        })
        .build();

    let label = Arc::new(Rendered::default());
    let counter = Arc::new(Rendered::default());
    let input = Arc::new(Rendered::default());

    let _label = vm.bind("form.name", Directive::Text, label.clone()).unwrap();
    let _counter = vm.bind("clicks", Directive::Text, counter.clone()).unwrap();
    let model = vm.bind_model("form.name", input.clone()).unwrap();

    vm.call("click").unwrap();
    model.input("grace");
    model.flush().unwrap();

    assert_eq!(*label.0.lock(), vec!["ada", "grace"]);
    assert_eq!(*counter.0.lock(), vec!["0", "1"]);
    assert_eq!(*input.0.lock(), vec!["ada"]);
    assert_eq!(vm.data().to_json(), json!({ "form": { "name": "grace" }, "clicks": 1.0 }));
}

proptest! {
    /// Reading through a path returns the last value written along it.
    #[test]
    fn reads_return_last_write(writes in prop::collection::vec((0usize..3, -1000i32..1000), 1..40)) {
        let data = root(json!({ "a": { "x": 0, "y": 0 }, "z": 0 }));
        let paths = ["a.x", "a.y", "z"].map(|p| Path::parse(p).unwrap());
        let mut expected = [0i32; 3];

        for (slot, value) in writes {
            paths[slot].assign(&data, value).unwrap();
            expected[slot] = value;
        }

        for (path, value) in paths.iter().zip(expected) {
            prop_assert_eq!(path.resolve(&data), Value::from(value));
        }
    }

    /// A subscriber fires exactly once per distinct consecutive value.
    #[test]
    fn callback_count_matches_distinct_changes(values in prop::collection::vec(0i32..4, 0..30)) {
        let data = root(json!({ "v": 0 }));
        let (_sub, log) = watch(&data, "v");

        let mut current = 0;
        let mut changes = 0;
        for value in values {
            data.set("v", value);
            if value != current {
                changes += 1;
                current = value;
            }
        }

        prop_assert_eq!(log.lock().len(), changes);
    }
}
