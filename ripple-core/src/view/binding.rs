//! Directive Bindings
//!
//! A binding connects one path in the view model to one rendering target.
//! Each binding owns exactly one [`Subscriber`]; whenever the value at the
//! path changes, the binding renders it and pushes the result into its
//! [`Sink`].
//!
//! Two-way bindings ([`ModelBinding`]) also route input back into the view
//! model. Input is held as a pending write until the host commits it with
//! [`ModelBinding::flush`], which is where a host plugs in its own debounce
//! timer. While a binding commits its own input it does not re-render the
//! echo of that write.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;
use crate::reactive::{Observed, Path, Subscriber};
use crate::value::Value;

/// What a binding renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Plain text content.
    Text,
    /// Markup content.
    Html,
    /// Class list. Currently renders nothing.
    Class,
    /// The value of an input control.
    Model,
}

impl Directive {
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Text => "text",
            Directive::Html => "html",
            Directive::Class => "class",
            Directive::Model => "model",
        }
    }

    /// Look a directive up by its attribute name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "text" => Some(Directive::Text),
            "html" => Some(Directive::Html),
            "class" => Some(Directive::Class),
            "model" => Some(Directive::Model),
            _ => None,
        }
    }

    /// Render `value` for this directive.
    ///
    /// `Undefined` and `Null` render as the empty string. `Class` renders
    /// nothing.
    pub fn render(&self, value: &Value) -> Option<String> {
        match self {
            Directive::Class => None,
            _ if value.is_nullish() => Some(String::new()),
            _ => Some(value.to_string()),
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives rendered content from bindings.
pub trait Sink: Send + Sync {
    fn apply(&self, directive: Directive, content: &str);
}

fn push(sink: &dyn Sink, directive: Directive, value: &Value) {
    if let Some(content) = directive.render(value) {
        sink.apply(directive, &content);
    }
}

/// A one-way binding from a path to a sink.
#[derive(Debug)]
pub struct Binding {
    directive: Directive,
    subscriber: Subscriber,
}

impl Binding {
    /// Bind `path` under `root` to `sink`, rendering the current value
    /// immediately.
    pub fn new(root: &Observed, path: Path, directive: Directive, sink: Arc<dyn Sink>) -> Self {
        let target = sink.clone();
        let subscriber = Subscriber::from_path(root, path, move |new, _old| {
            push(target.as_ref(), directive, new);
        });
        push(sink.as_ref(), directive, &subscriber.value());

        Self {
            directive,
            subscriber,
        }
    }

    pub fn directive(&self) -> Directive {
        self.directive
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    /// Stop rendering.
    pub fn unbind(&self) {
        self.subscriber.dispose();
    }
}

/// A two-way binding between a path and an input control.
pub struct ModelBinding {
    root: Observed,
    path: Path,
    subscriber: Subscriber,
    /// Set while this binding commits its own input.
    editing: Arc<AtomicBool>,
    /// Last value seen at the path, from either direction.
    committed: Arc<Mutex<Value>>,
    pending: Mutex<Option<Value>>,
}

impl ModelBinding {
    /// Bind `path` under `root` to `sink` in both directions.
    pub fn new(root: &Observed, path: Path, sink: Arc<dyn Sink>) -> Self {
        let editing = Arc::new(AtomicBool::new(false));
        let committed = Arc::new(Mutex::new(Value::Undefined));

        let subscriber = {
            let editing = editing.clone();
            let committed = committed.clone();
            let target = sink.clone();
            Subscriber::from_path(root, path.clone(), move |new, _old| {
                *committed.lock() = new.clone();
                if editing.load(Ordering::SeqCst) {
                    tracing::trace!("skipping render of own input");
                    return;
                }
                push(target.as_ref(), Directive::Model, new);
            })
        };

        let initial = subscriber.value();
        push(sink.as_ref(), Directive::Model, &initial);
        *committed.lock() = initial;

        Self {
            root: root.clone(),
            path,
            subscriber,
            editing,
            committed,
            pending: Mutex::new(None),
        }
    }

    /// Record user input. Input equal to the last known value is dropped;
    /// otherwise it replaces any input not yet flushed.
    pub fn input(&self, value: impl Into<Value>) {
        let value = value.into();
        if value.strict_eq(&self.committed.lock()) {
            return;
        }
        *self.pending.lock() = Some(value);
    }

    /// Input waiting for the next flush.
    pub fn pending(&self) -> Option<Value> {
        self.pending.lock().clone()
    }

    /// Write pending input into the view model.
    ///
    /// Returns whether anything was written. If the write fails the input
    /// stays pending, unless newer input arrived in the meantime.
    pub fn flush(&self) -> Result<bool> {
        let Some(value) = self.pending.lock().take() else {
            return Ok(false);
        };

        self.editing.store(true, Ordering::SeqCst);
        let written = self.path.assign(&self.root, value.clone());
        self.editing.store(false, Ordering::SeqCst);

        if let Err(error) = written {
            tracing::debug!(path = %self.path, %error, "model input kept pending");
            let mut pending = self.pending.lock();
            if pending.is_none() {
                *pending = Some(value);
            }
            return Err(error);
        }

        tracing::debug!(path = %self.path, value = %value, "model input committed");
        *self.committed.lock() = value;
        Ok(true)
    }

    pub fn subscriber(&self) -> &Subscriber {
        &self.subscriber
    }

    pub fn unbind(&self) {
        self.subscriber.dispose();
    }
}

impl fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBinding")
            .field("path", &self.path.as_str())
            .field("committed", &*self.committed.lock())
            .field("pending", &self.pending())
            .finish()
    }
}
