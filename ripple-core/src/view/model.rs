//! View Model
//!
//! A [`ViewModel`] owns an observed data root and exposes it to bindings:
//! top-level properties are proxied, nested ones are reached through path
//! expressions, and named methods can be attached for event handlers to
//! call.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use super::binding::{Binding, Directive, ModelBinding, Sink};
use crate::error::{Error, Result};
use crate::reactive::{observe, Observed, Path, Subscriber};
use crate::value::Value;

/// A method callable by name on a view model.
pub type Method = Arc<dyn Fn(&ViewModel) + Send + Sync>;

/// Observed data plus named methods. Clones share both.
#[derive(Clone)]
pub struct ViewModel {
    data: Observed,
    methods: Arc<IndexMap<String, Method>>,
}

/// Builder for [`ViewModel`].
pub struct ViewModelBuilder {
    data: Observed,
    methods: IndexMap<String, Method>,
}

impl ViewModelBuilder {
    /// Register `method` under `name`, replacing any earlier one.
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&ViewModel) + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
        self
    }

    pub fn build(self) -> ViewModel {
        observe(&Value::Object(self.data.clone()));
        ViewModel {
            data: self.data,
            methods: Arc::new(self.methods),
        }
    }
}

impl ViewModel {
    /// Observe `data` and wrap it without any methods.
    pub fn new(data: Observed) -> Self {
        Self::builder(data).build()
    }

    pub fn builder(data: Observed) -> ViewModelBuilder {
        ViewModelBuilder {
            data,
            methods: IndexMap::new(),
        }
    }

    /// Build from JSON. Anything but a JSON object yields empty data.
    pub fn from_json(json: serde_json::Value) -> Self {
        match Value::from(json) {
            Value::Object(data) => Self::new(data),
            other => {
                tracing::warn!(data = %other, "view model data is not an object");
                Self::new(Observed::new())
            }
        }
    }

    pub fn data(&self) -> &Observed {
        &self.data
    }

    /// Tracked read of a top-level property.
    pub fn get(&self, key: &str) -> Value {
        self.data.get(key)
    }

    /// Write a top-level property.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.data.set(key, value);
    }

    /// Tracked read through a path expression.
    pub fn get_path(&self, expression: &str) -> Result<Value> {
        Ok(Path::parse(expression)?.resolve(&self.data))
    }

    /// Write through a path expression.
    pub fn set_path(&self, expression: &str, value: impl Into<Value>) -> Result<()> {
        Path::parse(expression)?.assign(&self.data, value)
    }

    /// Subscribe `callback` to the value of `expression`.
    pub fn watch<F>(&self, expression: &str, callback: F) -> Result<Subscriber>
    where
        F: Fn(&Value, &Value) + Send + Sync + 'static,
    {
        Subscriber::new(&self.data, expression, callback)
    }

    /// Invoke a registered method.
    pub fn call(&self, name: &str) -> Result<()> {
        let method = self
            .methods
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownMethod(name.to_owned()))?;

        tracing::debug!(method = name, "calling view model method");
        method(self);
        Ok(())
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Bind `expression` one-way to `sink`.
    pub fn bind(&self, expression: &str, directive: Directive, sink: Arc<dyn Sink>) -> Result<Binding> {
        let path = Path::parse(expression)?;
        Ok(Binding::new(&self.data, path, directive, sink))
    }

    /// Bind `expression` two-way to an input control rendered by `sink`.
    pub fn bind_model(&self, expression: &str, sink: Arc<dyn Sink>) -> Result<ModelBinding> {
        let path = Path::parse(expression)?;
        Ok(ModelBinding::new(&self.data, path, sink))
    }
}

impl fmt::Debug for ViewModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModel")
            .field("data", &self.data)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}
