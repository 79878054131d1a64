//! View Layer
//!
//! The pieces of a view that sit directly on the reactive core: a view
//! model holding the observed data, and directive bindings that render
//! values into host-provided sinks. Parsing templates and walking a node
//! tree are left to the host; it decides which paths to bind and supplies
//! a [`Sink`] per target.

mod binding;
mod model;

pub use binding::{Binding, Directive, ModelBinding, Sink};
pub use model::{Method, ViewModel, ViewModelBuilder};
