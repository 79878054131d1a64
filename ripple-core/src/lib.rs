//! Ripple Core
//!
//! This crate provides fine-grained reactive state for object-shaped data.
//! It implements:
//!
//! - Observation of nested objects, one dependency registry per property
//! - Implicit dependency discovery: reads inside a computation subscribe it
//! - Synchronous change propagation to derived computations
//! - A view model and directive bindings built on top of the core
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: the dynamic values stored in observed properties
//! - `reactive`: observed objects, dependency registries, subscribers and
//!   the active-subscriber slot
//! - `view`: view model, one-way and two-way bindings
//! - `error`: the crate's error type
//!
//! # Example
//!
//! ```rust
//! use ripple_core::reactive::{make_reactive, Subscriber};
//! use serde_json::json;
//!
//! let data = make_reactive(json!({ "count": 1 }));
//! let root = data.as_object().unwrap();
//!
//! let doubled = Subscriber::with_getter(
//!     root,
//!     |d| (d.get("count").as_number().unwrap_or(0.0) * 2.0).into(),
//!     |new, old| println!("doubled: {old} -> {new}"),
//! );
//!
//! root.set("count", 5);
//! // The subscriber re-ran automatically, printing "doubled: 2 -> 10"
//! assert_eq!(doubled.value().as_number(), Some(10.0));
//! ```

pub mod error;
pub mod reactive;
pub mod value;
pub mod view;

pub use error::{Error, Result};
pub use value::Value;
