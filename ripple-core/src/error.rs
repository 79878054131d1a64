//! Error types.
//!
//! The tracking core itself never fails: reads of missing data produce
//! `Value::Undefined` and notifications cannot error. Errors only surface at
//! the edges, when an expression is compiled or a write is routed through a
//! path.

/// Errors produced by `ripple_core`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A path expression failed syntactic validation.
    #[error("invalid expression `{expression}`: {reason}")]
    InvalidExpression {
        expression: String,
        reason: &'static str,
    },

    /// A write went through a path whose intermediate segment is missing or
    /// does not hold an object.
    #[error("cannot assign `{path}`: segment `{segment}` is not an object")]
    MissingSegment { path: String, segment: String },

    /// A view-model method was invoked by a name that was never registered.
    #[error("unknown method `{0}`")]
    UnknownMethod(String),
}

pub type Result<T> = std::result::Result<T, Error>;
