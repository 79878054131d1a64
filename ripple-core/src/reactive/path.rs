//! Path Expressions
//!
//! A path is a dotted chain of property names, such as `user.address.city`,
//! validated and split once when it is parsed. Reading through a path from
//! inside a subscriber's getter registers a dependency on every property
//! along the way, which is what lets replacing `user` wake up a subscriber
//! that only cares about `user.address.city`.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use super::observer::Observed;
use crate::error::{Error, Result};
use crate::value::Value;

/// A validated dotted path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    expression: String,
    segments: SmallVec<[String; 4]>,
}

impl Path {
    /// Validate and split an expression.
    ///
    /// The expression is trimmed first. It must be non-empty, consist only of
    /// ASCII word characters, `.` and `$`, and contain no empty segment.
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let invalid = |reason| Error::InvalidExpression {
            expression: expression.to_owned(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(invalid("expression is empty"));
        }
        if !trimmed.chars().all(is_path_char) {
            return Err(invalid("only word characters, `.` and `$` are allowed"));
        }

        let segments: SmallVec<[String; 4]> =
            trimmed.split('.').map(|segment| segment.trim().to_owned()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(invalid("empty path segment"));
        }

        Ok(Self {
            expression: trimmed.to_owned(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.expression
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Read the value at this path, starting from `root`.
    ///
    /// Every property read along the way is tracked. Evaluation stops with
    /// `Undefined` at the first intermediate that is not an object.
    pub fn resolve(&self, root: &Observed) -> Value {
        let mut current = Value::Object(root.clone());
        for segment in &self.segments {
            current = match current {
                Value::Object(object) => object.get(segment),
                _ => return Value::Undefined,
            };
        }
        current
    }

    /// Write `value` at this path, starting from `root`.
    ///
    /// Intermediates are read untracked. A missing or non-object intermediate
    /// is an error: nothing is created on the way. The final property is
    /// added if it does not exist yet.
    pub fn assign(&self, root: &Observed, value: impl Into<Value>) -> Result<()> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Ok(());
        };

        let mut target = root.clone();
        for segment in parents {
            target = match target.peek(segment) {
                Value::Object(object) => object,
                _ => {
                    return Err(Error::MissingSegment {
                        path: self.expression.clone(),
                        segment: segment.clone(),
                    })
                }
            };
        }

        target.set(last, value);
        Ok(())
    }
}

fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$'
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}
