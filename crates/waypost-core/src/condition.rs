//! Field conditions deciding whether an entry applies to an input.
//!
//! A [`Conditions`] set maps field names to a [`Condition`]. The set
//! matches an [`Input`] when every condition passes for the corresponding
//! field; an empty set matches every input.
//!
//! ```rust
//! use regex::Regex;
//! use waypost_core::{Conditions, Input};
//!
//! let conditions = Conditions::new()
//!     .equals("method", "GET")
//!     .pattern("host", Regex::new(r"\.example\.com$").unwrap())
//!     .test("retries", |v| v.and_then(|v| v.as_u64()).is_some_and(|n| n < 3));
//!
//! let input = Input::new()
//!     .with("method", "GET")
//!     .with("host", "api.example.com")
//!     .with("retries", 1);
//! assert!(conditions.matches(&input));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value};

use crate::input::Input;

/// A type-erased field predicate.
pub type PredicateFn = Arc<dyn Fn(Option<&Value>) -> bool + Send + Sync>;

/// A single field condition.
#[derive(Clone)]
pub enum Condition {
    /// The field must equal this value. `Null` also accepts an absent field.
    Equals(Value),
    /// The field's textual form must match this expression.
    Pattern(Regex),
    /// The predicate must return `true` for the field.
    Predicate(PredicateFn),
}

impl Condition {
    /// Evaluates this condition against a field value.
    pub fn check(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Equals(expected) => match value {
                Some(actual) => values_equal(actual, expected),
                None => expected.is_null(),
            },
            Self::Pattern(regex) => match value {
                Some(Value::String(s)) => regex.is_match(s),
                Some(Value::Number(n)) => regex.is_match(&n.to_string()),
                Some(Value::Bool(b)) => regex.is_match(if *b { "true" } else { "false" }),
                _ => false,
            },
            Self::Predicate(f) => f(value),
        }
    }
}

/// Equality where numbers compare by value, so `1` equals `1.0`.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        _ => actual == expected,
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(v) => f.debug_tuple("Equals").field(v).finish(),
            Self::Pattern(r) => f.debug_tuple("Pattern").field(&r.as_str()).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<Value> for Condition {
    fn from(value: Value) -> Self {
        Self::Equals(value)
    }
}

impl From<Regex> for Condition {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

/// A set of field conditions.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    fields: HashMap<String, Condition>,
}

impl Conditions {
    /// Creates an empty set, which matches every input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition for `field`, replacing any earlier one.
    pub fn with(mut self, field: impl Into<String>, condition: impl Into<Condition>) -> Self {
        self.fields.insert(field.into(), condition.into());
        self
    }

    /// Requires `field` to equal `value`.
    pub fn equals(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Condition::Equals(value.into()))
    }

    /// Requires `field` to match `regex`.
    pub fn pattern(self, field: impl Into<String>, regex: Regex) -> Self {
        self.with(field, Condition::Pattern(regex))
    }

    /// Requires `predicate` to accept `field`.
    pub fn test<F>(self, field: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.with(field, Condition::Predicate(Arc::new(predicate)))
    }

    /// Returns the condition registered for `field`.
    pub fn get(&self, field: &str) -> Option<&Condition> {
        self.fields.get(field)
    }

    /// Returns the number of conditions.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns whether every condition passes for `input`.
    pub fn matches(&self, input: &Input) -> bool {
        self.fields
            .iter()
            .all(|(field, condition)| condition.check(input.get(field)))
    }
}

impl From<Map<String, Value>> for Conditions {
    /// Builds equality conditions from a JSON object.
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter()
            .map(|(field, value)| (field, Condition::Equals(value)))
            .collect()
    }
}

impl<K: Into<String>, C: Into<Condition>> FromIterator<(K, C)> for Conditions {
    fn from_iter<I: IntoIterator<Item = (K, C)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, c)| (k.into(), c.into()))
                .collect(),
        }
    }
}
