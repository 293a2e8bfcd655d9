//! The input record threaded through a dispatch run.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the field holding extracted path parameters.
pub const PARAMS_FIELD: &str = "params";

/// A field-addressable input record.
///
/// The dispatcher only assumes a record of named JSON values; what the
/// fields mean (method, path, headers, ...) is up to the caller. Conditions
/// are evaluated against these fields and mounted middleware see an
/// adjusted copy with the path rewritten and `params` filled in.
///
/// ```rust
/// use waypost_core::Input;
///
/// let input = Input::new().with("path", "/users/42").with("method", "GET");
/// assert_eq!(input.get_str("method"), Some("GET"));
/// assert!(input.get("missing").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Input {
    fields: Map<String, Value>,
}

impl Input {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value` (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the value of `key` if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Sets `key` to `value`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    /// Returns whether `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Returns the path parameters extracted by the nearest mount path.
    pub fn params(&self) -> Option<&Map<String, Value>> {
        self.fields.get(PARAMS_FIELD).and_then(Value::as_object)
    }

    /// Returns one decoded path parameter.
    ///
    /// `None` both when the parameter is unknown and when it is an optional
    /// parameter that did not match.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params()
            .and_then(|params| params.get(name))
            .and_then(Value::as_str)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Consumes the record, returning the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for Input {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl TryFrom<Value> for Input {
    type Error = Value;

    /// Converts a JSON object; any other value is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(other),
        }
    }
}

impl From<Input> for Value {
    fn from(input: Input) -> Self {
        Value::Object(input.fields)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Input {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_object() {
        let input = Input::try_from(json!({"a": 1, "path": "/x"})).unwrap();
        assert_eq!(input.get("a"), Some(&json!(1)));
        assert_eq!(input.get_str("path"), Some("/x"));
        assert_eq!(input.len(), 2);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert_eq!(Input::try_from(json!([1, 2])), Err(json!([1, 2])));
    }

    #[test]
    fn test_params_accessors() {
        let input = Input::new().with(PARAMS_FIELD, json!({"name": "route", "opt": null}));
        assert_eq!(input.param("name"), Some("route"));
        assert_eq!(input.param("opt"), None);
        assert_eq!(input.params().unwrap().get("opt"), Some(&Value::Null));
    }

    #[test]
    fn test_serde_is_transparent() {
        let input: Input = [("a", 1)].into_iter().collect();
        assert_eq!(serde_json::to_value(&input).unwrap(), json!({"a": 1}));
    }
}
