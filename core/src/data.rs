//! Structured view over a JSON response body.
//!
//! Paths are dot separated; numeric segments index into arrays, so
//! `data.recipients.1.id` reaches the `id` of the second recipient.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A JSON object or array addressed by path.
///
/// Anything that is not an object or array (scalars, `null`, unparsable
/// input) becomes an empty object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Data {
    value: Value,
}

impl Data {
    pub fn new(value: Value) -> Self {
        match value {
            Value::Object(_) | Value::Array(_) => Self { value },
            _ => Self::empty(),
        }
    }

    pub fn empty() -> Self {
        Self {
            value: Value::Object(Map::new()),
        }
    }

    /// Parse `bytes` as JSON, degrading to an empty object on any failure.
    pub fn from_slice(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).map_or_else(|_| Self::empty(), Self::new)
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(&self.value, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        path.split('.').try_fold(&mut self.value, |node, segment| match node {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(move |i| items.get_mut(i)),
            _ => None,
        })
    }

    /// Value at `path` decoded into `T`; `None` when missing or mistyped.
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        self.get(path).and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn has(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Store `value` at `path`, creating intermediate objects as needed.
    ///
    /// Returns false when an array segment is not a valid index (an index
    /// equal to the length appends).
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> bool {
        let mut node = &mut self.value;
        for segment in path.split('.') {
            match child_mut(node, segment) {
                Some(next) => node = next,
                None => return false,
            }
        }
        *node = value.into();
        true
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let (parent, last) = match path.rsplit_once('.') {
            Some((parent, last)) => (self.get_mut(parent)?, last),
            None => (&mut self.value, path),
        };
        match parent {
            Value::Object(map) => map.remove(last),
            Value::Array(items) => {
                let index = last.parse::<usize>().ok()?;
                (index < items.len()).then(|| items.remove(index))
            }
            _ => None,
        }
    }

    /// True when the top level is an array.
    pub fn is_collection(&self) -> bool {
        self.value.is_array()
    }

    pub fn len(&self) -> usize {
        match &self.value {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `path` within each item of a collection.
    pub fn pluck(&self, path: &str) -> Vec<Value> {
        let Value::Array(items) = &self.value else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| Data::new(item.clone()).get(path).cloned())
            .collect()
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn to_json(&self) -> String {
        self.value.to_string()
    }
}

impl Default for Data {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for Data {
    fn from(value: Value) -> Self {
        Data::new(value)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

fn child_mut<'v>(node: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    if !(node.is_object() || node.is_array()) {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => Some(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = segment.parse::<usize>().ok()?;
            if index == items.len() {
                items.push(Value::Null);
            }
            items.get_mut(index)
        }
        _ => None,
    }
}
