use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

/// The working data of a form session.
///
/// A JSON object addressed by dotted field paths; numeric segments index
/// into arrays, so `employers.2.name` reads the `name` of the third entry
/// of `employers`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DataSnapshot {
    values: Map<String, Value>,
}

impl DataSnapshot {
    /// Create an empty snapshot
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => Err(CoreError::SerializationError(format!(
                "data snapshot must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Borrow the top-level record
    #[inline]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Take ownership of the snapshot as a JSON value
    #[inline]
    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Read the value at a path; `None` is "undefined"
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.values.get(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Length of the array at `path`, 0 when absent or not an array
    pub fn array_len(&self, path: &str) -> usize {
        self.get(path).and_then(Value::as_array).map_or(0, Vec::len)
    }

    /// Write a value at a path, creating intermediate objects and arrays.
    ///
    /// Writing past the end of an array pads it with nulls.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), CoreError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(CoreError::UnknownField(path.to_string()));
        }

        let mut root = Value::Object(std::mem::take(&mut self.values));
        let result = set_in(&mut root, &segments, value, path);
        if let Value::Object(values) = root {
            self.values = values;
        }
        result
    }

    /// Remove the value at a path.
    ///
    /// Removing an array entry shifts every later entry down by one.
    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let (parent, last) = match path.rsplit_once('.') {
            Some((parent, last)) => (Some(parent), last),
            None => (None, path),
        };

        match parent {
            None => self.values.remove(last),
            Some(parent) => match self.get_mut(parent)? {
                Value::Object(map) => map.remove(last),
                Value::Array(items) => {
                    let index = last.parse::<usize>().ok()?;
                    (index < items.len()).then(|| items.remove(index))
                }
                _ => None,
            },
        }
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.values.get_mut(first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get_mut(segment)?,
                Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

fn set_in(node: &mut Value, segments: &[&str], value: Value, path: &str) -> Result<(), CoreError> {
    let Some((segment, rest)) = segments.split_first() else {
        *node = value;
        return Ok(());
    };

    if node.is_null() {
        *node = if segment.parse::<usize>().is_ok() {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        };
    }

    match node {
        Value::Object(map) => {
            let child = map.entry(segment.to_string()).or_insert(Value::Null);
            set_in(child, rest, value, path)
        }
        Value::Array(items) => {
            let index = segment
                .parse::<usize>()
                .map_err(|_| CoreError::UnknownField(path.to_string()))?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            set_in(&mut items[index], rest, value, path)
        }
        _ => Err(CoreError::UnknownField(path.to_string())),
    }
}

impl From<Map<String, Value>> for DataSnapshot {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_get_and_set() {
        let mut snapshot = DataSnapshot::new();
        snapshot.set("employers.1.name", json!("Acme")).unwrap();

        assert_eq!(
            snapshot.clone().into_value(),
            json!({ "employers": [null, { "name": "Acme" }] })
        );
        assert_eq!(snapshot.get("employers.1.name"), Some(&json!("Acme")));
        assert_eq!(snapshot.get("employers.0.name"), None);
        assert_eq!(snapshot.array_len("employers"), 2);
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut snapshot = DataSnapshot::from_value(json!({ "name": "Al" })).unwrap();
        assert!(matches!(
            snapshot.set("name.first", json!("A")),
            Err(CoreError::UnknownField(_))
        ));
        assert_eq!(snapshot.get("name"), Some(&json!("Al")));
    }

    #[test]
    fn test_remove_array_entry_shifts_later_entries() {
        let mut snapshot =
            DataSnapshot::from_value(json!({ "tags": ["a", "b", "c"] })).unwrap();

        assert_eq!(snapshot.remove("tags.0"), Some(json!("a")));
        assert_eq!(snapshot.get("tags.0"), Some(&json!("b")));
        assert_eq!(snapshot.get("tags.1"), Some(&json!("c")));
        assert_eq!(snapshot.remove("tags.5"), None);
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(DataSnapshot::from_value(json!([1, 2])).is_err());
    }
}
