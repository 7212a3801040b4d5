use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{AutocompleteError, Result};

/// An opaque structured record offered as a suggestion.
///
/// Only the configured `key` and `value` fields, plus whatever paths the
/// template references, mean anything to the engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build an item from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(AutocompleteError::configuration(format!(
                "items must be objects, got {other}"
            ))),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Identity value stored under `field`, if it is a number or a string.
    pub fn key(&self, field: &str) -> Option<ItemKey> {
        self.0.get(field).and_then(ItemKey::from_value)
    }

    /// Like [`Item::key`], but a missing identity is an error.
    pub fn require_key(&self, field: &str) -> Result<ItemKey> {
        self.key(field).ok_or_else(|| AutocompleteError::MissingKey {
            key: field.to_string(),
        })
    }

    /// Resolve a dot-separated path (`user.address.city`) field by field.
    ///
    /// Array elements are addressed by numeric segments (`tags.0`).
    pub fn resolve_path(&self, path: &str) -> Result<&Value> {
        let mut segments = path.split('.');
        let first = segments.next().unwrap_or_default();
        let mut current = self.0.get(first).ok_or_else(|| AutocompleteError::FieldResolution {
            segment: first.to_string(),
            object: Value::Object(self.0.clone()).to_string(),
        })?;

        for segment in segments {
            let next = match current {
                Value::Object(fields) => fields.get(segment),
                Value::Array(elements) => segment.parse::<usize>().ok().and_then(|i| elements.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| AutocompleteError::FieldResolution {
                segment: segment.to_string(),
                object: current.to_string(),
            })?;
        }
        Ok(current)
    }

    /// Whole-record text used by local filtering.
    pub fn search_text(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Display text of the `value` field, empty when it is absent.
    pub fn display_value(&self, field: &str) -> String {
        self.0.get(field).map(display_text).unwrap_or_default()
    }
}

impl From<Map<String, Value>> for Item {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Item {
    type Error = AutocompleteError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// Text a field value contributes to rendered output.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Scalar identity of an item: the value found under the configured `key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemKey {
    Number(Number),
    Text(String),
}

impl ItemKey {
    /// Only numbers and strings are legal identities.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Number(n) => Value::Number(n.clone()),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemKey {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for ItemKey {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<&str> for ItemKey {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ItemKey {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
