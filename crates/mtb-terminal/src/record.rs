//! Free-form terminal records.
//!
//! Order results, positions and deals have no schema the bridge can rely on:
//! field sets differ between terminal builds and brokers. Records are kept as
//! an ordered field map when the terminal hands back something structured,
//! and as an opaque string dump otherwise. Nothing is dropped.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq)]
pub enum TerminalRecord {
    /// Field name -> value, in the order the terminal reported them.
    Fields(Map<String, Value>),
    /// Structured decoding failed; textual dump of what the terminal sent.
    Raw(String),
}

impl TerminalRecord {
    /// Build a structured record from `(field, value)` pairs, keeping order.
    pub fn from_fields<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        TerminalRecord::Fields(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Objects become `Fields`; anything else is dumped to a string.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => TerminalRecord::Fields(map),
            Value::String(s) => TerminalRecord::Raw(s),
            other => TerminalRecord::Raw(other.to_string()),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            TerminalRecord::Fields(map) => map.get(field),
            TerminalRecord::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, TerminalRecord::Raw(_))
    }

    /// List-item rendering: the field map, or the bare dump string.
    pub fn into_json(self) -> Value {
        match self {
            TerminalRecord::Fields(map) => Value::Object(map),
            TerminalRecord::Raw(s) => Value::String(s),
        }
    }

    /// Single-result rendering: the field map, or `{"raw": dump}` so the
    /// payload is always an object.
    pub fn into_object_json(self) -> Value {
        match self {
            TerminalRecord::Fields(map) => Value::Object(map),
            TerminalRecord::Raw(s) => {
                let mut map = Map::new();
                map.insert("raw".to_string(), Value::String(s));
                Value::Object(map)
            }
        }
    }
}

impl Serialize for TerminalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TerminalRecord::Fields(map) => map.serialize(serializer),
            TerminalRecord::Raw(s) => serializer.serialize_str(s),
        }
    }
}
