//! Credential metadata assembly.
//!
//! The metadata object written to the registry starts from whatever
//! `metadata` the event carried and is then topped up field by field. A
//! field already present is never overwritten, so issuer-supplied metadata
//! always wins over values the bridge derives.

use serde_json::{Map, Value};

/// Builder for a first-writer-wins metadata object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataBuilder {
    fields: Map<String, Value>,
}

impl MetadataBuilder {
    /// Start from an event's raw `metadata` value.
    ///
    /// - absent, null, or blank: empty object
    /// - an object: its fields
    /// - a string holding a JSON object: the parsed fields
    /// - anything else: `{ "rawMetadata": <value> }`
    pub fn from_raw(raw: Option<&Value>) -> Self {
        let fields = match raw {
            None | Some(Value::Null) => Map::new(),
            Some(Value::String(s)) if s.trim().is_empty() => Map::new(),
            Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(parsed)) => parsed,
                _ => raw_metadata(Value::String(s.clone())),
            },
            Some(Value::Object(object)) => object.clone(),
            Some(other) => raw_metadata(other.clone()),
        };
        Self { fields }
    }

    /// Set `key` to `value` unless the key is already present or the value
    /// is null or a blank string.
    pub fn ensure(&mut self, key: &str, value: Option<&Value>) -> &mut Self {
        match value {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.trim().is_empty() => {}
            Some(value) => {
                self.fields
                    .entry(key.to_string())
                    .or_insert_with(|| value.clone());
            }
        }
        self
    }

    /// [`MetadataBuilder::ensure`] for string values.
    pub fn ensure_str(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        let value = value.map(|s| Value::String(s.to_string()));
        self.ensure(key, value.as_ref())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The assembled object.
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

fn raw_metadata(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("rawMetadata".into(), value);
    map
}
