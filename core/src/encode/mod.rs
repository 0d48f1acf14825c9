//! Wire encoding
//!
//! Operations never walk nested values themselves. They hand every embedded
//! value to an injected [`Encoder`], which renders it as wire JSON. The
//! default [`WireEncoder`] emits the remote service's typed envelopes:
//!
//! - object references: `{"__type": "Pointer", "className": .., "objectId": ..}`
//! - byte blobs: `{"__type": "Bytes", "base64": ..}`
//! - dates: `{"__type": "Date", "iso": "2024-01-02T03:04:05.000Z"}`
//! - relation markers: `{"__type": "Relation", "className": ..}`
//!
//! Maps are emitted with sorted keys, so encoding is deterministic.

mod decode;

pub use decode::decode_value;

use crate::error::{Result, SyncError};
use crate::value::{Number, ObjectRef, Value};
use base64::Engine;
use serde_json::{json, Map, Value as JsonValue};

/// Anything that can render itself as wire JSON
pub trait Encodable {
    /// Encode using the given encoder for nested values
    fn encode_with(&self, encoder: &dyn Encoder) -> Result<JsonValue>;

    /// Encode using the default [`WireEncoder`]
    fn encode(&self) -> Result<JsonValue> {
        self.encode_with(&WireEncoder)
    }
}

/// Recursive value encoder supplied by the surrounding system
pub trait Encoder {
    /// Encode `value`.
    ///
    /// When `allow_pointer_for_saved` is false, object references are
    /// rejected instead of being rendered as pointers.
    fn encode(&self, value: &Value, allow_pointer_for_saved: bool) -> Result<JsonValue>;
}

/// Keys that mark a JSON object as an operation or typed envelope
const RESERVED_KEYS: [&str; 2] = ["__op", "__type"];

/// Default encoder producing the remote service's wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct WireEncoder;

impl Encoder for WireEncoder {
    fn encode(&self, value: &Value, allow_pointer_for_saved: bool) -> Result<JsonValue> {
        let json = match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => encode_number(*n)?,
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.encode(item, allow_pointer_for_saved))
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Map(fields) => {
                let mut map = Map::new();
                for (key, field) in fields {
                    if RESERVED_KEYS.contains(&key.as_str()) {
                        return Err(SyncError::ReservedKey(key.clone()));
                    }
                    map.insert(key.clone(), self.encode(field, allow_pointer_for_saved)?);
                }
                JsonValue::Object(map)
            }
            Value::Bytes(bytes) => {
                let engine = base64::engine::general_purpose::STANDARD;
                json!({"__type": "Bytes", "base64": engine.encode(bytes)})
            }
            #[cfg(feature = "datetime")]
            Value::Date(date) => json!({
                "__type": "Date",
                "iso": date.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            }),
            Value::Object(object) => {
                if !allow_pointer_for_saved {
                    return Err(SyncError::ReferenceNotAllowed);
                }
                encode_pointer(object)?
            }
            Value::Relation(relation) => {
                json!({"__type": "Relation", "className": relation.target_class})
            }
        };
        Ok(json)
    }
}

/// Pointer form of a saved object reference
pub fn encode_pointer(object: &ObjectRef) -> Result<JsonValue> {
    match object.remote_id() {
        Some(id) => Ok(json!({
            "__type": "Pointer",
            "className": object.class_name(),
            "objectId": id,
        })),
        None => Err(SyncError::UnsavedReference {
            class_name: object.class_name(),
        }),
    }
}

fn encode_number(number: Number) -> Result<JsonValue> {
    match number {
        Number::Int(i) => Ok(JsonValue::from(i)),
        Number::Float(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .ok_or(SyncError::NonFiniteNumber(f)),
    }
}

impl Encodable for ObjectRef {
    fn encode_with(&self, _encoder: &dyn Encoder) -> Result<JsonValue> {
        encode_pointer(self)
    }
}

impl Encodable for Value {
    fn encode_with(&self, encoder: &dyn Encoder) -> Result<JsonValue> {
        encoder.encode(self, true)
    }
}
