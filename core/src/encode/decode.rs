//! Wire JSON back into field values

use crate::error::{Result, SyncError};
use crate::value::{Number, ObjectRef, RelationValue, Value};
use base64::Engine;
use serde_json::{Map, Value as JsonValue};

/// Decode a wire value, interpreting `__type` envelopes.
///
/// Pointers decode to detached references that carry no local edits.
pub fn decode_value(json: &JsonValue) -> Result<Value> {
    match json {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Bool(*b)),
        JsonValue::Number(n) => Ok(match n.as_i64() {
            Some(i) => Value::Number(Number::Int(i)),
            None => Value::Number(Number::Float(n.as_f64().unwrap_or(0.0))),
        }),
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        JsonValue::Array(items) => Ok(Value::Array(
            items.iter().map(decode_value).collect::<Result<Vec<_>>>()?,
        )),
        JsonValue::Object(fields) => decode_object(fields),
    }
}

fn decode_object(fields: &Map<String, JsonValue>) -> Result<Value> {
    if fields.contains_key("__op") {
        return Err(SyncError::protocol("operation found where a value was expected"));
    }

    let Some(kind) = fields.get("__type").and_then(JsonValue::as_str) else {
        let mut map = std::collections::BTreeMap::new();
        for (key, field) in fields {
            map.insert(key.clone(), decode_value(field)?);
        }
        return Ok(Value::Map(map));
    };

    match kind {
        "Pointer" => {
            let class_name = str_field(fields, "className")?;
            let object_id = str_field(fields, "objectId")?;
            Ok(Value::Object(ObjectRef::pointer(class_name, object_id)))
        }
        "Bytes" => {
            let engine = base64::engine::general_purpose::STANDARD;
            let bytes = engine
                .decode(str_field(fields, "base64")?)
                .map_err(|e| SyncError::protocol(format!("invalid base64: {}", e)))?;
            Ok(Value::Bytes(bytes))
        }
        "Relation" => Ok(Value::Relation(RelationValue {
            target_class: str_field(fields, "className")?.to_string(),
        })),
        #[cfg(feature = "datetime")]
        "Date" => {
            let iso = str_field(fields, "iso")?;
            let date = chrono::DateTime::parse_from_rfc3339(iso)
                .map_err(|e| SyncError::protocol(format!("invalid date {}: {}", iso, e)))?;
            Ok(Value::Date(date.with_timezone(&chrono::Utc)))
        }
        other => Err(SyncError::protocol(format!("unsupported __type {}", other))),
    }
}

pub(crate) fn str_field<'a>(fields: &'a Map<String, JsonValue>, key: &str) -> Result<&'a str> {
    fields
        .get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| SyncError::protocol(format!("missing string field {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_plain() {
        let value = decode_value(&json!([1, 2.5, "x", null, true])).unwrap();
        assert_eq!(
            value,
            Value::Array(vec![
                Value::from(1),
                Value::from(2.5),
                Value::from("x"),
                Value::Null,
                Value::Bool(true),
            ])
        );
    }

    #[test]
    fn test_decode_pointer() {
        let value = decode_value(&json!({
            "__type": "Pointer",
            "className": "Post",
            "objectId": "abc123",
        }))
        .unwrap();

        let object = value.as_object().unwrap();
        assert_eq!(object.class_name(), "Post");
        assert_eq!(object.remote_id().as_deref(), Some("abc123"));
        assert!(!object.has_pending_local_edits());
    }

    #[test]
    fn test_decode_bytes() {
        let value = decode_value(&json!({"__type": "Bytes", "base64": "aGk="})).unwrap();
        assert_eq!(value, Value::Bytes(b"hi".to_vec()));
    }

    #[test]
    #[cfg(feature = "datetime")]
    fn test_decode_date() {
        let value = decode_value(&json!({"__type": "Date", "iso": "2024-01-02T03:04:05.000Z"})).unwrap();
        assert_eq!(value.kind(), "date");
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(decode_value(&json!({"__type": "Pointer", "className": "Post"})).is_err());
        assert!(decode_value(&json!({"__type": "GeoPoint"})).is_err());
        assert!(decode_value(&json!({"__op": "Delete"})).is_err());
    }
}
