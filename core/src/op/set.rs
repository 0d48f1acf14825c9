//! Set: replace a field's value

use super::FieldOperation;
use crate::encode::{Encodable, Encoder};
use crate::error::Result;
use crate::value::Value;
use serde_json::Value as JsonValue;

/// Replace the field with a new value, ignoring whatever was there
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    value: Value,
}

impl SetOperation {
    /// Set the field to `value`
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// The value the field is set to
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The set value, whatever the prior
    pub fn apply(&self) -> Value {
        self.value.clone()
    }

    /// A later Set wins over anything queued before it
    pub fn merge_with_previous(self, _previous: Option<&FieldOperation>) -> FieldOperation {
        FieldOperation::Set(self)
    }
}

/// A direct set is sent as the bare encoded value, without an `__op` envelope.
impl Encodable for SetOperation {
    fn encode_with(&self, encoder: &dyn Encoder) -> Result<JsonValue> {
        encoder.encode(&self.value, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_encodes_bare_value() {
        let op = SetOperation::new(vec!["a", "b"]);
        assert_eq!(op.encode().unwrap(), json!(["a", "b"]));
    }

    #[test]
    fn test_set_ignores_prior() {
        let op = FieldOperation::set("new");
        let prior = Value::from("old");
        assert_eq!(op.apply(Some(&prior), "title").unwrap(), Some(Value::from("new")));
        assert_eq!(op.apply(None, "title").unwrap(), Some(Value::from("new")));
    }
}
