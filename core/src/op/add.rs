//! Add: append values to an array field

use super::{encode_objects, objects_from, FieldOperation, SetOperation};
use crate::encode::{Encodable, Encoder};
use crate::error::{Result, SyncError};
use crate::value::Value;
use serde_json::Value as JsonValue;

/// Append values to an array field, keeping duplicates
#[derive(Debug, Clone, PartialEq)]
pub struct AddOperation {
    objects: Vec<Value>,
}

impl AddOperation {
    /// Fails with a type mismatch unless `objects` is an array
    pub fn new(objects: impl Into<Value>) -> Result<Self> {
        Ok(Self::from_values(objects_from("Add", objects.into())?))
    }

    /// Build from already validated elements
    pub fn from_values(objects: Vec<Value>) -> Self {
        Self { objects }
    }

    /// Values to append
    pub fn objects(&self) -> &[Value] {
        &self.objects
    }

    /// Prior array with the values appended; absent or null counts as empty
    pub fn apply(&self, prior: Option<&Value>) -> Result<Value> {
        match prior {
            None | Some(Value::Null) => Ok(Value::Array(self.objects.clone())),
            Some(Value::Array(items)) => {
                let mut merged = Vec::with_capacity(items.len() + self.objects.len());
                merged.extend_from_slice(items);
                merged.extend_from_slice(&self.objects);
                Ok(Value::Array(merged))
            }
            Some(other) => Err(SyncError::type_mismatch("Add", "an array", other.kind())),
        }
    }

    /// Concatenate with a queued Add, or fold into a queued Set or Delete
    pub fn merge_with_previous(self, previous: Option<&FieldOperation>) -> Result<FieldOperation> {
        match previous {
            None => Ok(FieldOperation::Add(self)),
            Some(FieldOperation::Delete(_)) => {
                Ok(FieldOperation::Set(SetOperation::new(Value::Array(self.objects))))
            }
            Some(FieldOperation::Set(set)) => {
                let value = self.apply(Some(set.value()))?;
                Ok(FieldOperation::Set(SetOperation::new(value)))
            }
            Some(FieldOperation::Add(prev)) => {
                let mut objects = prev.objects.clone();
                objects.extend(self.objects);
                Ok(FieldOperation::Add(AddOperation::from_values(objects)))
            }
            Some(other) => Err(SyncError::invalid_sequence(other.kind(), "Add")),
        }
    }
}

impl Encodable for AddOperation {
    fn encode_with(&self, encoder: &dyn Encoder) -> Result<JsonValue> {
        encode_objects("Add", &self.objects, encoder)
    }
}
