//! Remove: drop values from an array field

use super::{element_matches, encode_objects, objects_from, FieldOperation, SetOperation};
use crate::encode::{Encodable, Encoder};
use crate::error::{Result, SyncError};
use crate::value::Value;
use serde_json::Value as JsonValue;

/// Remove every element matching one of `objects` from an array field
///
/// A non-array prior value is treated as a one-element array. References are
/// matched by server id, and only when the stored reference has no local
/// edits; other values must be strictly equal.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoveOperation {
    objects: Vec<Value>,
}

impl RemoveOperation {
    /// Fails with a type mismatch unless `objects` is an array
    pub fn new(objects: impl Into<Value>) -> Result<Self> {
        Ok(Self::from_values(objects_from("Remove", objects.into())?))
    }

    /// Build from already validated elements
    pub fn from_values(objects: Vec<Value>) -> Self {
        Self { objects }
    }

    /// Values to remove
    pub fn objects(&self) -> &[Value] {
        &self.objects
    }

    /// Prior array without the elements that match a target
    pub fn apply(&self, prior: Option<&Value>) -> Result<Value> {
        let items: &[Value] = match prior {
            None | Some(Value::Null) => &[],
            Some(Value::Array(items)) => items,
            Some(other) => std::slice::from_ref(other),
        };

        // Field arrays are small; a quadratic scan beats building an index
        let kept = items
            .iter()
            .filter(|item| !self.objects.iter().any(|target| element_matches(item, target)))
            .cloned()
            .collect();
        Ok(Value::Array(kept))
    }

    /// Concatenate with a queued Remove, or fold into a queued Set or Delete
    pub fn merge_with_previous(self, previous: Option<&FieldOperation>) -> Result<FieldOperation> {
        match previous {
            None => Ok(FieldOperation::Remove(self)),
            Some(delete @ FieldOperation::Delete(_)) => Ok(delete.clone()),
            Some(FieldOperation::Set(set)) => {
                let value = self.apply(Some(set.value()))?;
                Ok(FieldOperation::Set(SetOperation::new(value)))
            }
            Some(FieldOperation::Remove(prev)) => {
                let mut objects = prev.objects.clone();
                objects.extend(self.objects);
                Ok(FieldOperation::Remove(RemoveOperation::from_values(objects)))
            }
            Some(other) => Err(SyncError::invalid_sequence(other.kind(), "Remove")),
        }
    }
}

impl Encodable for RemoveOperation {
    fn encode_with(&self, encoder: &dyn Encoder) -> Result<JsonValue> {
        encode_objects("Remove", &self.objects, encoder)
    }
}
