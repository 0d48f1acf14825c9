//! AddUnique: append values not already present

use super::{element_matches, encode_objects, objects_from, FieldOperation, SetOperation};
use crate::encode::{Encodable, Encoder};
use crate::error::{Result, SyncError};
use crate::value::Value;
use serde_json::Value as JsonValue;

/// Append each value that the array does not already contain
///
/// A reference counts as present if the same instance is there, or a saved
/// reference to the same entity without local edits. Other values compare
/// strictly.
#[derive(Debug, Clone, PartialEq)]
pub struct AddUniqueOperation {
    objects: Vec<Value>,
}

impl AddUniqueOperation {
    /// Fails with a type mismatch unless `objects` is an array
    pub fn new(objects: impl Into<Value>) -> Result<Self> {
        Ok(Self::from_values(objects_from("AddUnique", objects.into())?))
    }

    /// Build from already validated elements
    pub fn from_values(objects: Vec<Value>) -> Self {
        Self { objects }
    }

    /// Candidate values to append
    pub fn objects(&self) -> &[Value] {
        &self.objects
    }

    /// Prior array plus each candidate it does not already contain
    pub fn apply(&self, prior: Option<&Value>) -> Result<Value> {
        let base = match prior {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(other) => vec![other.clone()],
        };
        Ok(Value::Array(unique_extend(base, &self.objects)))
    }

    /// Union with a queued AddUnique, or fold into a queued Set or Delete
    pub fn merge_with_previous(self, previous: Option<&FieldOperation>) -> Result<FieldOperation> {
        match previous {
            None => Ok(FieldOperation::AddUnique(self)),
            Some(FieldOperation::Delete(_)) => {
                let value = self.apply(None)?;
                Ok(FieldOperation::Set(SetOperation::new(value)))
            }
            Some(FieldOperation::Set(set)) => {
                let value = self.apply(Some(set.value()))?;
                Ok(FieldOperation::Set(SetOperation::new(value)))
            }
            Some(FieldOperation::AddUnique(prev)) => Ok(FieldOperation::AddUnique(
                AddUniqueOperation::from_values(unique_extend(prev.objects.clone(), &self.objects)),
            )),
            Some(other) => Err(SyncError::invalid_sequence(other.kind(), "AddUnique")),
        }
    }
}

fn unique_extend(mut items: Vec<Value>, additions: &[Value]) -> Vec<Value> {
    for addition in additions {
        let present = items
            .iter()
            .any(|item| item == addition || element_matches(item, addition));
        if !present {
            items.push(addition.clone());
        }
    }
    items
}

impl Encodable for AddUniqueOperation {
    fn encode_with(&self, encoder: &dyn Encoder) -> Result<JsonValue> {
        encode_objects("AddUnique", &self.objects, encoder)
    }
}
