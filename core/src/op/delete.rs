//! Delete: remove a field

use super::FieldOperation;
use crate::encode::{Encodable, Encoder};
use crate::error::Result;
use serde_json::{json, Value as JsonValue};

/// Remove the field from the object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOperation;

impl DeleteOperation {
    /// Deleting supersedes anything queued before it
    pub fn merge_with_previous(self, _previous: Option<&FieldOperation>) -> FieldOperation {
        FieldOperation::Delete(self)
    }
}

impl Encodable for DeleteOperation {
    fn encode_with(&self, _encoder: &dyn Encoder) -> Result<JsonValue> {
        Ok(json!({"__op": "Delete"}))
    }
}
