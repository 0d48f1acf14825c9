//! Pending operations, one per field
//!
//! Every new operation is merged into whatever is already queued for its
//! field, so at rest the queue holds at most one operation per field. A
//! rejected merge leaves the queue exactly as it was.

use crate::encode::{Encodable, Encoder};
use crate::error::Result;
use crate::op::FieldOperation;
use crate::value::Value;
use crate::FieldName;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// Pending field operations keyed by field name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationQueue {
    ops: BTreeMap<FieldName, FieldOperation>,
}

impl OperationQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `op` into the operation queued for `key`
    pub fn push(&mut self, key: &str, op: FieldOperation) -> Result<()> {
        let kind = op.kind();
        let previous = self.ops.get(key);
        let previous_kind = previous.map(FieldOperation::kind);

        match op.merge_with_previous(previous) {
            Ok(merged) => {
                tracing::debug!(
                    key,
                    op = kind,
                    previous = ?previous_kind,
                    merged = merged.kind(),
                    "queued field operation"
                );
                self.ops.insert(key.to_string(), merged);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(key, op = kind, previous = ?previous_kind, error = %e, "rejected field operation");
                Err(e)
            }
        }
    }

    /// Operation pending for `key`
    pub fn get(&self, key: &str) -> Option<&FieldOperation> {
        self.ops.get(key)
    }

    /// Value of `key` after its pending operation, given the server value
    pub fn effective_value(&self, key: &str, server: Option<&Value>) -> Result<Option<Value>> {
        match self.ops.get(key) {
            Some(op) => {
                tracing::trace!(key, op = op.kind(), "applying pending operation");
                op.apply(server, key)
            }
            None => Ok(server.cloned()),
        }
    }

    /// Fold every pending operation into `server` and clear the queue.
    ///
    /// Call after a successful save. All new values are computed before any
    /// is written, so an error leaves both `server` and the queue untouched.
    pub fn commit(&mut self, server: &mut BTreeMap<FieldName, Value>) -> Result<()> {
        let mut updates = Vec::with_capacity(self.ops.len());
        for (key, op) in &self.ops {
            updates.push((key.clone(), op.apply(server.get(key), key)?));
        }

        for (key, value) in updates {
            match value {
                Some(value) => {
                    server.insert(key, value);
                }
                None => {
                    server.remove(&key);
                }
            }
        }

        tracing::debug!(fields = self.ops.len(), "committed pending operations");
        self.ops.clear();
        Ok(())
    }

    /// Update payload: field name to encoded operation
    pub fn encode(&self, encoder: &dyn Encoder) -> Result<Map<String, JsonValue>> {
        let mut payload = Map::new();
        for (key, op) in &self.ops {
            payload.insert(key.clone(), op.encode_with(encoder)?);
        }
        Ok(payload)
    }

    /// Drop the pending operation for `key`
    pub fn remove(&mut self, key: &str) -> Option<FieldOperation> {
        self.ops.remove(key)
    }

    /// Drop every pending operation
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    /// Number of fields with a pending operation
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is pending
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Fields with a pending operation, in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &FieldName> {
        self.ops.keys()
    }

    /// Pending operations by field, in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &FieldOperation)> {
        self.ops.iter()
    }
}
