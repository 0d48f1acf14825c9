//! Remote object documents
//!
//! A `Document` is the local copy of one remote object: the field values last
//! seen on the server plus a queue of unsent edits. Reads see the net effect
//! of both. Saving sends only the encoded edits.
//!
//! # Example
//!
//! ```
//! use fieldsync_core::{Document, Value, WireEncoder};
//!
//! let mut doc = Document::new("GameScore");
//! doc.increment("score", 1).unwrap();
//! doc.increment("score", 1).unwrap();
//! assert_eq!(doc.get("score").unwrap(), Some(Value::from(2)));
//!
//! let payload = doc.save_payload(&WireEncoder).unwrap();
//! assert_eq!(payload["score"], serde_json::json!({"__op": "Increment", "amount": 2}));
//!
//! // The service answered with an id
//! doc.handle_save_success(Some("xWMyZ4YEGZ".to_string())).unwrap();
//! assert!(!doc.is_dirty());
//! ```

use crate::encode::Encoder;
use crate::error::Result;
use crate::op::FieldOperation;
use crate::queue::OperationQueue;
use crate::value::{Number, ObjectRef, RemoteObject, Value};
use crate::{ClassName, FieldName, ObjectId};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Local copy of a remote object
#[derive(Debug, Clone)]
pub struct Document {
    class_name: ClassName,
    object_id: Option<ObjectId>,
    /// Identifies the document locally before the server assigns an id
    local_id: Uuid,
    server_data: BTreeMap<FieldName, Value>,
    pending: OperationQueue,
}

impl Document {
    /// Create a new, unsaved document
    pub fn new(class_name: impl Into<ClassName>) -> Self {
        Self {
            class_name: class_name.into(),
            object_id: None,
            local_id: Uuid::new_v4(),
            server_data: BTreeMap::new(),
            pending: OperationQueue::new(),
        }
    }

    /// Create a document from state fetched from the server
    pub fn from_server(
        class_name: impl Into<ClassName>,
        object_id: impl Into<ObjectId>,
        data: BTreeMap<FieldName, Value>,
    ) -> Self {
        Self {
            object_id: Some(object_id.into()),
            server_data: data,
            ..Self::new(class_name)
        }
    }

    /// Remote class this document belongs to
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Server-assigned id, `None` until saved
    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    /// Process-local identity, stable across saves
    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    /// Effective value of `key`: the server value with any pending edit applied
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.pending.effective_value(key, self.server_data.get(key))
    }

    /// Last value of `key` known to the server
    pub fn server_value(&self, key: &str) -> Option<&Value> {
        self.server_data.get(key)
    }

    /// Effective values of every field
    pub fn snapshot(&self) -> Result<BTreeMap<FieldName, Value>> {
        let mut fields = self.server_data.clone();
        for (key, op) in self.pending.iter() {
            match op.apply(self.server_data.get(key), key)? {
                Some(value) => {
                    fields.insert(key.clone(), value);
                }
                None => {
                    fields.remove(key);
                }
            }
        }
        Ok(fields)
    }

    /// Queue `op` against `key`, merging with any pending edit.
    ///
    /// `op` is first applied to the current effective value, so an edit that
    /// cannot apply (incrementing a string, adding to a scalar) is rejected
    /// here rather than at read or save time. On error the pending edit for
    /// `key` is unchanged.
    pub fn perform(&mut self, key: &str, op: FieldOperation) -> Result<()> {
        let current = self.get(key)?;
        if let Err(e) = op.apply(current.as_ref(), key) {
            tracing::warn!(key, op = op.kind(), error = %e, "operation does not apply to current value");
            return Err(e);
        }
        self.pending.push(key, op)
    }

    /// Replace the value of `key`
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.perform(key, FieldOperation::set(value))
    }

    /// Delete `key` from the object
    pub fn unset(&mut self, key: &str) -> Result<()> {
        self.perform(key, FieldOperation::delete())
    }

    /// Add `amount` to the number in `key`; absent counts as zero
    pub fn increment(&mut self, key: &str, amount: impl Into<Number>) -> Result<()> {
        self.perform(key, FieldOperation::increment(amount))
    }

    /// Append `objects` (an array) to the array in `key`
    pub fn add(&mut self, key: &str, objects: impl Into<Value>) -> Result<()> {
        self.perform(key, FieldOperation::add(objects)?)
    }

    /// Append the members of `objects` (an array) missing from `key`
    pub fn add_unique(&mut self, key: &str, objects: impl Into<Value>) -> Result<()> {
        self.perform(key, FieldOperation::add_unique(objects)?)
    }

    /// Remove every member of `objects` (an array) from `key`
    pub fn remove(&mut self, key: &str, objects: impl Into<Value>) -> Result<()> {
        self.perform(key, FieldOperation::remove(objects)?)
    }

    /// Link saved `objects` into the relation in `key`
    pub fn add_relation(&mut self, key: &str, objects: Vec<ObjectRef>) -> Result<()> {
        self.perform(key, FieldOperation::add_relation(objects)?)
    }

    /// Unlink saved `objects` from the relation in `key`
    pub fn remove_relation(&mut self, key: &str, objects: Vec<ObjectRef>) -> Result<()> {
        self.perform(key, FieldOperation::remove_relation(objects)?)
    }

    /// Unsaved, or has pending edits
    pub fn is_dirty(&self) -> bool {
        self.object_id.is_none() || !self.pending.is_empty()
    }

    /// Fields with pending edits
    pub fn dirty_keys(&self) -> Vec<&FieldName> {
        self.pending.keys().collect()
    }

    /// Queue of unsent edits
    pub fn pending(&self) -> &OperationQueue {
        &self.pending
    }

    /// Encoded update for the pending edits.
    ///
    /// Encoding does not consume anything, so a failed save can be retried by
    /// building the payload again.
    pub fn save_payload(&self, encoder: &dyn Encoder) -> Result<Map<String, JsonValue>> {
        self.pending.encode(encoder)
    }

    /// Fold the pending edits into the server state after a successful save.
    ///
    /// `object_id` is the id assigned by the server on first save.
    pub fn handle_save_success(&mut self, object_id: Option<ObjectId>) -> Result<()> {
        self.pending.commit(&mut self.server_data)?;
        if let Some(id) = object_id {
            self.object_id = Some(id);
        }
        tracing::debug!(
            class = %self.class_name,
            object_id = ?self.object_id,
            local_id = %self.local_id,
            "document saved"
        );
        Ok(())
    }

    /// Discard every pending edit
    pub fn revert(&mut self) {
        self.pending.clear();
    }

    /// Discard the pending edit for `key`
    pub fn revert_field(&mut self, key: &str) {
        self.pending.remove(key);
    }
}

#[derive(Debug)]
struct SharedCell {
    class_name: ClassName,
    /// Server id as of the last released write lock
    object_id: RwLock<Option<ObjectId>>,
    /// Dirty state as of the last released write lock
    dirty: AtomicBool,
    document: RwLock<Document>,
}

impl SharedCell {
    fn publish(&self, document: &Document) {
        *self.object_id.write() = document.object_id.clone();
        self.dirty.store(document.is_dirty(), Ordering::Release);
    }
}

/// Thread-safe handle to a document that other documents can reference
///
/// Other documents see the id and dirty state published when the last write
/// lock was released. Edits made under a held [`SharedDocument::write`] guard
/// become visible to them when the guard drops, so encoding or matching a
/// reference never depends on whether someone is mid-edit.
#[derive(Debug, Clone)]
pub struct SharedDocument(Arc<SharedCell>);

impl SharedDocument {
    /// Wrap `document` for sharing
    pub fn new(document: Document) -> Self {
        SharedDocument(Arc::new(SharedCell {
            class_name: document.class_name.clone(),
            object_id: RwLock::new(document.object_id.clone()),
            dirty: AtomicBool::new(document.is_dirty()),
            document: RwLock::new(document),
        }))
    }

    /// Shared read access
    pub fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.0.document.read()
    }

    /// Exclusive write access; changes are published when the guard drops
    pub fn write(&self) -> SharedDocumentGuard<'_> {
        SharedDocumentGuard {
            cell: &self.0,
            document: self.0.document.write(),
        }
    }

    /// Reference to this document for use in field values
    pub fn to_ref(&self) -> ObjectRef {
        let cell: Arc<dyn RemoteObject> = self.0.clone();
        ObjectRef::from_arc(cell)
    }
}

/// Write guard returned by [`SharedDocument::write`]
pub struct SharedDocumentGuard<'a> {
    cell: &'a SharedCell,
    document: RwLockWriteGuard<'a, Document>,
}

impl Deref for SharedDocumentGuard<'_> {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

impl DerefMut for SharedDocumentGuard<'_> {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}

impl Drop for SharedDocumentGuard<'_> {
    fn drop(&mut self) {
        // Runs while the document lock is still held
        self.cell.publish(&self.document);
    }
}

impl RemoteObject for SharedCell {
    fn class_name(&self) -> String {
        self.class_name.clone()
    }

    fn remote_id(&self) -> Option<String> {
        self.object_id.read().clone()
    }

    fn has_pending_local_edits(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

impl From<&SharedDocument> for ObjectRef {
    fn from(document: &SharedDocument) -> Self {
        document.to_ref()
    }
}

impl From<&SharedDocument> for Value {
    fn from(document: &SharedDocument) -> Self {
        Value::Object(document.to_ref())
    }
}
