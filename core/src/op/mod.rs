//! Field operations
//!
//! A field operation is a pending transformation of one field of a remote
//! object. Every kind supports three things:
//!
//! - **encode:** render itself as the wire update for that field
//! - **apply:** compute the field's new value from its prior value
//! - **merge:** collapse itself with the operation already queued for the
//!   field, so the queue never holds more than one operation per field
//!
//! Merging is observationally equivalent to applying the two operations in
//! sequence. Pairs that cannot be composed (removing from a field queued as
//! an increment, for example) are rejected with
//! [`SyncError::InvalidOperationSequence`].
//!
//! # Example
//!
//! ```
//! use fieldsync_core::op::FieldOperation;
//! use fieldsync_core::Value;
//!
//! let first = FieldOperation::increment(1);
//! let merged = FieldOperation::increment(1)
//!     .merge_with_previous(Some(&first))
//!     .unwrap();
//!
//! assert_eq!(merged, FieldOperation::increment(2));
//! assert_eq!(merged.apply(Some(&Value::from(1)), "count").unwrap(), Some(Value::from(3)));
//! ```

pub mod add;
pub mod add_unique;
pub mod delete;
pub mod increment;
pub mod relation;
pub mod remove;
pub mod set;

pub use add::AddOperation;
pub use add_unique::AddUniqueOperation;
pub use delete::DeleteOperation;
pub use increment::IncrementOperation;
pub use relation::RelationOperation;
pub use remove::RemoveOperation;
pub use set::SetOperation;

use crate::encode::{decode_value, Encodable, Encoder};
use crate::error::{Result, SyncError};
use crate::value::{Number, ObjectRef, Value};
use serde_json::{Map, Value as JsonValue};

/// A pending field operation
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOperation {
    Set(SetOperation),
    Delete(DeleteOperation),
    Increment(IncrementOperation),
    Add(AddOperation),
    AddUnique(AddUniqueOperation),
    Remove(RemoveOperation),
    Relation(RelationOperation),
}

impl FieldOperation {
    /// Replace the field with `value`
    pub fn set(value: impl Into<Value>) -> Self {
        FieldOperation::Set(SetOperation::new(value))
    }

    /// Remove the field
    pub fn delete() -> Self {
        FieldOperation::Delete(DeleteOperation)
    }

    /// Add `amount` to a numeric field
    pub fn increment(amount: impl Into<Number>) -> Self {
        FieldOperation::Increment(IncrementOperation::new(amount))
    }

    /// Append to an array field. `objects` must be an array.
    pub fn add(objects: impl Into<Value>) -> Result<Self> {
        AddOperation::new(objects).map(FieldOperation::Add)
    }

    /// Append to an array field, skipping values already present.
    /// `objects` must be an array.
    pub fn add_unique(objects: impl Into<Value>) -> Result<Self> {
        AddUniqueOperation::new(objects).map(FieldOperation::AddUnique)
    }

    /// Remove values from an array field. `objects` must be an array.
    pub fn remove(objects: impl Into<Value>) -> Result<Self> {
        RemoveOperation::new(objects).map(FieldOperation::Remove)
    }

    /// Add saved objects to a relation field
    pub fn add_relation(objects: Vec<ObjectRef>) -> Result<Self> {
        RelationOperation::new(objects, Vec::new()).map(FieldOperation::Relation)
    }

    /// Remove saved objects from a relation field
    pub fn remove_relation(objects: Vec<ObjectRef>) -> Result<Self> {
        RelationOperation::new(Vec::new(), objects).map(FieldOperation::Relation)
    }

    /// Operation kind as named on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            FieldOperation::Set(_) => "Set",
            FieldOperation::Delete(_) => "Delete",
            FieldOperation::Increment(_) => "Increment",
            FieldOperation::Add(_) => "Add",
            FieldOperation::AddUnique(_) => "AddUnique",
            FieldOperation::Remove(_) => "Remove",
            FieldOperation::Relation(_) => "Relation",
        }
    }

    /// Compute the field value after this operation.
    ///
    /// `prior` is the value before the operation, `None` when the field is
    /// absent. A `None` result means the field is absent afterwards.
    pub fn apply(&self, prior: Option<&Value>, key: &str) -> Result<Option<Value>> {
        match self {
            FieldOperation::Set(op) => Ok(Some(op.apply())),
            FieldOperation::Delete(_) => Ok(None),
            FieldOperation::Increment(op) => op.apply(prior).map(Some),
            FieldOperation::Add(op) => op.apply(prior).map(Some),
            FieldOperation::AddUnique(op) => op.apply(prior).map(Some),
            FieldOperation::Remove(op) => op.apply(prior).map(Some),
            FieldOperation::Relation(op) => op.apply(prior, key).map(Some),
        }
    }

    /// Collapse this operation with the one queued before it.
    ///
    /// The result replaces `previous` in the queue. `previous` itself is left
    /// untouched, so a rejected merge leaves the queue as it was.
    pub fn merge_with_previous(self, previous: Option<&FieldOperation>) -> Result<FieldOperation> {
        match self {
            FieldOperation::Set(op) => Ok(op.merge_with_previous(previous)),
            FieldOperation::Delete(op) => Ok(op.merge_with_previous(previous)),
            FieldOperation::Increment(op) => op.merge_with_previous(previous),
            FieldOperation::Add(op) => op.merge_with_previous(previous),
            FieldOperation::AddUnique(op) => op.merge_with_previous(previous),
            FieldOperation::Remove(op) => op.merge_with_previous(previous),
            FieldOperation::Relation(op) => op.merge_with_previous(previous),
        }
    }

    /// Parse an encoded operation.
    ///
    /// JSON without an `__op` key is a direct field set. A `Batch` of
    /// operations is folded into one by merging in order.
    pub fn from_wire(json: &JsonValue) -> Result<FieldOperation> {
        let Some(fields) = json.as_object().filter(|fields| fields.contains_key("__op")) else {
            return Ok(FieldOperation::Set(SetOperation::new(decode_value(json)?)));
        };

        let op = fields
            .get("__op")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| SyncError::protocol("__op must be a string"))?;

        match op {
            "Delete" => Ok(FieldOperation::delete()),
            "Set" => {
                let value = fields.get("value").unwrap_or(&JsonValue::Null);
                Ok(FieldOperation::Set(SetOperation::new(decode_value(value)?)))
            }
            "Increment" => {
                let amount = match fields.get("amount") {
                    Some(JsonValue::Number(n)) => match n.as_i64() {
                        Some(i) => Number::Int(i),
                        None => Number::Float(n.as_f64().unwrap_or(0.0)),
                    },
                    _ => return Err(SyncError::protocol("Increment requires a numeric amount")),
                };
                Ok(FieldOperation::increment(amount))
            }
            "Add" => Ok(FieldOperation::Add(AddOperation::from_values(wire_objects(fields)?))),
            "AddUnique" => Ok(FieldOperation::AddUnique(AddUniqueOperation::from_values(
                wire_objects(fields)?,
            ))),
            "Remove" => Ok(FieldOperation::Remove(RemoveOperation::from_values(
                wire_objects(fields)?,
            ))),
            "AddRelation" => FieldOperation::add_relation(wire_references(fields)?),
            "RemoveRelation" => FieldOperation::remove_relation(wire_references(fields)?),
            "Batch" => {
                let ops = fields
                    .get("ops")
                    .and_then(JsonValue::as_array)
                    .ok_or_else(|| SyncError::protocol("Batch requires an ops array"))?;
                let mut merged: Option<FieldOperation> = None;
                for op in ops {
                    let next = FieldOperation::from_wire(op)?;
                    merged = Some(next.merge_with_previous(merged.as_ref())?);
                }
                merged.ok_or_else(|| SyncError::protocol("Batch requires at least one op"))
            }
            other => Err(SyncError::protocol(format!("unknown operation {}", other))),
        }
    }
}

impl Encodable for FieldOperation {
    fn encode_with(&self, encoder: &dyn Encoder) -> Result<JsonValue> {
        match self {
            FieldOperation::Set(op) => op.encode_with(encoder),
            FieldOperation::Delete(op) => op.encode_with(encoder),
            FieldOperation::Increment(op) => op.encode_with(encoder),
            FieldOperation::Add(op) => op.encode_with(encoder),
            FieldOperation::AddUnique(op) => op.encode_with(encoder),
            FieldOperation::Remove(op) => op.encode_with(encoder),
            FieldOperation::Relation(op) => op.encode_with(encoder),
        }
    }
}

/// Unwrap the collection argument of Add, AddUnique and Remove
pub(crate) fn objects_from(operation: &'static str, objects: Value) -> Result<Vec<Value>> {
    match objects {
        Value::Array(items) => Ok(items),
        other => Err(SyncError::type_mismatch(operation, "an array", other.kind())),
    }
}

/// `{"__op": op, "objects": [...]}` with every element run through the encoder
pub(crate) fn encode_objects(op: &str, objects: &[Value], encoder: &dyn Encoder) -> Result<JsonValue> {
    let encoded = objects
        .iter()
        .map(|object| encoder.encode(object, true))
        .collect::<Result<Vec<_>>>()?;

    let mut map = Map::new();
    map.insert("__op".to_string(), JsonValue::from(op));
    map.insert("objects".to_string(), JsonValue::Array(encoded));
    Ok(JsonValue::Object(map))
}

/// Whether `stored`, an element already in the field, matches `target`.
///
/// References match when the stored one has no local edits and both carry
/// the same class and server id. Everything else uses strict equality.
pub(crate) fn element_matches(stored: &Value, target: &Value) -> bool {
    match (stored, target) {
        (Value::Object(stored), Value::Object(target)) => stored.matches_saved(target),
        (Value::Object(_), _) => false,
        _ => stored == target,
    }
}

fn wire_objects(fields: &Map<String, JsonValue>) -> Result<Vec<Value>> {
    let objects = fields
        .get("objects")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| SyncError::protocol("operation requires an objects array"))?;
    objects.iter().map(decode_value).collect()
}

fn wire_references(fields: &Map<String, JsonValue>) -> Result<Vec<ObjectRef>> {
    wire_objects(fields)?
        .into_iter()
        .map(|value| match value {
            Value::Object(object) => Ok(object),
            other => Err(SyncError::protocol(format!(
                "relation objects must be pointers, found {}",
                other.kind()
            ))),
        })
        .collect()
}
