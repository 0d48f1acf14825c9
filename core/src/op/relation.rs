//! Relation edits
//!
//! A relation field links an object to any number of saved objects of one
//! class. The links live on the server, so locally a relation edit only
//! records which objects to link and unlink. Consecutive edits merge: a later
//! add cancels an earlier remove of the same object and vice versa.
//!
//! Wire form is `AddRelation`, `RemoveRelation`, or a `Batch` of both:
//!
//! ```json
//! {"__op": "Batch", "ops": [
//!     {"__op": "AddRelation", "objects": [{"__type": "Pointer", ...}]},
//!     {"__op": "RemoveRelation", "objects": [{"__type": "Pointer", ...}]}
//! ]}
//! ```

use super::FieldOperation;
use crate::encode::{Encodable, Encoder};
use crate::error::{Result, SyncError};
use crate::value::{ObjectRef, RelationValue, Value};
use serde_json::{json, Value as JsonValue};

/// Link and unlink saved objects in a relation field
#[derive(Debug, Clone, PartialEq)]
pub struct RelationOperation {
    target_class: String,
    adds: Vec<ObjectRef>,
    removes: Vec<ObjectRef>,
}

impl RelationOperation {
    /// Every object must be saved and of the same class, and at least one
    /// object must be given.
    pub fn new(adds: Vec<ObjectRef>, removes: Vec<ObjectRef>) -> Result<Self> {
        let target_class = adds
            .iter()
            .chain(removes.iter())
            .next()
            .map(ObjectRef::class_name)
            .ok_or(SyncError::EmptyRelation)?;

        for object in adds.iter().chain(removes.iter()) {
            if object.remote_id().is_none() {
                return Err(SyncError::UnsavedReference {
                    class_name: object.class_name(),
                });
            }
            check_class(&target_class, &object.class_name())?;
        }

        Ok(Self {
            target_class,
            adds: dedup_by_id(adds),
            removes: dedup_by_id(removes),
        })
    }

    /// Class every related object belongs to
    pub fn target_class(&self) -> &str {
        &self.target_class
    }

    /// Objects to link
    pub fn adds(&self) -> &[ObjectRef] {
        &self.adds
    }

    /// Objects to unlink
    pub fn removes(&self) -> &[ObjectRef] {
        &self.removes
    }

    /// The relation marker; fails on a non-relation prior or another target class
    pub fn apply(&self, prior: Option<&Value>, key: &str) -> Result<Value> {
        match prior {
            None | Some(Value::Null) => Ok(Value::Relation(RelationValue {
                target_class: self.target_class.clone(),
            })),
            Some(Value::Relation(relation)) => {
                check_class(&relation.target_class, &self.target_class)?;
                Ok(Value::Relation(relation.clone()))
            }
            Some(other) => {
                tracing::debug!(key, found = other.kind(), "relation edit on non-relation field");
                Err(SyncError::type_mismatch("Relation", "a relation", other.kind()))
            }
        }
    }

    /// Combine with a queued relation edit; a later edit cancels an earlier opposite one
    pub fn merge_with_previous(self, previous: Option<&FieldOperation>) -> Result<FieldOperation> {
        let prev = match previous {
            None => return Ok(FieldOperation::Relation(self)),
            Some(FieldOperation::Relation(prev)) => prev,
            Some(other) => return Err(SyncError::invalid_sequence(other.kind(), "Relation")),
        };
        check_class(&prev.target_class, &self.target_class)?;

        let mut adds: Vec<ObjectRef> = prev
            .adds
            .iter()
            .filter(|object| !contains_id(&self.removes, object))
            .cloned()
            .collect();
        for object in &self.adds {
            if !contains_id(&adds, object) {
                adds.push(object.clone());
            }
        }

        let mut removes: Vec<ObjectRef> = prev
            .removes
            .iter()
            .filter(|object| !contains_id(&self.adds, object))
            .cloned()
            .collect();
        for object in &self.removes {
            if !contains_id(&removes, object) {
                removes.push(object.clone());
            }
        }

        Ok(FieldOperation::Relation(RelationOperation {
            target_class: self.target_class,
            adds,
            removes,
        }))
    }
}

impl Encodable for RelationOperation {
    fn encode_with(&self, encoder: &dyn Encoder) -> Result<JsonValue> {
        let pointers = |objects: &[ObjectRef]| -> Result<JsonValue> {
            objects
                .iter()
                .map(|object| encoder.encode(&Value::Object(object.clone()), true))
                .collect::<Result<Vec<_>>>()
                .map(JsonValue::Array)
        };

        let add = json!({"__op": "AddRelation", "objects": pointers(&self.adds)?});
        let remove = json!({"__op": "RemoveRelation", "objects": pointers(&self.removes)?});

        Ok(match (self.adds.is_empty(), self.removes.is_empty()) {
            (false, false) => json!({"__op": "Batch", "ops": [add, remove]}),
            (false, true) => add,
            (true, _) => remove,
        })
    }
}

fn check_class(expected: &str, found: &str) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(SyncError::RelationClassMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }
}

fn contains_id(objects: &[ObjectRef], object: &ObjectRef) -> bool {
    let id = object.remote_id();
    objects.iter().any(|other| other.remote_id() == id)
}

fn dedup_by_id(objects: Vec<ObjectRef>) -> Vec<ObjectRef> {
    let mut unique: Vec<ObjectRef> = Vec::with_capacity(objects.len());
    for object in objects {
        if !contains_id(&unique, &object) {
            unique.push(object);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(id: &str) -> ObjectRef {
        ObjectRef::pointer("Tag", id)
    }

    fn ids(objects: &[ObjectRef]) -> Vec<String> {
        objects.iter().filter_map(ObjectRef::remote_id).collect()
    }

    #[test]
    fn test_relation_validation() {
        assert_eq!(
            RelationOperation::new(vec![], vec![]).unwrap_err(),
            SyncError::EmptyRelation
        );

        let err = RelationOperation::new(vec![tag("a"), ObjectRef::pointer("User", "u")], vec![])
            .unwrap_err();
        assert!(matches!(err, SyncError::RelationClassMismatch { .. }));
    }

    #[test]
    fn test_relation_dedups() {
        let op = RelationOperation::new(vec![tag("a"), tag("a"), tag("b")], vec![]).unwrap();
        assert_eq!(ids(op.adds()), vec!["a", "b"]);
    }

    #[test]
    fn test_relation_encoding() {
        let add = RelationOperation::new(vec![tag("a")], vec![]).unwrap();
        assert_eq!(
            add.encode().unwrap(),
            json!({"__op": "AddRelation", "objects": [
                {"__type": "Pointer", "className": "Tag", "objectId": "a"}
            ]})
        );

        let both = RelationOperation::new(vec![tag("a")], vec![tag("b")]).unwrap();
        let wire = both.encode().unwrap();
        assert_eq!(wire["__op"], "Batch");
        assert_eq!(wire["ops"][0]["__op"], "AddRelation");
        assert_eq!(wire["ops"][1]["__op"], "RemoveRelation");
    }

    #[test]
    fn test_relation_apply() {
        let op = RelationOperation::new(vec![tag("a")], vec![]).unwrap();
        let expected = Value::Relation(RelationValue {
            target_class: "Tag".to_string(),
        });

        assert_eq!(op.apply(None, "tags").unwrap(), expected);
        assert_eq!(op.apply(Some(&expected), "tags").unwrap(), expected);
        assert!(op.apply(Some(&Value::from(1)), "tags").unwrap_err().is_type_mismatch());

        let users = Value::Relation(RelationValue {
            target_class: "User".to_string(),
        });
        assert!(matches!(
            op.apply(Some(&users), "tags").unwrap_err(),
            SyncError::RelationClassMismatch { .. }
        ));
    }

    #[test]
    fn test_relation_merge_cancels() {
        let queued = FieldOperation::add_relation(vec![tag("a"), tag("b")]).unwrap();
        let merged = FieldOperation::remove_relation(vec![tag("a"), tag("c")])
            .unwrap()
            .merge_with_previous(Some(&queued))
            .unwrap();

        let FieldOperation::Relation(op) = merged else {
            panic!("expected relation, got {:?}", merged);
        };
        assert_eq!(ids(op.adds()), vec!["b"]);
        assert_eq!(ids(op.removes()), vec!["a", "c"]);
    }

    #[test]
    fn test_relation_merge_class_mismatch() {
        let queued = FieldOperation::add_relation(vec![tag("a")]).unwrap();
        let err = FieldOperation::add_relation(vec![ObjectRef::pointer("User", "u")])
            .unwrap()
            .merge_with_previous(Some(&queued))
            .unwrap_err();
        assert!(matches!(err, SyncError::RelationClassMismatch { .. }));
    }

    #[test]
    fn test_relation_after_other_kinds_rejected() {
        for previous in [FieldOperation::set(1), FieldOperation::delete(), FieldOperation::increment(1)] {
            let err = FieldOperation::add_relation(vec![tag("a")])
                .unwrap()
                .merge_with_previous(Some(&previous))
                .unwrap_err();
            assert!(err.is_invalid_sequence());
        }
    }
}
