//! Increment: atomic numeric addition

use super::{FieldOperation, SetOperation};
use crate::encode::{Encodable, Encoder};
use crate::error::{Result, SyncError};
use crate::value::{Number, Value};
use serde_json::{json, Value as JsonValue};

/// Add an amount to a numeric field
///
/// An absent or null field counts as zero. Negative amounts decrement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncrementOperation {
    amount: Number,
}

impl IncrementOperation {
    /// Increment by `amount`
    pub fn new(amount: impl Into<Number>) -> Self {
        Self {
            amount: amount.into(),
        }
    }

    /// Amount added on apply
    pub fn amount(&self) -> Number {
        self.amount
    }

    /// Prior number plus the amount; fails on a non-numeric prior
    pub fn apply(&self, prior: Option<&Value>) -> Result<Value> {
        let base = match prior {
            None | Some(Value::Null) => Number::zero(),
            Some(Value::Number(n)) => *n,
            Some(other) => {
                return Err(SyncError::NonNumericIncrement {
                    found: other.kind(),
                })
            }
        };
        Ok(Value::Number(base + self.amount))
    }

    /// Sum with a queued Increment, or fold into a queued Set or Delete
    pub fn merge_with_previous(self, previous: Option<&FieldOperation>) -> Result<FieldOperation> {
        match previous {
            None => Ok(FieldOperation::Increment(self)),
            Some(FieldOperation::Delete(_)) => {
                Ok(FieldOperation::Set(SetOperation::new(self.amount)))
            }
            Some(FieldOperation::Set(set)) => {
                let value = self.apply(Some(set.value()))?;
                Ok(FieldOperation::Set(SetOperation::new(value)))
            }
            Some(FieldOperation::Increment(prev)) => Ok(FieldOperation::Increment(
                IncrementOperation::new(prev.amount + self.amount),
            )),
            Some(other) => Err(SyncError::invalid_sequence(other.kind(), "Increment")),
        }
    }
}

impl Encodable for IncrementOperation {
    fn encode_with(&self, _encoder: &dyn Encoder) -> Result<JsonValue> {
        let amount = match self.amount {
            Number::Int(i) => JsonValue::from(i),
            Number::Float(f) => serde_json::Number::from_f64(f)
                .map(JsonValue::Number)
                .ok_or(SyncError::NonFiniteNumber(f))?,
        };
        Ok(json!({"__op": "Increment", "amount": amount}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_encoding() {
        let op = IncrementOperation::new(5);
        assert_eq!(op.encode().unwrap(), json!({"__op": "Increment", "amount": 5}));

        let op = IncrementOperation::new(1.5);
        assert_eq!(op.encode().unwrap(), json!({"__op": "Increment", "amount": 1.5}));
    }

    #[test]
    fn test_increment_existing() {
        let op = IncrementOperation::new(1);
        assert_eq!(op.apply(Some(&Value::from(1))).unwrap(), Value::from(2));
    }

    #[test]
    fn test_increment_fresh_field() {
        let op = IncrementOperation::new(1);
        assert_eq!(op.apply(None).unwrap(), Value::from(1));
        assert_eq!(op.apply(Some(&Value::Null)).unwrap(), Value::from(1));
    }

    #[test]
    fn test_increment_negative_and_float() {
        assert_eq!(
            IncrementOperation::new(-1).apply(Some(&Value::from(1))).unwrap(),
            Value::from(0)
        );
        assert_eq!(
            IncrementOperation::new(1.5).apply(Some(&Value::from(1))).unwrap(),
            Value::from(2.5)
        );
    }

    #[test]
    fn test_increment_non_number() {
        let err = IncrementOperation::new(1)
            .apply(Some(&Value::from("bar")))
            .unwrap_err();
        assert_eq!(err, SyncError::NonNumericIncrement { found: "string" });
    }

    #[test]
    fn test_merge_increments_sum() {
        let queued = FieldOperation::increment(1);
        let merged = FieldOperation::increment(1)
            .merge_with_previous(Some(&queued))
            .unwrap();

        assert_eq!(merged, FieldOperation::increment(2));
        assert_eq!(
            merged.apply(Some(&Value::from(1)), "yo").unwrap(),
            Some(Value::from(3))
        );
    }

    #[test]
    fn test_merge_over_set() {
        let merged = FieldOperation::increment(3)
            .merge_with_previous(Some(&FieldOperation::set(4)))
            .unwrap();
        assert_eq!(merged, FieldOperation::set(7));
    }

    #[test]
    fn test_merge_over_non_numeric_set() {
        let err = FieldOperation::increment(1)
            .merge_with_previous(Some(&FieldOperation::set("bar")))
            .unwrap_err();
        assert!(matches!(err, SyncError::NonNumericIncrement { .. }));
    }

    #[test]
    fn test_merge_over_delete_restarts_from_zero() {
        let merged = FieldOperation::increment(2)
            .merge_with_previous(Some(&FieldOperation::delete()))
            .unwrap();
        assert_eq!(merged, FieldOperation::set(2));
    }

    #[test]
    fn test_merge_over_array_ops_rejected() {
        let previous = [
            FieldOperation::add(vec![1]).unwrap(),
            FieldOperation::add_unique(vec![1]).unwrap(),
            FieldOperation::remove(vec![1]).unwrap(),
        ];
        for prev in previous {
            let err = FieldOperation::increment(1)
                .merge_with_previous(Some(&prev))
                .unwrap_err();
            assert!(err.is_invalid_sequence());
        }
    }
}
