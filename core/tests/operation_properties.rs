//! Property-based tests for the merge algebra.

use fieldsync_core::{Encodable, FieldOperation, Result, Value};
use proptest::prelude::*;

// =============================================================================
// Test helpers
// =============================================================================

fn small_list() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(0i64..5, 0..4)
}

fn arbitrary_op() -> impl Strategy<Value = FieldOperation> {
    prop_oneof![
        small_list().prop_map(|v| FieldOperation::set(v)),
        (0i64..5).prop_map(|n| FieldOperation::set(n)),
        Just(FieldOperation::delete()),
        (-3i64..4).prop_map(|n| FieldOperation::increment(n)),
        small_list().prop_map(|v| FieldOperation::add(v).unwrap()),
        small_list().prop_map(|v| FieldOperation::add_unique(v).unwrap()),
        small_list().prop_map(|v| FieldOperation::remove(v).unwrap()),
    ]
}

fn apply_in_order(prior: Option<Value>, ops: &[FieldOperation]) -> Result<Option<Value>> {
    let mut value = prior;
    for op in ops {
        value = op.apply(value.as_ref(), "field")?;
    }
    Ok(value)
}

fn merge_in_order(ops: &[FieldOperation]) -> Result<Option<FieldOperation>> {
    let mut queued: Option<FieldOperation> = None;
    for op in ops {
        queued = Some(op.clone().merge_with_previous(queued.as_ref())?);
    }
    Ok(queued)
}

/// Delete absorbs a following Remove, so "deleted" and "emptied" compare equal
fn normalize(value: Option<Value>) -> Value {
    value.unwrap_or_else(|| Value::Array(vec![]))
}

// =============================================================================
// Merge properties
// =============================================================================

proptest! {
    #[test]
    fn merged_op_matches_sequential_application(
        prior in prop::option::of(small_list()),
        ops in prop::collection::vec(arbitrary_op(), 1..6),
    ) {
        let prior = prior.map(Value::from);

        let Ok(Some(merged)) = merge_in_order(&ops) else {
            return Ok(());
        };
        let Ok(expected) = apply_in_order(prior.clone(), &ops) else {
            return Ok(());
        };

        let actual = merged.apply(prior.as_ref(), "field");
        prop_assert!(actual.is_ok(), "merged {:?} failed: {:?}", merged, actual);
        prop_assert_eq!(normalize(actual.unwrap()), normalize(expected));
    }

    #[test]
    fn delete_absorbs_any_previous(op in arbitrary_op()) {
        let merged = FieldOperation::delete().merge_with_previous(Some(&op)).unwrap();
        prop_assert_eq!(merged, FieldOperation::delete());
    }

    #[test]
    fn remove_merge_concatenates(a in small_list(), b in small_list(), prior in small_list()) {
        let queued = FieldOperation::remove(b.clone()).unwrap();
        let merged = FieldOperation::remove(a.clone())
            .unwrap()
            .merge_with_previous(Some(&queued))
            .unwrap();

        let mut both = b.clone();
        both.extend(a.iter().copied());
        prop_assert_eq!(&merged, &FieldOperation::remove(both).unwrap());

        let expected: Vec<i64> = prior
            .iter()
            .copied()
            .filter(|x| !a.contains(x) && !b.contains(x))
            .collect();
        let prior = Value::from(prior);
        prop_assert_eq!(
            merged.apply(Some(&prior), "field").unwrap(),
            Some(Value::from(expected))
        );
    }

    #[test]
    fn apply_is_repeatable(prior in small_list(), op in arbitrary_op()) {
        let prior = Value::from(prior);
        let first = op.apply(Some(&prior), "field");
        let second = op.apply(Some(&prior), "field");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn encoded_merge_replays_identically(
        prior in prop::option::of(small_list()),
        ops in prop::collection::vec(arbitrary_op(), 1..6),
    ) {
        let prior = prior.map(Value::from);
        let Ok(Some(merged)) = merge_in_order(&ops) else {
            return Ok(());
        };

        let wire = merged.encode().unwrap();
        let decoded = FieldOperation::from_wire(&wire).unwrap();
        prop_assert_eq!(&decoded, &merged);
        prop_assert_eq!(
            decoded.apply(prior.as_ref(), "field"),
            merged.apply(prior.as_ref(), "field")
        );
        // Encoding is deterministic
        prop_assert_eq!(decoded.encode().unwrap().to_string(), wire.to_string());
    }
}
