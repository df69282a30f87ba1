//! Scenario: baseline load accepts only strictly ascending, unique keys.
//!
//! A rejected batch must leave the index exactly as it was.

use sidx_index::{Entry, IndexError, ReconciliationIndex};

fn entries(keys: &[u64]) -> Vec<Entry<bool>> {
    keys.iter().map(|&k| Entry::new(k, 1, true)).collect()
}

#[test]
fn ascending_batches_load() {
    let mut ri = ReconciliationIndex::new();
    assert_eq!(ri.load(entries(&[1, 2, 7])).unwrap(), 3);
    assert_eq!(ri.load(entries(&[8, 100])).unwrap(), 2);
    assert_eq!(ri.len(), 5);
}

#[test]
fn duplicate_key_is_ordering_violation() {
    let mut ri = ReconciliationIndex::new();
    ri.load(entries(&[1, 5])).unwrap();

    let err = ri.insert(Entry::new(5, 2, true)).unwrap_err();
    assert_eq!(err, IndexError::OrderingViolation { last: 5, got: 5 });
    assert_eq!(ri.len(), 2);
}

#[test]
fn smaller_key_is_ordering_violation() {
    let mut ri = ReconciliationIndex::new();
    ri.load(entries(&[10])).unwrap();

    let err = ri.insert(Entry::new(3, 1, true)).unwrap_err();
    assert_eq!(err, IndexError::OrderingViolation { last: 10, got: 3 });
}

#[test]
fn rejected_batch_is_not_partially_applied() {
    let mut ri = ReconciliationIndex::new();
    ri.load(entries(&[1, 2])).unwrap();

    // 3 and 4 are fine, 4 -> 4 is not.
    let err = ri.load(entries(&[3, 4, 4, 9])).unwrap_err();
    assert_eq!(err, IndexError::OrderingViolation { last: 4, got: 4 });
    assert_eq!(ri.len(), 2);
    assert!(ri.lookup(3).unwrap().is_none());

    // Still usable afterwards.
    assert_eq!(ri.load(entries(&[3, 4])).unwrap(), 2);
    assert_eq!(ri.len(), 4);
}

#[test]
fn batch_starting_below_last_key_is_rejected() {
    let mut ri = ReconciliationIndex::new();
    ri.load(entries(&[50])).unwrap();

    let err = ri.load(entries(&[20, 60])).unwrap_err();
    assert_eq!(err, IndexError::OrderingViolation { last: 50, got: 20 });
    assert_eq!(ri.len(), 1);
}

#[test]
fn error_message_names_both_keys() {
    let err = IndexError::OrderingViolation { last: 9, got: 4 };
    let msg = err.to_string();
    assert!(msg.contains('9') && msg.contains('4'), "{msg}");
}
