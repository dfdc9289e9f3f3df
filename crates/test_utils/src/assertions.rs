//! Custom Test Assertions
//!
//! Provides assertion helpers for store results that give more meaningful
//! failure messages than matching on errors by hand.

use std::fmt::Debug;

use docdb_kernel::{StoreError, StoreResult};

/// Asserts that `result` failed with `StoreError::Unsupported`
pub fn assert_unsupported<T: Debug>(result: StoreResult<T>) {
    match result {
        Err(StoreError::Unsupported { .. }) => {}
        other => panic!("Expected Unsupported, got {:?}", other),
    }
}

/// Asserts that `result` failed with a remote fault carrying `status`
pub fn assert_remote_status<T: Debug>(result: StoreResult<T>, status: u16) {
    match result {
        Err(StoreError::Remote { status: actual, .. }) => assert_eq!(
            actual, status,
            "Expected remote status {}, got {}",
            status, actual
        ),
        other => panic!("Expected remote fault {}, got {:?}", status, other),
    }
}

/// Asserts that `result` failed with a timeout
pub fn assert_timeout<T: Debug>(result: StoreResult<T>) {
    match result {
        Err(StoreError::Timeout { .. }) => {}
        other => panic!("Expected Timeout, got {:?}", other),
    }
}

/// Asserts that two collections hold the same members, ignoring order
pub fn assert_same_members<T: Debug + PartialEq>(actual: &[T], expected: &[T]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Length mismatch: actual={:?}, expected={:?}",
        actual,
        expected
    );
    for item in expected {
        assert!(
            actual.contains(item),
            "Missing {:?} in {:?}",
            item,
            actual
        );
    }
}
