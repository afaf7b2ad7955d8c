//! Tests for error types

use requester::core::{PoisonError, RequesterError, StoreError};
use uuid::Uuid;

#[test]
fn test_attempt_limit_error() {
    let err: RequesterError = PoisonError::AttemptLimitExceeded {
        receive_count: 4,
        max_attempts: 3,
    }
    .into();
    assert_eq!(
        format!("{}", err),
        "poison message: attempt limit exceeded: received 4 times, limit 3"
    );
    assert!(err.is_poison());
}

#[test]
fn test_malformed_body_error() {
    let err: RequesterError = PoisonError::MalformedBody("expected value".to_string()).into();
    assert_eq!(format!("{}", err), "poison message: malformed body: expected value");
}

#[test]
fn test_store_error_is_transparent() {
    let id = Uuid::nil();
    let err: RequesterError = StoreError::NotFound(id).into();
    assert_eq!(format!("{}", err), format!("task {id} not found"));
    assert!(!err.is_poison());
}

#[test]
fn test_outbound_error() {
    let err = RequesterError::Outbound("connection refused".to_string());
    assert_eq!(format!("{}", err), "outbound request failed: connection refused");
}

#[test]
fn test_serialization_error_converts() {
    let serde_err = serde_json::from_str::<Uuid>("{").unwrap_err();
    let err: RequesterError = serde_err.into();
    assert!(matches!(err, RequesterError::Serialization(_)));
}
