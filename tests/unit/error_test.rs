//! Tests for error types

use ws_admission_pool::core::{PoolError, RejectionReason};

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("worker_count must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: worker_count must be greater than 0"
    );
}

#[test]
fn test_spawn_error() {
    let err = PoolError::Spawn(std::io::Error::other("resource temporarily unavailable"));
    assert_eq!(
        format!("{err}"),
        "failed to spawn worker thread: resource temporarily unavailable"
    );
}

#[test]
fn test_rejection_reason_display() {
    assert_eq!(format!("{}", RejectionReason::Saturated), "saturated");
    assert_eq!(format!("{}", RejectionReason::ShutDown), "shut down");
}
