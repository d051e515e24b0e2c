//! Tests for configuration validation

use std::collections::HashMap;
use std::time::Duration;

use ws_admission_pool::config::{ServerPoolsConfig, ShutdownMode, WorkerPoolConfig};

fn pool(workers: usize, queue: usize) -> WorkerPoolConfig {
    WorkerPoolConfig::new()
        .with_worker_count(workers)
        .with_queue_capacity(queue)
}

#[test]
fn test_pool_config_validation() {
    assert!(pool(4, 64).validate().is_ok());
}

#[test]
fn test_zero_queue_is_valid() {
    assert!(pool(1, 0).validate().is_ok());
}

#[test]
fn test_pool_config_invalid_worker_count() {
    assert!(pool(0, 64).validate().is_err());
}

#[test]
fn test_pool_config_invalid_stack_size() {
    assert!(pool(1, 1).with_thread_stack_size(0).validate().is_err());
}

#[test]
fn test_pool_config_invalid_name_prefix() {
    assert!(pool(1, 1).with_thread_name_prefix("  ").validate().is_err());
}

#[test]
fn test_pool_config_invalid_timeout() {
    let cfg = pool(1, 1).with_shutdown_timeout(Duration::ZERO);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_pool_config_from_json_defaults_missing_fields() {
    let cfg = WorkerPoolConfig::from_json_str(r#"{ "worker_count": 2, "queue_capacity": 0 }"#)
        .expect("valid json");
    assert_eq!(cfg.worker_count, 2);
    assert_eq!(cfg.queue_capacity, 0);
    assert_eq!(cfg.shutdown_mode, ShutdownMode::Drain);
    assert_eq!(cfg.thread_name_prefix, WorkerPoolConfig::default().thread_name_prefix);
}

#[test]
fn test_pool_config_from_json_rejects_invalid() {
    let err = WorkerPoolConfig::from_json_str(r#"{ "worker_count": 0 }"#).unwrap_err();
    assert_eq!(err, "worker_count must be greater than 0");

    let err = WorkerPoolConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_server_config_validation() {
    let mut pools = HashMap::new();
    pools.insert("handshake".to_string(), pool(2, 16));
    pools.insert("messages".to_string(), pool(8, 256));

    let config = ServerPoolsConfig { pools };
    assert!(config.validate().is_ok());
}

#[test]
fn test_server_config_empty_pools() {
    let config = ServerPoolsConfig {
        pools: HashMap::new(),
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_server_config_names_invalid_pool() {
    let mut pools = HashMap::new();
    pools.insert("messages".to_string(), pool(0, 1));
    let err = ServerPoolsConfig { pools }.validate().unwrap_err();
    assert_eq!(err, "pool `messages` invalid: worker_count must be greater than 0");
}

#[test]
fn test_server_config_from_json() {
    let json = r#"{
        "pools": {
            "messages": {
                "worker_count": 4,
                "queue_capacity": 32,
                "thread_stack_size": 1048576,
                "thread_name_prefix": "ws-msg",
                "shutdown_mode": "reject",
                "shutdown_timeout_ms": 1000
            }
        }
    }"#;

    let config = ServerPoolsConfig::from_json_str(json).expect("valid config");
    let messages = &config.pools["messages"];
    assert_eq!(messages.shutdown_mode, ShutdownMode::Reject);
    assert_eq!(messages.shutdown_timeout(), Duration::from_secs(1));
    assert_eq!(messages.admission_limit(), 36);
}
