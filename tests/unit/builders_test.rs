//! Tests for pool builders

use std::collections::HashMap;

use ws_admission_pool::builders::{build_pools, build_pools_with, list_pools};
use ws_admission_pool::config::{ServerPoolsConfig, WorkerPoolConfig};
use ws_admission_pool::core::{BoxedTask, PoolError, RejectionHandler, RejectionReason};

fn server_config() -> ServerPoolsConfig {
    let mut pools = HashMap::new();
    pools.insert(
        "messages".to_string(),
        WorkerPoolConfig::new()
            .with_worker_count(2)
            .with_queue_capacity(8)
            .with_thread_name_prefix("ws-msg"),
    );
    pools.insert(
        "handshake".to_string(),
        WorkerPoolConfig::new()
            .with_worker_count(1)
            .with_queue_capacity(0)
            .with_thread_name_prefix("ws-hs"),
    );
    ServerPoolsConfig { pools }
}

#[test]
fn test_build_pools_from_config() {
    let pools = build_pools(&server_config()).expect("pools build");
    assert_eq!(pools.len(), 2);
    assert_eq!(pools["messages"].config().worker_count, 2);
    assert_eq!(pools["handshake"].stats().queue_capacity, 0);
    for pool in pools.values() {
        pool.shutdown();
    }
}

#[test]
fn test_build_pools_rejects_invalid_config() {
    let Err(err) = build_pools(&ServerPoolsConfig {
        pools: HashMap::new(),
    }) else {
        panic!("empty config must not build");
    };
    assert!(matches!(err, PoolError::InvalidConfig(_)));
}

struct NamedHandler(String);

impl RejectionHandler for NamedHandler {
    fn reject(&self, task: BoxedTask, _reason: RejectionReason) {
        assert!(!self.0.is_empty());
        let _ = task.invoke(true);
    }
}

#[test]
fn test_build_pools_with_handler_factory() {
    let mut seen = Vec::new();
    let pools = build_pools_with(&server_config(), |name, _cfg| {
        seen.push(name.to_string());
        NamedHandler(name.to_string())
    })
    .expect("pools build");

    seen.sort();
    assert_eq!(seen, vec!["handshake".to_string(), "messages".to_string()]);
    for pool in pools.values() {
        pool.shutdown();
    }
}

#[test]
fn test_list_pools_sorted() {
    let listing = list_pools(&server_config());
    let names: Vec<&str> = listing.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["handshake", "messages"]);
    assert_eq!(listing[0].worker_count, 1);
    assert_eq!(listing[1].queue_capacity, 8);
}
