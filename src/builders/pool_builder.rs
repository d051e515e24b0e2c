//! Builders to construct named worker pools from server configuration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{ServerPoolsConfig, WorkerPoolConfig};
use crate::core::{PoolError, RejectionHandler, RespondRejected, WorkerPool};

/// Build every configured pool with the default rejection policy.
///
/// # Errors
///
/// Returns `PoolError::InvalidConfig` if any pool is invalid, or the first
/// pool construction error. Pools already built are dropped (and shut down).
pub fn build_pools(
    cfg: &ServerPoolsConfig,
) -> Result<HashMap<String, WorkerPool<RespondRejected>>, PoolError> {
    build_pools_with(cfg, |_, _| RespondRejected)
}

/// Build every configured pool, asking `handler_factory` for each pool's
/// rejection handler.
///
/// # Errors
///
/// Same as [`build_pools`].
pub fn build_pools_with<H, FH>(
    cfg: &ServerPoolsConfig,
    mut handler_factory: FH,
) -> Result<HashMap<String, WorkerPool<H>>, PoolError>
where
    H: RejectionHandler,
    FH: FnMut(&str, &WorkerPoolConfig) -> H,
{
    cfg.validate().map_err(PoolError::InvalidConfig)?;

    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let handler = handler_factory(name, pool_cfg);
        let pool = WorkerPool::with_rejection_handler(pool_cfg.clone(), handler)?;
        pools.insert(name.clone(), pool);
    }

    info!(pools = pools.len(), "Worker pools built from configuration");
    Ok(pools)
}

/// Pool snapshot data for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Pool identifier.
    pub name: String,
    /// Worker threads.
    pub worker_count: usize,
    /// Queue capacity.
    pub queue_capacity: usize,
}

/// Build pool listings from a config snapshot, sorted by name.
#[must_use]
pub fn list_pools(cfg: &ServerPoolsConfig) -> Vec<PoolSnapshot> {
    let mut snapshots: Vec<PoolSnapshot> = cfg
        .pools
        .iter()
        .map(|(name, pool)| PoolSnapshot {
            name: name.clone(),
            worker_count: pool.worker_count,
            queue_capacity: pool.queue_capacity,
        })
        .collect();
    snapshots.sort_by(|a, b| a.name.cmp(&b.name));
    snapshots
}
