//! Error types for pool construction and configuration.

use thiserror::Error;

/// Errors produced when building or configuring a worker pool.
///
/// Saturation has no variant here: a rejected task is handed back to its
/// own callback with `rejected = true` instead of surfacing here.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Configuration validation or parsing failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Application-facing result using anyhow for task callbacks and higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
