//! Configuration models for worker pools and shutdown behavior.

pub mod pool;

pub use pool::{ServerPoolsConfig, ShutdownMode, WorkerPoolConfig, ENV_PREFIX};
