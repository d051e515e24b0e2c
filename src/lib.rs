//! # WS Admission Pool
//!
//! An admission-controlled worker pool for websocket request handlers.
//!
//! A websocket server hands each incoming request to the pool as a task. The
//! pool runs tasks on a fixed set of dedicated worker threads behind a
//! bounded FIFO queue. When every worker is busy and the queue is full, the
//! pool does not block the accepting thread and does not return an error:
//! it invokes the task's own callback right there, on the submitting thread,
//! with `rejected = true`, so the handler can answer "server busy" and
//! release its resources.
//!
//! ## The Task Contract
//!
//! Every task is invoked exactly once with a single boolean:
//!
//! - `false`: run normally (on a worker thread)
//! - `true`: rejected, produce a fallback response (on the thread that made
//!   the rejection decision)
//!
//! ```rust,no_run
//! use ws_admission_pool::config::WorkerPoolConfig;
//! use ws_admission_pool::core::{AppResult, WorkerPool};
//!
//! let pool = WorkerPool::new(
//!     WorkerPoolConfig::new()
//!         .with_worker_count(8)
//!         .with_queue_capacity(256),
//! )?;
//!
//! pool.submit(|rejected: bool| -> AppResult<()> {
//!     if rejected {
//!         // send a "try again later" close frame
//!         return Ok(());
//!     }
//!     // run the request handler
//!     Ok(())
//! });
//!
//! pool.shutdown();
//! # Ok::<(), ws_admission_pool::core::PoolError>(())
//! ```
//!
//! ## Configuration
//!
//! Pools are configured in code with `with_*` builders, from JSON, or from
//! `WS_POOL_*` environment variables (a `.env` file is honored). Several
//! named pools can be built at once from a [`config::ServerPoolsConfig`] via
//! [`builders::build_pools`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core admission control: tasks, rejection policy and the worker pool.
pub mod core;
/// Configuration models for pools and shutdown behavior.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;
