//! Core admission control: tasks, rejection policy and the worker pool.

pub mod error;
pub mod rejection;
pub mod task;
pub mod worker_pool;

pub use error::{AppResult, PoolError};
pub use rejection::{RejectionHandler, RejectionReason, RespondRejected};
pub use task::{BoxedTask, TaskId, WebSocketTask};
pub use worker_pool::{Admission, PoolStats, WorkerPool};
