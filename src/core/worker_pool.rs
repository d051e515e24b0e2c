//! Admission-controlled worker pool for websocket request handlers.
//!
//! The pool runs submitted [`WebSocketTask`]s on a fixed set of dedicated OS
//! threads fed by a bounded FIFO queue. Admission is decided at submission
//! time by counting slots: while fewer than `worker_count + queue_capacity`
//! tasks are in flight the task is queued; otherwise it is rejected and its
//! callback is invoked with `rejected = true` on the submitting thread.
//!
//! # Key Features
//!
//! - **Exactly-once**: every submitted task is invoked once, with `false` on a
//!   worker or `true` through the [`RejectionHandler`]
//! - **Never blocks the submitter**: admission is a non-blocking slot check
//! - **FIFO**: admitted tasks start in submission order
//! - **Configurable shutdown**: drain queued tasks or reject them
//!
//! # Example
//!
//! ```rust,no_run
//! use ws_admission_pool::config::WorkerPoolConfig;
//! use ws_admission_pool::core::{Admission, AppResult, WorkerPool};
//!
//! let pool = WorkerPool::new(
//!     WorkerPoolConfig::new()
//!         .with_worker_count(4)
//!         .with_queue_capacity(64),
//! )?;
//!
//! let admission = pool.submit(|rejected: bool| -> AppResult<()> {
//!     if rejected {
//!         // reply "server busy" on the socket
//!     } else {
//!         // handle the request
//!     }
//!     Ok(())
//! });
//! assert!(matches!(admission, Admission::Accepted | Admission::Rejected(_)));
//! pool.shutdown();
//! # Ok::<(), ws_admission_pool::core::PoolError>(())
//! ```
//!
//! [`WebSocketTask`]: crate::core::WebSocketTask
//! [`RejectionHandler`]: crate::core::RejectionHandler

mod native;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::rejection::RejectionReason;
use crate::core::task::{BoxedTask, TaskId};

pub use native::WorkerPool;

/// Outcome of a submission. Informational only: the task has already been
/// (or will be) invoked either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// Queued for a worker; will be invoked with `rejected = false`.
    Accepted,
    /// Already invoked with `rejected = true` before `submit` returned.
    Rejected(RejectionReason),
}

impl Admission {
    /// Whether the task was queued for normal execution.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Statistics about pool utilization and admission decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,

    /// Configured queue capacity.
    pub queue_capacity: usize,

    /// Tasks currently executing on a worker.
    pub active_tasks: u64,

    /// Tasks waiting in the queue. Includes tasks in the hand-off window
    /// between admission and a worker's next receive, so with a queue
    /// capacity of 0 this can briefly read above 0.
    pub queued_tasks: u64,

    /// Total calls to `submit`.
    pub submitted_tasks: u64,

    /// Submissions admitted to the queue.
    pub accepted_tasks: u64,

    /// Submissions rejected because the pool was saturated.
    pub rejected_saturated: u64,

    /// Tasks rejected because the pool was shut down.
    pub rejected_shutdown: u64,

    /// Tasks that ran normally and returned `Ok`.
    pub completed_tasks: u64,

    /// Tasks that returned `Err` or panicked on a worker.
    pub failed_tasks: u64,
}

impl PoolStats {
    /// Total rejections for any reason.
    #[must_use]
    pub const fn rejected_tasks(&self) -> u64 {
        self.rejected_saturated + self.rejected_shutdown
    }
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub queued_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
    pub accepted_tasks: AtomicU64,
    pub rejected_saturated: AtomicU64,
    pub rejected_shutdown: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, queue_capacity: usize) -> PoolStats {
        PoolStats {
            worker_count,
            queue_capacity,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            queued_tasks: self.queued_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            accepted_tasks: self.accepted_tasks.load(Ordering::Relaxed),
            rejected_saturated: self.rejected_saturated.load(Ordering::Relaxed),
            rejected_shutdown: self.rejected_shutdown.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
        }
    }

    /// Bump the counter matching a rejection reason.
    pub fn record_rejection(&self, reason: RejectionReason) {
        let counter = match reason {
            RejectionReason::Saturated => &self.rejected_saturated,
            RejectionReason::ShutDown => &self.rejected_shutdown,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A task sitting in the worker queue.
pub(crate) struct WorkerTask {
    /// Submission sequence number.
    pub id: TaskId,
    /// The callback to invoke.
    pub task: BoxedTask,
}
