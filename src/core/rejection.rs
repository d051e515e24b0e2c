//! Rejection policy invoked when a task cannot be admitted.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::task::BoxedTask;

/// Why a task was rejected instead of being run normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// Every worker was busy and the queue was at capacity.
    Saturated,
    /// The pool was shut down, either before submission or while the task
    /// was still queued under [`ShutdownMode::Reject`](crate::config::ShutdownMode::Reject).
    ShutDown,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saturated => write!(f, "saturated"),
            Self::ShutDown => write!(f, "shut down"),
        }
    }
}

/// Policy object receiving tasks the pool will not run.
///
/// Called synchronously on the thread that made the rejection decision: the
/// submitting thread for saturation and post-shutdown submissions, the
/// shutdown caller or a worker for tasks drained from the queue. It must not
/// hand the task off to another thread for later; that would change the
/// backpressure the submitter observes.
///
/// Implementations must invoke the task exactly once.
pub trait RejectionHandler: Send + Sync + 'static {
    /// Dispose of a rejected task.
    fn reject(&self, task: BoxedTask, reason: RejectionReason);
}

/// Default policy: invoke the task in-line with `rejected = true` so it can
/// write its own "server busy" response.
#[derive(Debug, Clone, Copy, Default)]
pub struct RespondRejected;

impl RejectionHandler for RespondRejected {
    fn reject(&self, task: BoxedTask, reason: RejectionReason) {
        warn!(reason = %reason, "Rejecting websocket task");
        if let Err(e) = task.invoke(true) {
            error!(reason = %reason, error = %e, "Rejected task failed to produce its response");
        }
    }
}
