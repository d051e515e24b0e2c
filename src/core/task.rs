//! The callback contract every submitted unit of work honors.

use super::error::AppResult;

/// A unit of work representing one websocket request/response cycle.
///
/// The pool calls [`invoke`](WebSocketTask::invoke) exactly once per task:
///
/// - `rejected == false`: a worker thread picked the task up; run the normal
///   handler logic.
/// - `rejected == true`: the pool was saturated (or shut down) at submission
///   time, or a rejecting shutdown drained the task from the queue. Produce a
///   "server busy" style response and release any held resources.
///
/// The rejection invocation for saturation happens synchronously on the
/// thread that called `submit`, so it should stay cheap.
///
/// Any `FnOnce(bool) -> AppResult<()>` closure is a task. Spell out the
/// return type on closures; it cannot be inferred through the trait:
///
/// ```rust
/// use ws_admission_pool::core::{AppResult, BoxedTask, WebSocketTask};
///
/// let task: BoxedTask = Box::new(|rejected: bool| -> AppResult<()> {
///     if rejected {
///         // write a 503-equivalent close frame
///     }
///     Ok(())
/// });
/// task.invoke(false).unwrap();
/// ```
pub trait WebSocketTask: Send + 'static {
    /// Run the task. An `Err` is logged and counted by the pool; it is never
    /// retried.
    ///
    /// # Errors
    ///
    /// Whatever the handler itself reports.
    fn invoke(self: Box<Self>, rejected: bool) -> AppResult<()>;
}

impl<F> WebSocketTask for F
where
    F: FnOnce(bool) -> AppResult<()> + Send + 'static,
{
    fn invoke(self: Box<Self>, rejected: bool) -> AppResult<()> {
        (*self)(rejected)
    }
}

/// Boxed task as it travels through the queue.
pub type BoxedTask = Box<dyn WebSocketTask>;

/// Identifier assigned to each submission, used in log fields.
pub type TaskId = u64;
