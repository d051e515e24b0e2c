//! Native implementation of `WorkerPool` using OS threads.
//!
//! # Design Principles
//!
//! - **Slot accounting**: a slot is acquired on admission and released when
//!   the task finishes, so running plus queued never exceeds the limit
//! - **Serialized admission**: the sender lives behind a short mutex, making
//!   admission order equal to queue order
//! - **Clean shutdown**: dropping the sender unblocks workers once the queue
//!   is empty

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{ShutdownMode, WorkerPoolConfig};
use crate::core::error::PoolError;
use crate::core::rejection::{RejectionHandler, RejectionReason, RespondRejected};
use crate::core::task::{BoxedTask, TaskId, WebSocketTask};

use super::{Admission, PoolCounters, PoolStats, WorkerTask};

/// State shared between the pool handle and its workers.
struct Shared<H> {
    config: WorkerPoolConfig,
    handler: H,
    counters: PoolCounters,
    /// Admitted tasks not yet finished (running plus queued).
    in_flight: AtomicUsize,
    shutdown: AtomicBool,
}

impl<H: RejectionHandler> Shared<H> {
    /// Claim a slot. Only called with the sender lock held, so the
    /// check-then-increment cannot race another submitter; workers only ever
    /// decrement.
    fn try_acquire_slot(&self) -> bool {
        if self.in_flight.load(Ordering::Acquire) >= self.config.admission_limit() {
            return false;
        }
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        true
    }

    fn release_slot(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    fn reject(&self, task: BoxedTask, reason: RejectionReason) {
        self.counters.record_rejection(reason);
        self.handler.reject(task, reason);
    }

    /// Reject a task pulled off the queue during shutdown and free its slot.
    /// A panicking rejection callback is logged, never propagated, so the
    /// drain always finishes.
    fn reject_queued(&self, task_id: TaskId, task: BoxedTask) {
        self.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
        debug!(task_id = task_id, "Rejecting queued task on shutdown");
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| {
            self.reject(task, RejectionReason::ShutDown);
        })) {
            error!(
                task_id = task_id,
                panic = panic_message(payload.as_ref()),
                "Rejection handler panicked"
            );
        }
        self.release_slot();
    }

    fn rejects_queued_on_shutdown(&self) -> bool {
        self.config.shutdown_mode == ShutdownMode::Reject && self.shutdown.load(Ordering::Acquire)
    }
}

/// Worker pool with dedicated OS threads and synchronous rejection.
///
/// Every task handed to [`submit`](Self::submit) is invoked exactly once:
/// with `false` on a worker thread if it was admitted, or with `true` through
/// the pool's [`RejectionHandler`] if it was not.
pub struct WorkerPool<H = RespondRejected>
where
    H: RejectionHandler,
{
    /// Configuration, handler and counters shared with workers.
    shared: Arc<Shared<H>>,

    /// Task sender (to workers). `None` once shut down.
    task_tx: Mutex<Option<Sender<WorkerTask>>>,

    /// Receiver kept by the pool so a rejecting shutdown can drain the queue.
    task_rx: Receiver<WorkerTask>,

    /// Worker thread handles.
    workers: Mutex<Vec<JoinHandle<()>>>,

    /// Task ID counter (lock-free atomic).
    task_id_counter: AtomicU64,
}

impl WorkerPool<RespondRejected> {
    /// Create a pool that answers rejections by invoking the task with `true`.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a worker thread could not be started
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        Self::with_rejection_handler(config, RespondRejected)
    }
}

impl<H> WorkerPool<H>
where
    H: RejectionHandler,
{
    /// Create a pool with a custom rejection handler.
    ///
    /// This spawns `config.worker_count` OS threads named
    /// `{thread_name_prefix}-{id}`.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a worker thread could not be started; workers
    ///   already started exit on their own
    pub fn with_rejection_handler(config: WorkerPoolConfig, handler: H) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        // Admission never lets more than `admission_limit` tasks into the
        // channel, so `try_send` only fails once the pool is torn down.
        let (task_tx, task_rx) = bounded::<WorkerTask>(config.admission_limit());

        let shared = Arc::new(Shared {
            config,
            handler,
            counters: PoolCounters::default(),
            in_flight: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        });

        let mut workers = Vec::with_capacity(shared.config.worker_count);
        for worker_id in 0..shared.config.worker_count {
            workers.push(spawn_worker(worker_id, task_rx.clone(), Arc::clone(&shared))?);
        }

        info!(
            worker_count = shared.config.worker_count,
            queue_capacity = shared.config.queue_capacity,
            shutdown_mode = ?shared.config.shutdown_mode,
            "WorkerPool initialized"
        );

        Ok(Self {
            shared,
            task_tx: Mutex::new(Some(task_tx)),
            task_rx,
            workers: Mutex::new(workers),
            task_id_counter: AtomicU64::new(0),
        })
    }

    /// Submit a task.
    ///
    /// If a worker slot or queue slot is free the task is queued and later
    /// invoked with `rejected = false` on a worker thread. Otherwise the
    /// rejection handler runs **synchronously on the calling thread** and the
    /// task is invoked with `rejected = true` before this method returns. A
    /// slow rejection callback therefore delays the caller.
    ///
    /// Never blocks waiting for capacity and never drops the task.
    pub fn submit<T>(&self, task: T) -> Admission
    where
        T: WebSocketTask,
    {
        self.submit_boxed(Box::new(task))
    }

    /// Submit an already boxed task. See [`submit`](Self::submit).
    pub fn submit_boxed(&self, task: BoxedTask) -> Admission {
        let task_id = self.task_id_counter.fetch_add(1, Ordering::Relaxed);
        self.shared.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);

        match self.try_enqueue(task_id, task) {
            Ok(()) => {
                self.shared.counters.accepted_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(task_id = task_id, "Task admitted to worker pool");
                Admission::Accepted
            }
            Err((task, reason)) => {
                // Outside the sender lock: a slow rejection only stalls this caller.
                debug!(task_id = task_id, reason = %reason, "Task not admitted");
                self.shared.reject(task, reason);
                Admission::Rejected(reason)
            }
        }
    }

    /// Admission decision plus enqueue, under the sender lock. Hands the task
    /// back with a reason when it was not queued.
    fn try_enqueue(
        &self,
        task_id: TaskId,
        task: BoxedTask,
    ) -> Result<(), (BoxedTask, RejectionReason)> {
        let task_tx_guard = self.task_tx.lock();
        let Some(task_tx) = task_tx_guard.as_ref() else {
            return Err((task, RejectionReason::ShutDown));
        };

        if !self.shared.try_acquire_slot() {
            return Err((task, RejectionReason::Saturated));
        }

        // Count before sending so a fast worker never decrements first.
        self.shared.counters.queued_tasks.fetch_add(1, Ordering::Relaxed);

        match task_tx.try_send(WorkerTask { id: task_id, task }) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.shared.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
                self.shared.release_slot();
                let reason = match err {
                    TrySendError::Full(_) => RejectionReason::Saturated,
                    TrySendError::Disconnected(_) => RejectionReason::ShutDown,
                };
                Err((err.into_inner().task, reason))
            }
        }
    }

    /// Get current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.shared
            .counters
            .snapshot(self.shared.config.worker_count, self.shared.config.queue_capacity)
    }

    /// The configuration this pool was built with.
    #[must_use]
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.shared.config
    }

    /// Whether `shutdown` has been called (or the pool dropped).
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    /// Shut down the pool.
    ///
    /// New submissions are rejected with [`RejectionReason::ShutDown`] from
    /// here on. Running tasks finish. Queued tasks are run to completion under
    /// [`ShutdownMode::Drain`], or invoked with `rejected = true` under
    /// [`ShutdownMode::Reject`]; in the latter case this thread drains what it
    /// can and workers reject anything they already pulled.
    ///
    /// Each worker is given `shutdown_timeout` to exit; one that does not is
    /// detached. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!(mode = ?self.shared.config.shutdown_mode, "Shutting down worker pool");

        // Drop the sender so workers see a disconnected channel once it is empty.
        {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
        }

        if self.shared.config.shutdown_mode == ShutdownMode::Reject {
            let mut drained = 0_u64;
            while let Ok(queued) = self.task_rx.try_recv() {
                self.shared.reject_queued(queued.id, queued.task);
                drained += 1;
            }
            info!(drained = drained, "Queued tasks rejected on shutdown");
        }

        self.join_workers();
    }

    fn join_workers(&self) {
        let timeout = self.shared.config.shutdown_timeout();
        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            // Join on a helper thread so a stuck worker cannot hang shutdown.
            let (tx, rx) = bounded(1);
            let joiner = thread::spawn(move || {
                let _ = tx.send(worker.join().is_ok());
            });

            match rx.recv_timeout(timeout) {
                Ok(true) => {
                    debug!(worker_id = idx, "Worker joined successfully");
                    let _ = joiner.join();
                }
                Ok(false) => {
                    warn!(worker_id = idx, "Worker panicked");
                    let _ = joiner.join();
                }
                Err(_) => {
                    warn!(
                        worker_id = idx,
                        timeout_ms = self.shared.config.shutdown_timeout_ms,
                        "Worker did not exit within timeout - detaching"
                    );
                }
            }
        }

        info!(worker_count = worker_count, "Worker pool shut down complete");
    }
}

impl<H> Drop for WorkerPool<H>
where
    H: RejectionHandler,
{
    fn drop(&mut self) {
        // Signal shutdown but do not join: workers finish (or reject, per
        // mode) whatever is queued and then exit on their own.
        if !self.shared.shutdown.swap(true, Ordering::AcqRel) {
            let mut task_tx = self.task_tx.lock();
            *task_tx = None;
            debug!("WorkerPool dropped without explicit shutdown - workers will be detached");
        }
    }
}

/// Spawn a worker thread.
fn spawn_worker<H>(
    worker_id: usize,
    task_rx: Receiver<WorkerTask>,
    shared: Arc<Shared<H>>,
) -> Result<JoinHandle<()>, PoolError>
where
    H: RejectionHandler,
{
    let handle = thread::Builder::new()
        .name(format!("{}-{worker_id}", shared.config.thread_name_prefix))
        .stack_size(shared.config.thread_stack_size)
        .spawn(move || worker_loop(worker_id, &task_rx, &shared))?;
    Ok(handle)
}

/// Blocking receive loop. Exits when the sender is gone and the queue is empty.
fn worker_loop<H>(worker_id: usize, task_rx: &Receiver<WorkerTask>, shared: &Shared<H>)
where
    H: RejectionHandler,
{
    debug!(worker_id = worker_id, "Worker thread started");

    while let Ok(WorkerTask { id: task_id, task }) = task_rx.recv() {
        if shared.rejects_queued_on_shutdown() {
            debug!(worker_id = worker_id, task_id = task_id, "Worker pulled task after shutdown");
            shared.reject_queued(task_id, task);
            continue;
        }

        shared.counters.queued_tasks.fetch_sub(1, Ordering::Relaxed);
        shared.counters.active_tasks.fetch_add(1, Ordering::Relaxed);
        debug!(worker_id = worker_id, task_id = task_id, "Worker executing task");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.invoke(false)));

        shared.counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
        shared.release_slot();

        match outcome {
            Ok(Ok(())) => {
                shared.counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
                debug!(worker_id = worker_id, task_id = task_id, "Worker completed task");
            }
            Ok(Err(e)) => {
                shared.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                error!(worker_id = worker_id, task_id = task_id, error = %e, "Task failed");
            }
            Err(payload) => {
                shared.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                error!(
                    worker_id = worker_id,
                    task_id = task_id,
                    panic = panic_message(payload.as_ref()),
                    "Task panicked"
                );
            }
        }
    }

    debug!(worker_id = worker_id, "Worker thread exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::AppResult;
    use std::time::Duration;

    fn small_config(workers: usize, queue: usize) -> WorkerPoolConfig {
        WorkerPoolConfig::new()
            .with_worker_count(workers)
            .with_queue_capacity(queue)
            .with_thread_name_prefix("test-worker")
    }

    #[test]
    fn test_worker_pool_basic() {
        let pool = WorkerPool::new(small_config(2, 4)).unwrap();
        let (tx, rx) = bounded(1);

        let admission = pool.submit(move |rejected: bool| -> AppResult<()> {
            tx.send((rejected, thread::current().name().map(str::to_owned)))?;
            Ok(())
        });
        assert_eq!(admission, Admission::Accepted);

        let (rejected, name) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!rejected);
        assert!(name.unwrap().starts_with("test-worker-"));

        pool.shutdown();
        let stats = pool.stats();
        assert_eq!(stats.submitted_tasks, 1);
        assert_eq!(stats.accepted_tasks, 1);
        assert_eq!(stats.completed_tasks, 1);
        assert_eq!(stats.active_tasks, 0);
        assert_eq!(stats.queued_tasks, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let Err(err) = WorkerPool::new(small_config(0, 4)) else {
            panic!("zero workers must not build");
        };
        assert!(matches!(err, PoolError::InvalidConfig(_)));
    }

    #[test]
    fn test_slots_released_after_completion() {
        let pool = WorkerPool::new(small_config(1, 0)).unwrap();
        for _ in 0..3 {
            let (tx, rx) = bounded(1);
            let admission = pool.submit(move |rejected: bool| -> AppResult<()> {
                tx.send(rejected)?;
                Ok(())
            });
            assert!(admission.is_accepted());
            assert!(!rx.recv_timeout(Duration::from_secs(5)).unwrap());
            // The slot is released just after the callback returns.
            while pool.shared.in_flight.load(Ordering::Acquire) != 0 {
                thread::yield_now();
            }
        }
        pool.shutdown();
        assert_eq!(pool.stats().completed_tasks, 3);
    }

    #[test]
    fn test_panic_message_variants() {
        let s: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(s.as_ref()), "static str");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let pool = WorkerPool::new(small_config(2, 2)).unwrap();
        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_shutdown());
    }
}
