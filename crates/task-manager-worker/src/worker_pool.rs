//! Tokio worker pool: N worker loops draining one bounded queue.
//!
//! Each accepted task gets its own [`CancellationHandle`], registered under the
//! task id until the worker that ran it has written the terminal status back
//! to the store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use task_manager_storage::{
    Clock, SystemClock, TaskOutcome, TaskRecord, TaskStatus, TaskStorage, TaskUpdate,
};

use crate::cancellation::CancellationHandle;
use crate::error::PoolError;
use crate::executor::{ExecutorError, TaskExecutor};
use crate::pool::{PoolConfig, PoolStats, TaskPool};

type Registry = Mutex<HashMap<String, CancellationHandle>>;

/// A task travelling through the queue together with its signal.
struct QueuedTask {
    task: TaskRecord,
    cancel: CancellationHandle,
}

/// What the worker observed for one task.
enum Execution {
    Completed(Value),
    Failed(String),
    Cancelled,
}

impl Execution {
    fn status(&self) -> TaskStatus {
        match self {
            Execution::Completed(_) => TaskStatus::Completed,
            Execution::Failed(_) => TaskStatus::Failed,
            Execution::Cancelled => TaskStatus::Cancelled,
        }
    }

    fn into_update(self, at: chrono::DateTime<chrono::Utc>) -> TaskUpdate {
        match self {
            Execution::Completed(value) => TaskUpdate::status(TaskStatus::Completed)
                .at(at)
                .with_outcome(TaskOutcome::Success(value)),
            Execution::Failed(message) => TaskUpdate::status(TaskStatus::Failed)
                .at(at)
                .with_outcome(TaskOutcome::Failure(message)),
            Execution::Cancelled => TaskUpdate::status(TaskStatus::Cancelled).at(at),
        }
    }
}

/// Removes a registry entry on drop unless disarmed.
///
/// Covers every early exit of `submit`, including the caller dropping the
/// future while it is blocked on a full queue.
struct Registration<'a> {
    registry: &'a Registry,
    task_id: &'a str,
    armed: bool,
}

impl Registration<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.lock().remove(self.task_id);
        }
    }
}

struct PoolInner {
    config: PoolConfig,
    executor: Arc<dyn TaskExecutor>,
    storage: Arc<dyn TaskStorage>,
    clock: Arc<dyn Clock>,
    /// `None` once the pool was stopped
    sender: Mutex<Option<mpsc::Sender<QueuedTask>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<QueuedTask>>,
    registry: Registry,
    /// Fired by `stop`; wakes submits blocked on a full queue
    shutdown: CancellationHandle,
    /// Tasks in the channel, counted on the receiving side as well
    queued: AtomicUsize,
    /// Workers not yet joined by `stop`
    workers: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

/// Bounded worker pool backed by a tokio mpsc queue.
///
/// Cheap to clone; clones share the same queue, workers and registry.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    /// Create a pool that stamps status changes with the system clock.
    pub fn new(
        config: PoolConfig,
        executor: Arc<dyn TaskExecutor>,
        storage: Arc<dyn TaskStorage>,
    ) -> Result<Self, PoolError> {
        Self::with_clock(config, executor, storage, Arc::new(SystemClock))
    }

    /// Create a pool with an explicit clock.
    pub fn with_clock(
        config: PoolConfig,
        executor: Arc<dyn TaskExecutor>,
        storage: Arc<dyn TaskStorage>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        let (sender, receiver) = mpsc::channel(config.queue_capacity);

        Ok(Self {
            inner: Arc::new(PoolInner {
                config,
                executor,
                storage,
                clock,
                sender: Mutex::new(Some(sender)),
                receiver: tokio::sync::Mutex::new(receiver),
                registry: Mutex::new(HashMap::new()),
                shutdown: CancellationHandle::new(),
                queued: AtomicUsize::new(0),
                workers: Mutex::new(Vec::new()),
                started: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Fire every registered handle and clear the registry.
    ///
    /// Returns the number of handles that were actually fired. Used after a
    /// `stop` timeout to release workers blocked on long executions.
    pub fn cancel_all(&self) -> usize {
        let handles: Vec<CancellationHandle> = self
            .inner
            .registry
            .lock()
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        let fired = handles.iter().filter(|handle| handle.cancel()).count();
        if fired > 0 {
            info!(cancelled = fired, "Cancelled all in-flight tasks");
        }
        fired
    }

    /// Snapshot of the pool's counters.
    ///
    /// `queued` keeps counting tasks still waiting in the closed queue after
    /// `stop`, until the workers have drained it.
    pub fn stats(&self) -> PoolStats {
        let closed = self.inner.sender.lock().is_none();

        PoolStats {
            workers: self.inner.config.workers,
            queue_capacity: self.inner.config.queue_capacity,
            queued: self.inner.queued.load(Ordering::SeqCst),
            in_flight: self.inner.registry.lock().len(),
            started: self.inner.started.load(Ordering::SeqCst),
            closed,
        }
    }
}

impl PoolInner {
    async fn run_worker(self: Arc<Self>, worker_id: usize) {
        debug!(worker_id, "Worker started");
        loop {
            let next = {
                let mut receiver = self.receiver.lock().await;
                receiver.recv().await
            };
            let Some(queued) = next else {
                debug!(worker_id, "Task queue closed, worker exiting");
                return;
            };
            self.queued.fetch_sub(1, Ordering::SeqCst);
            self.process(worker_id, queued).await;
        }
    }

    async fn process(&self, worker_id: usize, queued: QueuedTask) {
        let QueuedTask { task, cancel } = queued;
        let task_id = task.task_id.clone();

        let execution = if cancel.is_cancelled() {
            debug!(worker_id, task_id = %task_id, "Task cancelled while queued, skipping execution");
            Execution::Cancelled
        } else {
            let running = TaskUpdate::status(TaskStatus::Running).at(self.clock.now());
            match self.storage.update(&task_id, running).await {
                Ok(task) => {
                    debug!(worker_id, task_id = %task_id, executor = self.executor.name(), "Task running");
                    self.execute(worker_id, task, cancel).await
                }
                Err(e) => {
                    error!(worker_id, task_id = %task_id, error = %e, "Failed to mark task as running");
                    self.deregister(&task_id);
                    return;
                }
            }
        };

        let status = execution.status();
        match self
            .storage
            .update(&task_id, execution.into_update(self.clock.now()))
            .await
        {
            Ok(record) => debug!(worker_id, task = %record, "Task finished"),
            Err(e) => {
                error!(worker_id, task_id = %task_id, status = %status, error = %e, "Failed to record task outcome")
            }
        }
        self.deregister(&task_id);
    }

    async fn execute(
        &self,
        worker_id: usize,
        task: TaskRecord,
        cancel: CancellationHandle,
    ) -> Execution {
        if cancel.is_cancelled() {
            return Execution::Cancelled;
        }

        let task_id = task.task_id.clone();
        let executor = Arc::clone(&self.executor);
        let signal = cancel.clone();
        let work = tokio::spawn(async move { executor.execute(&task, &signal).await });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // The executor task is detached; it observes the same signal.
                debug!(worker_id, task_id = %task_id, "Cancellation observed during execution");
                Execution::Cancelled
            }
            joined = work => match joined {
                Ok(Ok(value)) => Execution::Completed(value),
                Ok(Err(ExecutorError::Cancelled)) => Execution::Cancelled,
                Ok(Err(ExecutorError::Failed(message))) => Execution::Failed(message),
                Err(join_error) => {
                    warn!(worker_id, task_id = %task_id, error = %join_error, "Executor task aborted");
                    Execution::Failed(format!("executor panicked: {join_error}"))
                }
            }
        }
    }

    fn deregister(&self, task_id: &str) {
        self.registry.lock().remove(task_id);
    }
}

#[async_trait]
impl TaskPool for WorkerPool {
    fn start(&self) -> Result<(), PoolError> {
        if self.inner.sender.lock().is_none() {
            return Err(PoolError::Closed);
        }
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(PoolError::AlreadyStarted);
        }

        let mut workers = self.inner.workers.lock();
        for worker_id in 0..self.inner.config.workers {
            workers.push(tokio::spawn(Arc::clone(&self.inner).run_worker(worker_id)));
        }

        info!(
            workers = self.inner.config.workers,
            queue_capacity = self.inner.config.queue_capacity,
            executor = self.inner.executor.name(),
            "Worker pool started"
        );
        Ok(())
    }

    async fn submit(&self, task: &TaskRecord, ctx: &CancellationHandle) -> Result<(), PoolError> {
        if task.task_id.is_empty() {
            return Err(PoolError::InvalidTask("task id is empty".to_string()));
        }
        if task.status != TaskStatus::Pending {
            return Err(PoolError::InvalidTask(format!(
                "task {} is {}, only pending tasks can be submitted",
                task.task_id, task.status
            )));
        }

        let sender = self.inner.sender.lock().clone().ok_or(PoolError::Closed)?;

        let cancel = CancellationHandle::new();
        {
            let mut registry = self.inner.registry.lock();
            if registry.contains_key(&task.task_id) {
                return Err(PoolError::InvalidTask(format!(
                    "task {} is already in flight",
                    task.task_id
                )));
            }
            registry.insert(task.task_id.clone(), cancel.clone());
        }
        let mut registration = Registration {
            registry: &self.inner.registry,
            task_id: &task.task_id,
            armed: true,
        };

        let queued = QueuedTask {
            task: task.clone(),
            cancel,
        };

        // Counted between reserving the slot and sending, so a worker never
        // takes an uncounted task.
        tokio::select! {
            biased;
            _ = self.inner.shutdown.cancelled() => {
                debug!(task_id = %task.task_id, "Pool stopped while submit was waiting");
                Err(PoolError::Closed)
            }
            permit = sender.reserve() => match permit {
                Ok(permit) => {
                    self.inner.queued.fetch_add(1, Ordering::SeqCst);
                    permit.send(queued);
                    registration.disarm();
                    debug!(task_id = %task.task_id, "Task queued");
                    Ok(())
                }
                Err(_) => Err(PoolError::Closed),
            },
            _ = ctx.cancelled() => {
                let reason = if ctx.is_deadline_exceeded() {
                    "deadline exceeded"
                } else {
                    "context cancelled"
                };
                warn!(task_id = %task.task_id, reason, "Submit abandoned while the queue was full");
                Err(PoolError::SubmitCancelled(reason.to_string()))
            }
        }
    }

    fn cancel(&self, task_id: &str) -> Result<(), PoolError> {
        let handle = self
            .inner
            .registry
            .lock()
            .remove(task_id)
            .ok_or_else(|| PoolError::NotFound(task_id.to_string()))?;
        handle.cancel();
        debug!(task_id, "Cancellation requested");
        Ok(())
    }

    async fn stop(&self, timeout: Duration) -> Result<(), PoolError> {
        self.inner.shutdown.cancel();
        if self.inner.sender.lock().take().is_none() {
            debug!("Task queue already closed");
        }
        let mut workers = std::mem::take(&mut *self.inner.workers.lock());
        let worker_count = workers.len();

        let joined =
            tokio::time::timeout(timeout, futures::future::join_all(workers.iter_mut())).await;
        match joined {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        warn!(error = %e, "Worker exited abnormally");
                    }
                }
                info!(workers = worker_count, "Worker pool stopped");
                Ok(())
            }
            Err(_) => {
                // Hand the unfinished workers back so a later stop waits on them again.
                workers.retain(|worker| !worker.is_finished());
                let remaining = workers.len();
                self.inner.workers.lock().extend(workers);
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    workers = remaining,
                    in_flight = self.inner.registry.lock().len(),
                    "Timed out waiting for workers, in-flight tasks keep running"
                );
                Err(PoolError::Timeout(timeout))
            }
        }
    }
}
