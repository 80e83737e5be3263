//! Task service: bridges the store with the worker pool.
//!
//! Creation writes the `Pending` record before the task is submitted, so a
//! status query issued right after `create_task` returns never misses it.
//! Reads go straight to the store; only creation and cancellation touch the
//! pool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use task_manager_storage::{
    Clock, IdGenerator, SystemClock, TaskRecord, TaskStatus, TaskStorage, UuidGenerator,
};
use task_manager_worker::{CancellationHandle, PoolError, TaskPool};

use crate::error::ServiceError;

/// Operations offered to the API layer.
#[async_trait]
pub trait TaskService: Send + Sync {
    /// Create a task and hand it to the pool.
    ///
    /// `ctx` bounds how long a full queue may block the caller.
    async fn create_task(&self, ctx: &CancellationHandle) -> Result<String, ServiceError>;

    /// Current record for `task_id`.
    async fn get(&self, task_id: &str) -> Result<TaskRecord, ServiceError>;

    /// Every known record, in no particular order.
    async fn get_all(&self) -> Result<Vec<TaskRecord>, ServiceError>;

    /// Ask the pool to cancel a queued or running task.
    ///
    /// Returns once the signal is delivered; the record turns `Cancelled`
    /// after the worker observes it.
    async fn cancel(&self, task_id: &str) -> Result<(), ServiceError>;

    /// Timestamp source shared with the pool, used for durations.
    fn now(&self) -> DateTime<Utc>;
}

/// Default orchestration over a `TaskStorage` and a `TaskPool`.
pub struct DefaultTaskService {
    storage: Arc<dyn TaskStorage>,
    pool: Arc<dyn TaskPool>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl DefaultTaskService {
    /// Create a service using the system clock and UUID identifiers.
    pub fn new(storage: Arc<dyn TaskStorage>, pool: Arc<dyn TaskPool>) -> Self {
        Self {
            storage,
            pool,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the identifier generator.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }
}

#[async_trait]
impl TaskService for DefaultTaskService {
    async fn create_task(&self, ctx: &CancellationHandle) -> Result<String, ServiceError> {
        let task = TaskRecord::pending(self.ids.generate(), self.clock.now());
        let task_id = task.task_id.clone();

        self.storage.save(task.clone()).await?;

        self.pool.submit(&task, ctx).await.map_err(|e| {
            // The Pending record stays behind; cleanup is left to the caller.
            warn!(task_id = %task_id, error = %e, "Task saved but could not be submitted");
            match e {
                PoolError::SubmitCancelled(_) | PoolError::Closed => {
                    ServiceError::CantSubmit(e.to_string())
                }
                other => ServiceError::Internal(other.to_string()),
            }
        })?;

        info!(task_id = %task_id, "Task created");
        Ok(task_id)
    }

    async fn get(&self, task_id: &str) -> Result<TaskRecord, ServiceError> {
        Ok(self.storage.get(task_id).await?)
    }

    async fn get_all(&self) -> Result<Vec<TaskRecord>, ServiceError> {
        Ok(self.storage.get_all().await?)
    }

    async fn cancel(&self, task_id: &str) -> Result<(), ServiceError> {
        let task = self.storage.get(task_id).await?;
        if !is_cancellable(task.status) {
            return Err(ServiceError::CantCancel(format!(
                "task {} is already {}",
                task_id, task.status
            )));
        }

        match self.pool.cancel(task_id) {
            Ok(()) => {
                info!(task_id, "Task cancellation requested");
                Ok(())
            }
            Err(PoolError::NotFound(_)) => {
                // Handle already consumed: an earlier cancel, or the worker
                // finished between the read above and now.
                debug!(task_id, status = %task.status, "No cancellation handle left for task");
                Err(ServiceError::CantCancel(format!(
                    "task {task_id} is no longer cancellable"
                )))
            }
            Err(other) => Err(ServiceError::Internal(other.to_string())),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Statuses from which a task may still be cancelled.
pub fn is_cancellable(status: TaskStatus) -> bool {
    matches!(status, TaskStatus::Pending | TaskStatus::Running)
}
