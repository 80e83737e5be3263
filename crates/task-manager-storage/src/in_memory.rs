//! In-memory task storage backend.
//!
//! Tasks are stored in a `HashMap` behind a single `RwLock`: mutations are
//! serialized, reads run concurrently with each other but never with a write.
//! Records are never deleted.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::TaskStorageError;
use crate::state_machine;
use crate::traits::{TaskRecord, TaskStatus, TaskStorage, TaskUpdate};

/// In-memory task storage backend.
///
/// Uses `Arc<RwLock<HashMap>>` for concurrent access. Clones share the same map.
#[derive(Clone)]
pub struct InMemoryTaskStorage {
    tasks: Arc<RwLock<HashMap<String, TaskRecord>>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskStorage {
    /// Create a new in-memory task storage backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a new in-memory task storage stamping times from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            clock,
        }
    }
}

impl Default for InMemoryTaskStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStorage for InMemoryTaskStorage {
    fn backend_name(&self) -> &'static str {
        "in-memory"
    }

    async fn save(&self, task: TaskRecord) -> Result<(), TaskStorageError> {
        let mut tasks = self.tasks.write().await;

        if tasks.contains_key(&task.task_id) {
            return Err(TaskStorageError::AlreadyExists(task.task_id));
        }

        tasks.insert(task.task_id.clone(), task);
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskStorageError> {
        let tasks = self.tasks.read().await;
        tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| TaskStorageError::TaskNotFound(task_id.to_string()))
    }

    async fn get_all(&self) -> Result<Vec<TaskRecord>, TaskStorageError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.values().cloned().collect())
    }

    async fn update(
        &self,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<TaskRecord, TaskStorageError> {
        let mut tasks = self.tasks.write().await;

        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskStorageError::TaskNotFound(task_id.to_string()))?;

        if update.is_empty() {
            return Ok(task.clone());
        }

        // Validate the whole patch before touching the record.
        match update.status {
            Some(new_status) => state_machine::validate_transition(task.status, new_status)?,
            None if task.is_terminal() => {
                return Err(TaskStorageError::TerminalState(task.status));
            }
            None => {}
        }
        state_machine::validate_outcome(
            update.status.unwrap_or(task.status),
            update.outcome.as_ref().or(task.outcome.as_ref()),
        )?;

        let changed_at = update.updated_at.unwrap_or_else(|| self.clock.now());

        if let Some(new_status) = update.status {
            if new_status == TaskStatus::Running && task.started_at.is_none() {
                task.started_at = Some(changed_at);
            }
            task.status = new_status;
        }
        if let Some(outcome) = update.outcome {
            task.outcome = Some(outcome);
        }
        // updated_at never moves backwards
        if changed_at > task.updated_at {
            task.updated_at = changed_at;
        }

        debug!(task_id = %task_id, status = %task.status, "Task record updated");

        Ok(task.clone())
    }

    async fn task_count(&self) -> Result<usize, TaskStorageError> {
        let tasks = self.tasks.read().await;
        Ok(tasks.len())
    }
}
