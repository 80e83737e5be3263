//! Core task storage trait and data models.
//!
//! Defines the `TaskStorage` trait and the record types that flow between the
//! service, the worker pool and the query path.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TaskStorageError;

/// Lifecycle status of a task.
///
/// ```text
/// Pending -> Running -> Completed | Failed | Cancelled
/// Pending -> Cancelled   (cancelled before a worker picked it up)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted but not yet picked up by a worker
    Pending,
    /// Currently executing on a worker
    Running,
    /// Executor returned successfully
    Completed,
    /// Executor returned a non-cancellation error
    Failed,
    /// Cancellation was observed before or during execution
    #[serde(rename = "canceled")]
    Cancelled,
}

impl TaskStatus {
    /// Wire representation, also used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "canceled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a task's execution.
///
/// Modelled as an enum so a terminal record carries a result *or* an error,
/// never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Opaque success payload produced by the executor
    Success(Value),
    /// Failure detail reported by the executor
    Failure(String),
}

impl TaskOutcome {
    /// `"a result"` or `"an error"`, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskOutcome::Success(_) => "a result",
            TaskOutcome::Failure(_) => "an error",
        }
    }

    /// The success payload, if any.
    pub fn result(&self) -> Option<&Value> {
        match self {
            TaskOutcome::Success(value) => Some(value),
            TaskOutcome::Failure(_) => None,
        }
    }

    /// The failure detail, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            TaskOutcome::Success(_) => None,
            TaskOutcome::Failure(message) => Some(message),
        }
    }
}

/// Authoritative record of a task, owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Globally unique identifier (UUID), immutable after creation
    pub task_id: String,
    /// Current status
    pub status: TaskStatus,
    /// When the service created the task
    pub created_at: DateTime<Utc>,
    /// When a worker first moved the task to `Running` (`None` until then)
    pub started_at: Option<DateTime<Utc>>,
    /// Last successful write; never moves backwards
    pub updated_at: DateTime<Utc>,
    /// Result or error, present only in `Completed` / `Failed`
    pub outcome: Option<TaskOutcome>,
}

impl TaskRecord {
    /// A fresh `Pending` record.
    pub fn pending(task_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Pending,
            created_at: now,
            started_at: None,
            updated_at: now,
            outcome: None,
        }
    }

    /// Success payload, if the task completed.
    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().and_then(TaskOutcome::result)
    }

    /// Failure detail, if the task failed.
    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(TaskOutcome::error)
    }

    /// Returns `true` once the task reached `Completed`, `Failed` or `Cancelled`.
    pub fn is_terminal(&self) -> bool {
        crate::state_machine::is_terminal(self.status)
    }

    /// Time spent running.
    ///
    /// Zero while pending, `now - started_at` while running and
    /// `updated_at - started_at` once terminal. A task that never started
    /// (cancelled while queued) reports zero.
    pub fn running_duration(&self, now: DateTime<Utc>) -> Duration {
        let Some(started_at) = self.started_at else {
            return Duration::ZERO;
        };
        let end = match self.status {
            TaskStatus::Pending => return Duration::ZERO,
            TaskStatus::Running => now,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => self.updated_at,
        };
        (end - started_at).to_std().unwrap_or_default()
    }
}

impl fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "task {} [{}] created_at={} updated_at={}",
            self.task_id,
            self.status,
            self.created_at.to_rfc3339(),
            self.updated_at.to_rfc3339()
        )
    }
}

/// Sparse patch applied by [`TaskStorage::update`].
///
/// Only the fields that are `Some` are written. `started_at` is not part of
/// the patch: the store stamps it exactly once, on the first transition into
/// `Running`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    /// Timestamp of the change; the store's clock is used when absent
    pub updated_at: Option<DateTime<Utc>>,
    pub outcome: Option<TaskOutcome>,
}

impl TaskUpdate {
    /// Patch that only changes the status.
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Record the time the change happened.
    pub fn at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Attach a result or error.
    pub fn with_outcome(mut self, outcome: TaskOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Returns `true` if the patch carries neither a status nor an outcome.
    /// The store treats such a patch as a no-op.
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.outcome.is_none()
    }
}

/// Core trait for task storage backends.
///
/// Implementations must be `Send + Sync`; every operation is atomic with
/// respect to the others, so readers never observe a half-written record.
#[async_trait]
pub trait TaskStorage: Send + Sync {
    /// Human-readable name of the storage backend (e.g., "in-memory")
    fn backend_name(&self) -> &'static str;

    /// Insert a new record. Fails with `AlreadyExists` if the id is taken.
    async fn save(&self, task: TaskRecord) -> Result<(), TaskStorageError>;

    /// Current record for `task_id`. Fails with `TaskNotFound` if absent.
    async fn get(&self, task_id: &str) -> Result<TaskRecord, TaskStorageError>;

    /// Snapshot of every record, in no particular order.
    async fn get_all(&self) -> Result<Vec<TaskRecord>, TaskStorageError>;

    /// Apply a sparse patch and return the resulting record.
    ///
    /// Fails with `TaskNotFound` if absent, with a transition error if the
    /// requested status is not reachable from the current one, and with
    /// `OutcomeMismatch` if the resulting record would carry a result outside
    /// `Completed` or an error outside `Failed`. A rejected patch leaves the
    /// record untouched.
    async fn update(
        &self,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<TaskRecord, TaskStorageError>;

    /// Number of stored records.
    async fn task_count(&self) -> Result<usize, TaskStorageError>;
}
