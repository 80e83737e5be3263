//! Error types for worker pool operations.

use std::time::Duration;

/// Error type for pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    #[error("Task not found in pool: {0}")]
    NotFound(String),

    #[error("Task could not be queued before the submit context ended: {0}")]
    SubmitCancelled(String),

    #[error("Task queue is closed")]
    Closed,

    #[error("Worker pool already started")]
    AlreadyStarted,

    #[error("Timed out after {0:?} waiting for workers to finish")]
    Timeout(Duration),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),
}
