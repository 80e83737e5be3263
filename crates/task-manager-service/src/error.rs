//! Error taxonomy exposed by the task service.

use task_manager_storage::TaskStorageError;

/// Service-level failures.
///
/// Storage and pool errors are translated into these variants; their
/// internals only survive as the message text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task already exists: {0}")]
    AlreadyExists(String),

    #[error("Task can't be canceled: {0}")]
    CantCancel(String),

    #[error("Task can't be submitted: {0}")]
    CantSubmit(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TaskStorageError> for ServiceError {
    fn from(err: TaskStorageError) -> Self {
        match err {
            TaskStorageError::TaskNotFound(id) => ServiceError::NotFound(id),
            TaskStorageError::AlreadyExists(id) => ServiceError::AlreadyExists(id),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}
