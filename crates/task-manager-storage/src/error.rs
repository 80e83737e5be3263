//! Unified error types for task storage operations.

use crate::traits::TaskStatus;

/// Unified error type for task storage operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskStorageError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Task already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid state transition: {current} -> {requested}")]
    InvalidTransition {
        current: TaskStatus,
        requested: TaskStatus,
    },

    #[error("Task is in terminal state: {0}")]
    TerminalState(TaskStatus),

    #[error("A {status} task cannot carry {outcome}")]
    OutcomeMismatch {
        status: TaskStatus,
        outcome: &'static str,
    },
}
