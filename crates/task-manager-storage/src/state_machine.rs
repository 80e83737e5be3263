//! Task state machine enforcement.
//!
//! Validates transitions of the task lifecycle:
//!
//! ```text
//! Pending -> Running | Cancelled
//! Running -> Completed | Failed | Cancelled
//! Pending -> Pending, Running -> Running    (no-op, tolerated)
//! Completed/Failed/Cancelled -> ERROR       (terminal, no further transitions)
//! ```
//!
//! A result may only sit on a `Completed` record and an error only on a
//! `Failed` one.

use crate::error::TaskStorageError;
use crate::traits::{TaskOutcome, TaskStatus};

/// Validate a task status transition.
///
/// Returns `Ok(())` if the transition is valid, or `Err(TaskStorageError)` if not.
/// Re-applying the current non-terminal status is accepted so duplicate
/// `Running` writes stay idempotent.
pub fn validate_transition(from: TaskStatus, to: TaskStatus) -> Result<(), TaskStorageError> {
    match from {
        TaskStatus::Pending => match to {
            TaskStatus::Pending | TaskStatus::Running | TaskStatus::Cancelled => Ok(()),
            TaskStatus::Completed | TaskStatus::Failed => Err(TaskStorageError::InvalidTransition {
                current: from,
                requested: to,
            }),
        },
        TaskStatus::Running => match to {
            TaskStatus::Running
            | TaskStatus::Completed
            | TaskStatus::Failed
            | TaskStatus::Cancelled => Ok(()),
            TaskStatus::Pending => Err(TaskStorageError::InvalidTransition {
                current: from,
                requested: to,
            }),
        },
        TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => {
            Err(TaskStorageError::TerminalState(from))
        }
    }
}

/// Validate that a record in `status` may carry `outcome`.
pub fn validate_outcome(
    status: TaskStatus,
    outcome: Option<&TaskOutcome>,
) -> Result<(), TaskStorageError> {
    match (status, outcome) {
        (_, None)
        | (TaskStatus::Completed, Some(TaskOutcome::Success(_)))
        | (TaskStatus::Failed, Some(TaskOutcome::Failure(_))) => Ok(()),
        (status, Some(outcome)) => Err(TaskStorageError::OutcomeMismatch {
            status,
            outcome: outcome.kind(),
        }),
    }
}

/// Returns `true` if the status is a terminal state (no further transitions allowed).
pub fn is_terminal(status: TaskStatus) -> bool {
    matches!(
        status,
        TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
    )
}
