//! Abstraction for the unit of work a task performs.
//!
//! Separates *what a task computes* from *how tasks are queued and tracked*.
//! The pool only relies on two things: the executor returns when its work is
//! done, and it returns promptly once its cancellation handle fires.

use async_trait::async_trait;
use serde_json::Value;

use task_manager_storage::TaskRecord;

use crate::cancellation::CancellationHandle;

/// Error returned by an executor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    /// The executor observed its cancellation handle and aborted.
    #[error("execution cancelled")]
    Cancelled,

    /// The work itself failed.
    #[error("execution failed: {0}")]
    Failed(String),
}

/// Trait for running a task's work to completion.
///
/// Implementations must not mutate the task record; the worker that invoked
/// them writes every status change back through the store.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Run the work for `task`, aborting early once `cancel` fires.
    async fn execute(
        &self,
        task: &TaskRecord,
        cancel: &CancellationHandle,
    ) -> Result<Value, ExecutorError>;

    /// Get executor name, used in logs.
    fn name(&self) -> &'static str {
        "custom"
    }
}
