//! Executor that simulates an I/O-bound operation by sleeping.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use task_manager_storage::TaskRecord;

use crate::cancellation::CancellationHandle;
use crate::executor::{ExecutorError, TaskExecutor};

/// Default simulated I/O duration.
pub const DEFAULT_IO_DURATION: Duration = Duration::from_secs(10);

/// Sleeps for `io_duration`, or until cancelled.
#[derive(Debug, Clone)]
pub struct SimulatedIoExecutor {
    io_duration: Duration,
}

impl SimulatedIoExecutor {
    pub fn new(io_duration: Duration) -> Self {
        Self { io_duration }
    }

    pub fn io_duration(&self) -> Duration {
        self.io_duration
    }
}

impl Default for SimulatedIoExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_IO_DURATION)
    }
}

#[async_trait]
impl TaskExecutor for SimulatedIoExecutor {
    async fn execute(
        &self,
        task: &TaskRecord,
        cancel: &CancellationHandle,
    ) -> Result<Value, ExecutorError> {
        debug!(task_id = %task.task_id, duration_ms = self.io_duration.as_millis() as u64, "Simulating I/O");

        tokio::select! {
            _ = cancel.cancelled() => Err(ExecutorError::Cancelled),
            _ = tokio::time::sleep(self.io_duration) => Ok(json!({
                "message": "I/O operation completed",
                "bytes": 1024,
                "duration": format!("{:?}", self.io_duration),
                "task": task.task_id,
            })),
        }
    }

    fn name(&self) -> &'static str {
        "simulated-io"
    }
}
