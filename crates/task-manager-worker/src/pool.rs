//! Task pool: the dispatcher contract consumed by the service layer.

use std::time::Duration;

use async_trait::async_trait;

use task_manager_storage::TaskRecord;

use crate::cancellation::CancellationHandle;
use crate::error::PoolError;

/// Default number of worker loops.
pub const DEFAULT_WORKERS: usize = 3;
/// Default task queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Configuration for a worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker loops started by `start`
    pub workers: usize,
    /// Number of tasks that may wait in the queue before `submit` blocks
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl PoolConfig {
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        Self {
            workers,
            queue_capacity,
        }
    }

    /// Reject configurations the pool cannot run with.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.workers == 0 {
            return Err(PoolError::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(PoolError::InvalidConfig(
                "queue capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub workers: usize,
    pub queue_capacity: usize,
    /// Tasks sitting in the queue, not yet taken by a worker
    pub queued: usize,
    /// Registered cancellation handles (queued or running tasks)
    pub in_flight: usize,
    pub started: bool,
    pub closed: bool,
}

/// A pool of workers that executes tasks concurrently.
#[async_trait]
pub trait TaskPool: Send + Sync {
    /// Spawn the worker loops. May only be called once.
    fn start(&self) -> Result<(), PoolError>;

    /// Queue a task for execution.
    ///
    /// Blocks while the queue is full, until a slot frees or `ctx` fires; in
    /// the latter case fails with `SubmitCancelled` and the task is never
    /// queued. A submit still waiting when the pool is stopped fails with
    /// `Closed`.
    async fn submit(&self, task: &TaskRecord, ctx: &CancellationHandle) -> Result<(), PoolError>;

    /// Fire the cancellation handle of a queued or running task.
    ///
    /// Only the first call has an effect; later calls fail with `NotFound`
    /// because the handle was removed.
    fn cancel(&self, task_id: &str) -> Result<(), PoolError>;

    /// Close the queue and wait up to `timeout` for the workers to drain it.
    ///
    /// On `Timeout` the workers keep running; calling `stop` again waits for
    /// the same workers.
    async fn stop(&self, timeout: Duration) -> Result<(), PoolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert_eq!(config.workers, 3);
        assert_eq!(config.queue_capacity, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            PoolConfig::new(0, 10).validate(),
            Err(PoolError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_queue_rejected() {
        assert!(matches!(
            PoolConfig::new(2, 0).validate(),
            Err(PoolError::InvalidConfig(_))
        ));
    }
}
