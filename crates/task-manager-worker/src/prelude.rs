//! Prelude module for convenient imports.

pub use crate::cancellation::CancellationHandle;
pub use crate::error::PoolError;
pub use crate::executor::{ExecutorError, TaskExecutor};
pub use crate::pool::{PoolConfig, PoolStats, TaskPool};
pub use crate::simulated_executor::SimulatedIoExecutor;
pub use crate::worker_pool::WorkerPool;
