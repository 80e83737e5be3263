//! # Task Worker
//!
//! **Bounded worker pool that executes tasks with cooperative cancellation.**
//!
//! The pool pulls pending tasks from a fixed-capacity queue, moves each one to
//! `Running` in the store, runs it through a [`TaskExecutor`] and writes exactly
//! one terminal status back. Cancellation is delivered through a per-task
//! [`CancellationHandle`] that the executor is expected to observe.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use task_manager_storage::prelude::*;
//! use task_manager_worker::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Arc::new(InMemoryTaskStorage::new());
//! let executor = Arc::new(SimulatedIoExecutor::new(Duration::from_millis(200)));
//! let pool = WorkerPool::new(PoolConfig::default(), executor, storage.clone())?;
//! pool.start()?;
//!
//! let task = TaskRecord::pending(UuidGenerator.generate(), SystemClock.now());
//! storage.save(task.clone()).await?;
//! pool.submit(&task, &CancellationHandle::new()).await?;
//!
//! pool.stop(Duration::from_secs(5)).await?;
//! # Ok(())
//! # }
//! ```

pub mod cancellation;
pub mod error;
pub mod executor;
pub mod pool;
pub mod prelude;
pub mod simulated_executor;
pub mod worker_pool;

pub use cancellation::CancellationHandle;
pub use error::PoolError;
pub use executor::{ExecutorError, TaskExecutor};
pub use pool::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, PoolConfig, PoolStats, TaskPool};
pub use simulated_executor::{DEFAULT_IO_DURATION, SimulatedIoExecutor};
pub use worker_pool::WorkerPool;
