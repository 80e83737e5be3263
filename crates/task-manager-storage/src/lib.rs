//! # Task Storage
//!
//! **Task record model and the storage contract shared by the worker pool and
//! the query path.**
//!
//! A task is created `Pending` by the service, moved to `Running` by a worker
//! right before its executor is invoked, and then moved to exactly one terminal
//! status (`Completed`, `Failed` or `Cancelled`). The store owns the
//! authoritative record; everything else works on snapshots.
//!
//! ## Quick Start
//!
//! ```rust
//! use task_manager_storage::prelude::*;
//!
//! # async fn example() -> Result<(), TaskStorageError> {
//! let storage = InMemoryTaskStorage::new();
//! let clock = SystemClock;
//!
//! let task = TaskRecord::pending(UuidGenerator.generate(), clock.now());
//! storage.save(task.clone()).await?;
//!
//! // Sparse patch: only the status is written, `started_at` is stamped once.
//! storage
//!     .update(&task.task_id, TaskUpdate::status(TaskStatus::Running))
//!     .await?;
//!
//! let running = storage.get(&task.task_id).await?;
//! assert!(running.started_at.is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`TaskStorage` trait**: insert-if-absent, point lookup, full scan, sparse update
//! - **`TaskRecord`**: the record itself (serializable, no runtime handles)
//! - **`TaskOutcome`**: success payload or failure detail, never both
//! - **State machine**: validates status transitions and status/outcome pairs on every update
//! - **`Clock` / `IdGenerator`**: injectable sources of timestamps and identities

// Core modules
pub mod clock;
pub mod error;
pub mod id;
#[cfg(feature = "in-memory")]
pub mod in_memory;
pub mod prelude;
pub mod state_machine;
pub mod traits;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::TaskStorageError;
pub use id::{IdGenerator, UuidGenerator};
#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryTaskStorage;
pub use state_machine::{is_terminal, validate_outcome, validate_transition};
pub use traits::{TaskOutcome, TaskRecord, TaskStatus, TaskStorage, TaskUpdate};
