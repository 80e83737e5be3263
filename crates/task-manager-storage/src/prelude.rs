//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use task_manager_storage::prelude::*;
//! ```

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::error::TaskStorageError;
pub use crate::id::{IdGenerator, UuidGenerator};
#[cfg(feature = "in-memory")]
pub use crate::in_memory::InMemoryTaskStorage;
pub use crate::state_machine::{is_terminal, validate_outcome, validate_transition};
pub use crate::traits::{TaskOutcome, TaskRecord, TaskStatus, TaskStorage, TaskUpdate};
