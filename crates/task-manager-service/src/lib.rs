//! # Task Service
//!
//! Thin orchestration between the API layer, the task store and the worker
//! pool. Translates create/get/list/cancel calls into store and pool
//! operations and maps their failures onto [`ServiceError`].

pub mod error;
pub mod service;

pub use error::ServiceError;
pub use service::{DefaultTaskService, TaskService, is_cancellable};
