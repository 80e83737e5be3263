//! # Task Manager Server
//!
//! Configuration, logging setup and wiring for the `task-manager` binary.
//! Integration tests build the same [`App`] the binary runs.

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod signal;

pub use app::App;
pub use config::{AppConfig, Environment, ExecutorConfig, HttpConfig, ServerConfig};
pub use error::{AppError, ConfigError};
pub use logging::init_tracing;
