//! # Task Manager HTTP
//!
//! HTTP/1.1 transport for the task service, built on hyper.
//!
//! | method | path | body |
//! |---|---|---|
//! | `POST` | `/api/v1/tasks` | `{ "task_uuid": "..." }` |
//! | `GET` | `/api/v1/tasks` | `{ "tasks": [{ "uuid", "status", "result"?, "error"? }] }` |
//! | `GET` | `/api/v1/tasks/{uuid}/status` | `{ "status", "created_at", "duration", "result"?, "error"? }` |
//! | `POST` | `/api/v1/tasks/{uuid}/cancel` | `{ "message": "..." }` |
//! | `GET` | `/health` | `{ "status": "ok" }` |
//!
//! Failures use the envelope `{ "error": "<code>", "message": "<text>" }`.

pub mod cors;
pub mod error;
pub mod response;
pub mod router;
pub mod server;

pub use cors::CorsLayer;
pub use error::{ApiError, HttpError, Result};
pub use router::TaskRouter;
pub use server::{HttpServerConfig, TaskHttpServer, TaskHttpServerBuilder};
