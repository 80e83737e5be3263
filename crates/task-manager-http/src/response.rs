//! JSON response bodies for the `/api/v1` routes.

use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use task_manager_storage::{TaskRecord, TaskStatus};

use crate::error::ApiError;

/// Body of a successful `POST /api/v1/tasks`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateTaskResponse {
    pub task_uuid: String,
}

/// Body of `GET /api/v1/tasks/{uuid}/status`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusResponse {
    pub status: TaskStatus,
    /// RFC3339, second precision
    pub created_at: String,
    /// Human readable running duration, e.g. `1.5s`
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskStatusResponse {
    pub fn from_record(task: &TaskRecord, now: DateTime<Utc>) -> Self {
        Self {
            status: task.status,
            created_at: task.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration: format_duration(task.running_duration(now)),
            result: task.result().cloned(),
            error: task.error().map(str::to_string),
        }
    }
}

/// One entry of `GET /api/v1/tasks`.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub uuid: String,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&TaskRecord> for TaskSummary {
    fn from(task: &TaskRecord) -> Self {
        Self {
            uuid: task.task_id.clone(),
            status: task.status,
            result: task.result().cloned(),
            error: task.error().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self {
            error: err.code.to_string(),
            message: err.message.to_string(),
        }
    }
}

/// Format a duration at millisecond precision: `0s`, `250ms`, `1.5s`.
pub fn format_duration(duration: Duration) -> String {
    if duration.as_millis() == 0 {
        return "0s".to_string();
    }
    format!("{:?}", Duration::from_millis(duration.as_millis() as u64))
}

/// Serialize `body` into a JSON response with the given status.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => with_json_body(status, Bytes::from(bytes)),
        Err(e) => {
            error!(error = %e, "Failed to serialize response body");
            with_json_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                Bytes::from_static(br#"{"error":"internal_error","message":"Unexpected error occurred."}"#),
            )
        }
    }
}

/// JSON error envelope `{ "error": code, "message": text }`.
pub fn error_response(err: ApiError) -> Response<Full<Bytes>> {
    json_response(err.status, &ErrorResponse::from(err))
}

/// Empty response, used for CORS preflight.
pub fn empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}

fn with_json_body(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
