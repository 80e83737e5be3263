//! Request routing for the task API.

use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use serde_json::json;
use tracing::{debug, error, warn};

use task_manager_service::{ServiceError, TaskService};
use task_manager_worker::CancellationHandle;

use crate::cors::CorsLayer;
use crate::error::ApiError;
use crate::response::{
    CreateTaskResponse, MessageResponse, TaskListResponse, TaskStatusResponse, TaskSummary,
    empty_response, error_response, json_response,
};
use crate::server::HttpServerConfig;

/// Known routes, before the method is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Tasks,
    TaskStatus(&'a str),
    TaskCancel(&'a str),
}

impl<'a> Route<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        match segments.as_slice() {
            ["health"] => Some(Route::Health),
            ["api", "v1", "tasks"] => Some(Route::Tasks),
            ["api", "v1", "tasks", id, "status"] if !id.is_empty() => Some(Route::TaskStatus(id)),
            ["api", "v1", "tasks", id, "cancel"] if !id.is_empty() => Some(Route::TaskCancel(id)),
            _ => None,
        }
    }
}

/// Routes requests to the task service. Cheap to clone.
#[derive(Clone)]
pub struct TaskRouter {
    service: Arc<dyn TaskService>,
    config: Arc<HttpServerConfig>,
}

impl TaskRouter {
    pub fn new(service: Arc<dyn TaskService>, config: Arc<HttpServerConfig>) -> Self {
        Self { service, config }
    }

    /// Handle one request. Request bodies are never read.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        debug!(method = %method, path = %path, "Handling request");

        let handled = tokio::time::timeout(self.config.request_timeout, self.dispatch(&method, &path));
        let mut response = match handled.await {
            Ok(response) => response,
            Err(_) => {
                warn!(method = %method, path = %path, "Request handling timed out");
                error_response(ApiError::GATEWAY_TIMEOUT)
            }
        };

        if self.config.enable_cors {
            CorsLayer::apply_cors_headers(response.headers_mut());
        }
        response
    }

    async fn dispatch(&self, method: &Method, path: &str) -> Response<Full<Bytes>> {
        let Some(route) = Route::parse(path) else {
            return error_response(ApiError::ROUTE_NOT_FOUND);
        };

        if method == Method::OPTIONS && self.config.enable_cors {
            return empty_response(StatusCode::NO_CONTENT);
        }

        match (route, method) {
            (Route::Health, &Method::GET) => json_response(StatusCode::OK, &json!({ "status": "ok" })),
            (Route::Tasks, &Method::POST) => self.create().await,
            (Route::Tasks, &Method::GET) => self.list().await,
            (Route::TaskStatus(id), &Method::GET) => self.status(id).await,
            (Route::TaskCancel(id), &Method::POST) => self.cancel(id).await,
            _ => error_response(ApiError::METHOD_NOT_ALLOWED),
        }
    }

    async fn create(&self) -> Response<Full<Bytes>> {
        let ctx = CancellationHandle::with_timeout(self.config.submit_timeout);
        match self.service.create_task(&ctx).await {
            Ok(task_uuid) => json_response(StatusCode::OK, &CreateTaskResponse { task_uuid }),
            Err(e) => service_error(&e),
        }
    }

    async fn list(&self) -> Response<Full<Bytes>> {
        match self.service.get_all().await {
            Ok(tasks) => json_response(
                StatusCode::OK,
                &TaskListResponse {
                    tasks: tasks.iter().map(TaskSummary::from).collect(),
                },
            ),
            Err(e) => service_error(&e),
        }
    }

    async fn status(&self, task_id: &str) -> Response<Full<Bytes>> {
        match self.service.get(task_id).await {
            Ok(task) => json_response(
                StatusCode::OK,
                &TaskStatusResponse::from_record(&task, self.service.now()),
            ),
            Err(e) => service_error(&e),
        }
    }

    async fn cancel(&self, task_id: &str) -> Response<Full<Bytes>> {
        match self.service.cancel(task_id).await {
            Ok(()) => json_response(
                StatusCode::OK,
                &MessageResponse {
                    message: "Task cancelled successfully".to_string(),
                },
            ),
            Err(e) => service_error(&e),
        }
    }
}

fn service_error(err: &ServiceError) -> Response<Full<Bytes>> {
    let api = ApiError::from(err);
    if api.status.is_server_error() {
        error!(error = %err, status = api.status.as_u16(), "Request failed");
    } else {
        debug!(error = %err, status = api.status.as_u16(), "Request rejected");
    }
    error_response(api)
}
