//! Transport errors and the mapping of service failures onto HTTP responses.

use std::net::SocketAddr;

use http::StatusCode;

use task_manager_service::ServiceError;

/// Errors raised while running the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for HTTP server operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// Machine-readable code and client message for an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: &'static str,
}

impl ApiError {
    pub const NOT_FOUND: ApiError = ApiError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: "Task not found",
    };

    pub const ROUTE_NOT_FOUND: ApiError = ApiError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: "Route not found",
    };

    pub const METHOD_NOT_ALLOWED: ApiError = ApiError {
        status: StatusCode::METHOD_NOT_ALLOWED,
        code: "method_not_allowed",
        message: "Method not allowed for this route",
    };

    pub const CANT_CANCEL: ApiError = ApiError {
        status: StatusCode::CONFLICT,
        code: "cant_be_canceled",
        message: "Task cannot be cancelled because it is already completed or cancelled",
    };

    pub const GATEWAY_TIMEOUT: ApiError = ApiError {
        status: StatusCode::GATEWAY_TIMEOUT,
        code: "gateway_timeout",
        message: "The request timed out.",
    };

    pub const INTERNAL: ApiError = ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal_error",
        message: "Unexpected error occurred.",
    };
}

impl From<&ServiceError> for ApiError {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => ApiError::NOT_FOUND,
            ServiceError::CantCancel(_) => ApiError::CANT_CANCEL,
            ServiceError::CantSubmit(_) => ApiError::GATEWAY_TIMEOUT,
            ServiceError::AlreadyExists(_) | ServiceError::Internal(_) => ApiError::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_mapping() {
        let cases = [
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND, "not_found"),
            (ServiceError::CantCancel("x".into()), StatusCode::CONFLICT, "cant_be_canceled"),
            (
                ServiceError::CantSubmit("x".into()),
                StatusCode::GATEWAY_TIMEOUT,
                "gateway_timeout",
            ),
            (
                ServiceError::AlreadyExists("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
            (
                ServiceError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (err, status, code) in cases {
            let api = ApiError::from(&err);
            assert_eq!(api.status, status, "{err}");
            assert_eq!(api.code, code, "{err}");
        }
    }
}
