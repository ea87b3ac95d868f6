use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::applications::QueueError;
use crate::error::{DomainError, ValidationError};

/// HTTP error carrying a stable machine-readable code next to a client-safe message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn validation(err: &ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_failed", err.to_string())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_failed", message)
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "a valid bearer token is required",
        )
    }

    pub fn not_found(entity: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", format!("{entity} not found"))
    }

    pub fn method_not_allowed() -> Self {
        Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "method not allowed for this resource",
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal server error",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (self.status, body).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(err) => ApiError::validation(&err),
            DomainError::Unauthenticated => ApiError::unauthenticated(),
            DomainError::Forbidden(reason) => {
                ApiError::new(StatusCode::FORBIDDEN, "forbidden", reason)
            }
            DomainError::NotFound(entity) => ApiError::not_found(entity),
            DomainError::Conflict(reason) => {
                ApiError::new(StatusCode::CONFLICT, "conflict", reason)
            }
            DomainError::Queue(err) => {
                let code = match err {
                    QueueError::NotQualified => "not_qualified",
                    QueueError::AlreadyQueued => "already_queued",
                    QueueError::NotQueued => "not_queued",
                };
                ApiError::new(StatusCode::BAD_REQUEST, code, err.to_string())
            }
            DomainError::AssistantUnavailable => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "assistant_unavailable",
                "the assistant is temporarily unavailable",
            ),
            DomainError::Store(err) => {
                error!(error = %err, "request failed on storage");
                ApiError::internal()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::bad_request(value.body_text())
    }
}
