//! HTTP boundary shared by every domain router: error envelope, auth, and body validation.

mod auth;
mod error;
mod extract;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

pub use auth::{require_principal, AuthState};
pub use error::ApiError;
pub use extract::{ValidJson, ValidPath, ValidQuery};

/// Give axum's bare 405 responses the standard error envelope.
pub async fn normalize_method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut normalized = ApiError::method_not_allowed().into_response();
    if let Some(allow) = allow {
        normalized.headers_mut().insert(header::ALLOW, allow);
    }
    normalized
}

pub async fn route_not_found() -> ApiError {
    ApiError::not_found("route")
}
