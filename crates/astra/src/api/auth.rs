use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::error::ApiError;
use crate::identity::{PrincipalResolver, TokenVerifier};

#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub resolver: Arc<dyn PrincipalResolver>,
}

/// Resolve the bearer token into a `Principal` request extension or answer 401.
pub async fn require_principal(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = {
        let token = extract_bearer(req.headers())?;
        state.verifier.verify(token).map_err(|err| {
            debug!(error = %err, "bearer token rejected");
            ApiError::unauthenticated()
        })?
    };

    let principal = state.resolver.resolve(&claims).await?;
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(ApiError::unauthenticated)?;

    let header = header.to_str().map_err(|_| ApiError::unauthenticated())?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(ApiError::unauthenticated)?
        .trim();

    if token.is_empty() {
        return Err(ApiError::unauthenticated());
    }

    Ok(token)
}
