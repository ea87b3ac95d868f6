use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use super::domain::{KycSubmission, Principal, ProfileUpdate, SwitchRoleRequest, UserProfile};
use super::service::IdentityService;
use crate::api::{ApiError, ValidJson};
use crate::store::Store;

/// Router exposing the caller's own account endpoints.
pub fn identity_router<S>(service: Arc<IdentityService<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route(
            "/user/profile",
            get(profile_handler::<S>).put(update_profile_handler::<S>),
        )
        .route("/user/switch-role", post(switch_role_handler::<S>))
        .route("/user/kyc", post(kyc_handler::<S>))
        .with_state(service)
}

pub(crate) async fn profile_handler<S>(
    State(service): State<Arc<IdentityService<S>>>,
    principal: Principal,
) -> Result<Json<UserProfile>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.profile(&principal).await?))
}

pub(crate) async fn update_profile_handler<S>(
    State(service): State<Arc<IdentityService<S>>>,
    principal: Principal,
    ValidJson(update): ValidJson<ProfileUpdate>,
) -> Result<Json<UserProfile>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.update_profile(&principal, update).await?))
}

pub(crate) async fn switch_role_handler<S>(
    State(service): State<Arc<IdentityService<S>>>,
    principal: Principal,
    ValidJson(request): ValidJson<SwitchRoleRequest>,
) -> Result<Json<UserProfile>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.switch_role(&principal, request.role).await?))
}

pub(crate) async fn kyc_handler<S>(
    State(service): State<Arc<IdentityService<S>>>,
    principal: Principal,
    ValidJson(submission): ValidJson<KycSubmission>,
) -> Result<Json<UserProfile>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.submit_kyc(&principal, submission).await?))
}
