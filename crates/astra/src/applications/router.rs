use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::domain::{Application, ApplicationSubmission, ApplicationUpdate, InterviewQueueView};
use super::service::ApplicationService;
use crate::api::{ApiError, ValidJson, ValidPath};
use crate::identity::Principal;
use crate::ids::{ApplicationId, OpportunityId};
use crate::store::Store;

/// Router builder for applications and interview queues.
pub fn application_router<S>(service: Arc<ApplicationService<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/opportunities/:id/apply", post(apply_handler::<S>))
        .route(
            "/opportunities/:id/applications",
            get(opportunity_applications_handler::<S>),
        )
        .route(
            "/opportunities/:id/interview-queue",
            get(interview_queue_handler::<S>),
        )
        .route("/applications", get(list_handler::<S>))
        .route(
            "/applications/:id",
            get(get_handler::<S>)
                .put(update_handler::<S>)
                .delete(withdraw_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn apply_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    principal: Principal,
    ValidPath(opportunity_id): ValidPath<OpportunityId>,
    ValidJson(submission): ValidJson<ApplicationSubmission>,
) -> Result<(StatusCode, Json<Application>), ApiError>
where
    S: Store + 'static,
{
    let application = service.apply(&principal, opportunity_id, submission).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

pub(crate) async fn opportunity_applications_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    principal: Principal,
    ValidPath(opportunity_id): ValidPath<OpportunityId>,
) -> Result<Json<Vec<Application>>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(
        service
            .list_for_opportunity(&principal, opportunity_id)
            .await?,
    ))
}

pub(crate) async fn interview_queue_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    principal: Principal,
    ValidPath(opportunity_id): ValidPath<OpportunityId>,
) -> Result<Json<InterviewQueueView>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.interview_queue(&principal, opportunity_id).await?))
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    principal: Principal,
) -> Result<Json<Vec<Application>>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.list_mine(&principal).await?))
}

pub(crate) async fn get_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    principal: Principal,
    ValidPath(id): ValidPath<ApplicationId>,
) -> Result<Json<Application>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.get(&principal, id).await?))
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    principal: Principal,
    ValidPath(id): ValidPath<ApplicationId>,
    ValidJson(update): ValidJson<ApplicationUpdate>,
) -> Result<Json<Application>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.update(&principal, id, update).await?))
}

pub(crate) async fn withdraw_handler<S>(
    State(service): State<Arc<ApplicationService<S>>>,
    principal: Principal,
    ValidPath(id): ValidPath<ApplicationId>,
) -> Result<StatusCode, ApiError>
where
    S: Store + 'static,
{
    service.withdraw(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
