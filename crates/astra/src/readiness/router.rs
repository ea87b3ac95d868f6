use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use super::domain::{AssessmentRequest, MockApplicationRequest, ReadinessAssessment};
use super::service::{Assessed, ReadinessService};
use crate::api::{ApiError, ValidJson, ValidPath};
use crate::identity::Principal;
use crate::ids::AssessmentId;
use crate::store::Store;

pub fn readiness_router<S>(service: Arc<ReadinessService<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/readiness-assessment", post(assess_handler::<S>))
        .route(
            "/readiness-assessment/mock-application",
            post(mock_application_handler::<S>),
        )
        .route("/readiness-assessment/:id", get(get_handler::<S>))
        .with_state(service)
}

/// 201 for a fresh assessment, 200 when the stored one is returned.
pub(crate) async fn assess_handler<S>(
    State(service): State<Arc<ReadinessService<S>>>,
    principal: Principal,
    ValidJson(request): ValidJson<AssessmentRequest>,
) -> Result<(StatusCode, Json<ReadinessAssessment>), ApiError>
where
    S: Store + 'static,
{
    let assessed = service
        .assess_eligibility(&principal, request.opportunity_id)
        .await?;
    let status = match assessed {
        Assessed::Created(_) => StatusCode::CREATED,
        Assessed::Existing(_) => StatusCode::OK,
    };
    Ok((status, Json(assessed.into_assessment())))
}

pub(crate) async fn mock_application_handler<S>(
    State(service): State<Arc<ReadinessService<S>>>,
    principal: Principal,
    ValidJson(request): ValidJson<MockApplicationRequest>,
) -> Result<Json<ReadinessAssessment>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(
        service
            .evaluate_mock_application(
                &principal,
                request.assessment_id,
                request.application_data,
            )
            .await?,
    ))
}

pub(crate) async fn get_handler<S>(
    State(service): State<Arc<ReadinessService<S>>>,
    principal: Principal,
    ValidPath(id): ValidPath<AssessmentId>,
) -> Result<Json<ReadinessAssessment>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.get(&principal, id).await?))
}
