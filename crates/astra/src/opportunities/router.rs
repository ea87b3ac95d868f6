use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::domain::{
    CustomField, CustomFieldsUpdate, NewOpportunity, Opportunity, OpportunityFilter,
    OpportunityUpdate,
};
use super::service::OpportunityService;
use crate::api::{ApiError, ValidJson, ValidPath, ValidQuery};
use crate::identity::Principal;
use crate::ids::OpportunityId;
use crate::store::Store;

/// Router builder exposing the opportunity catalogue.
pub fn opportunity_router<S>(service: Arc<OpportunityService<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route(
            "/opportunities",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route(
            "/opportunities/:id",
            get(get_handler::<S>)
                .put(update_handler::<S>)
                .delete(delete_handler::<S>),
        )
        .route(
            "/opportunities/:id/custom-fields",
            get(custom_fields_handler::<S>).put(replace_custom_fields_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn list_handler<S>(
    State(service): State<Arc<OpportunityService<S>>>,
    _principal: Principal,
    ValidQuery(filter): ValidQuery<OpportunityFilter>,
) -> Result<Json<Vec<Opportunity>>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.list(&filter).await?))
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<OpportunityService<S>>>,
    principal: Principal,
    ValidJson(request): ValidJson<NewOpportunity>,
) -> Result<(StatusCode, Json<Opportunity>), ApiError>
where
    S: Store + 'static,
{
    let opportunity = service.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(opportunity)))
}

pub(crate) async fn get_handler<S>(
    State(service): State<Arc<OpportunityService<S>>>,
    _principal: Principal,
    ValidPath(id): ValidPath<OpportunityId>,
) -> Result<Json<Opportunity>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.get(id).await?))
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<OpportunityService<S>>>,
    principal: Principal,
    ValidPath(id): ValidPath<OpportunityId>,
    ValidJson(update): ValidJson<OpportunityUpdate>,
) -> Result<Json<Opportunity>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.update(&principal, id, update).await?))
}

pub(crate) async fn delete_handler<S>(
    State(service): State<Arc<OpportunityService<S>>>,
    principal: Principal,
    ValidPath(id): ValidPath<OpportunityId>,
) -> Result<StatusCode, ApiError>
where
    S: Store + 'static,
{
    service.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn custom_fields_handler<S>(
    State(service): State<Arc<OpportunityService<S>>>,
    _principal: Principal,
    ValidPath(id): ValidPath<OpportunityId>,
) -> Result<Json<CustomFieldsUpdate>, ApiError>
where
    S: Store + 'static,
{
    let fields = service.custom_fields(id).await?;
    Ok(Json(CustomFieldsUpdate { fields }))
}

pub(crate) async fn replace_custom_fields_handler<S>(
    State(service): State<Arc<OpportunityService<S>>>,
    principal: Principal,
    ValidPath(id): ValidPath<OpportunityId>,
    ValidJson(update): ValidJson<CustomFieldsUpdate>,
) -> Result<Json<CustomFieldsUpdate>, ApiError>
where
    S: Store + 'static,
{
    let fields: Vec<CustomField> = service
        .replace_custom_fields(&principal, id, update.fields)
        .await?;
    Ok(Json(CustomFieldsUpdate { fields }))
}
