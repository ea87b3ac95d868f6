use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use super::domain::{ActionOutcome, AssistantAction, ChatReply, ChatRequest, IntentAnalysis, IntentRequest};
use super::service::AssistantService;
use crate::api::{ApiError, ValidJson};
use crate::identity::Principal;
use crate::store::Store;

pub fn assistant_router<S>(service: Arc<AssistantService<S>>) -> Router
where
    S: Store + 'static,
{
    Router::new()
        .route("/chat", post(chat_handler::<S>))
        .route("/chat/analyze-intent", post(analyze_intent_handler::<S>))
        .route("/chat/execute-action", post(execute_action_handler::<S>))
        .with_state(service)
}

pub(crate) async fn chat_handler<S>(
    State(service): State<Arc<AssistantService<S>>>,
    principal: Principal,
    ValidJson(request): ValidJson<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.chat(&principal, request).await?))
}

pub(crate) async fn analyze_intent_handler<S>(
    State(service): State<Arc<AssistantService<S>>>,
    _principal: Principal,
    ValidJson(request): ValidJson<IntentRequest>,
) -> Json<IntentAnalysis>
where
    S: Store + 'static,
{
    Json(service.analyze_intent(&request.message).await)
}

pub(crate) async fn execute_action_handler<S>(
    State(service): State<Arc<AssistantService<S>>>,
    principal: Principal,
    ValidJson(action): ValidJson<AssistantAction>,
) -> Result<Json<ActionOutcome>, ApiError>
where
    S: Store + 'static,
{
    Ok(Json(service.execute_action(&principal, action).await?))
}
