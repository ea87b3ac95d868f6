//! Wires the domain services over one store into the authenticated HTTP surface.

use std::sync::Arc;
use std::time::Duration;

use axum::middleware::{from_fn_with_state, map_response};
use axum::Router;

use crate::api::{normalize_method_not_allowed, require_principal, route_not_found, AuthState};
use crate::applications::{application_router, ApplicationService};
use crate::assistant::{assistant_router, AssistantService};
use crate::identity::{identity_router, IdentityService, TokenVerifier};
use crate::inference::InferenceClient;
use crate::opportunities::{opportunity_router, OpportunityService};
use crate::readiness::{readiness_router, ReadinessService};
use crate::store::Store;

/// Every service sharing one store and one inference client.
pub struct Astra<S> {
    pub identity: Arc<IdentityService<S>>,
    pub opportunities: Arc<OpportunityService<S>>,
    pub applications: Arc<ApplicationService<S>>,
    pub readiness: Arc<ReadinessService<S>>,
    pub assistant: Arc<AssistantService<S>>,
}

impl<S> Astra<S>
where
    S: Store + 'static,
{
    pub fn new(store: Arc<S>, inference: Arc<dyn InferenceClient>, timeout: Duration) -> Self {
        let identity = Arc::new(IdentityService::new(store.clone()));
        let opportunities = Arc::new(OpportunityService::new(store.clone()));
        let applications = Arc::new(ApplicationService::new(store.clone()));
        let readiness = Arc::new(ReadinessService::new(store, inference.clone(), timeout));
        let assistant = Arc::new(AssistantService::new(
            applications.clone(),
            opportunities.clone(),
            readiness.clone(),
            inference,
            timeout,
        ));

        Self {
            identity,
            opportunities,
            applications,
            readiness,
            assistant,
        }
    }

    /// All domain routes; each one requires a bearer token.
    pub fn router(&self, verifier: Arc<dyn TokenVerifier>) -> Router {
        let auth = AuthState {
            verifier,
            resolver: self.identity.clone(),
        };

        Router::new()
            .merge(identity_router(self.identity.clone()))
            .merge(opportunity_router(self.opportunities.clone()))
            .merge(application_router(self.applications.clone()))
            .merge(readiness_router(self.readiness.clone()))
            .merge(assistant_router(self.assistant.clone()))
            .route_layer(from_fn_with_state(auth, require_principal))
            .fallback(route_not_found)
            .layer(map_response(normalize_method_not_allowed))
    }
}
