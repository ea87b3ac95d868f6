use astra::config::{AppConfig, InferenceConfig};
use astra::error::AppError;
use astra::identity::JwtVerifier;
use astra::inference::{DisabledInference, HttpInferenceClient, InferenceClient};
use astra::store::{InMemoryStore, PgStore, Store};
use astra::Astra;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Which store the process runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Backend {
    Memory,
    Postgres,
}

impl Backend {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Backend::Memory => "memory",
            Backend::Postgres => "postgres",
        }
    }
}

pub(crate) fn inference_client(
    config: &InferenceConfig,
) -> Result<Arc<dyn InferenceClient>, AppError> {
    match config.api_key.clone() {
        Some(api_key) => {
            let client = HttpInferenceClient::new(config, api_key)
                .map_err(|err| AppError::Server(format!("inference client: {err}")))?;
            info!(model = %config.model, "hosted inference enabled");
            Ok(Arc::new(client))
        }
        None => {
            warn!("INFERENCE_API_KEY unset; chat is unavailable and assessments use fallback scores");
            Ok(Arc::new(DisabledInference))
        }
    }
}

pub(crate) fn domain_routes<S>(store: Arc<S>, config: &AppConfig) -> Result<Router, AppError>
where
    S: Store + 'static,
{
    let inference = inference_client(&config.inference)?;
    let astra = Astra::new(store, inference, config.inference.timeout);
    Ok(astra.router(Arc::new(JwtVerifier::new(&config.auth))))
}

/// PostgreSQL when `DATABASE_URL` is set, otherwise process memory.
pub(crate) async fn build_domain(config: &AppConfig) -> Result<(Router, Backend), AppError> {
    match config.database.url {
        Some(_) => {
            let store = PgStore::connect(&config.database).await?;
            store.migrate().await?;
            Ok((domain_routes(Arc::new(store), config)?, Backend::Postgres))
        }
        None => Ok((
            domain_routes(Arc::new(InMemoryStore::new()), config)?,
            Backend::Memory,
        )),
    }
}
