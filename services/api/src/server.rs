use crate::cli::ServeArgs;
use crate::infra::{build_domain, AppState};
use crate::routes::with_operational_routes;
use astra::config::AppConfig;
use astra::error::AppError;
use astra::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (domain, backend) = build_domain(&config).await?;
    let app = with_operational_routes(domain)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, backend = backend.label(), "astra api ready");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Apply the schema to the configured database and exit.
pub(crate) async fn migrate() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    if config.database.url.is_none() {
        return Err(AppError::Server(
            "DATABASE_URL must be set to run migrations".to_string(),
        ));
    }
    let store = astra::store::PgStore::connect(&config.database).await?;
    store.migrate().await?;
    info!("database schema is up to date");
    Ok(())
}
