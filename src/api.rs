use std::sync::Arc;

use anyhow::{Error, Result};
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    clients::{facade::FacadeClient, health::HealthChecker},
    config::Config,
    models::health::HealthStatus,
};

pub struct AppState {
    health_checker: HealthChecker,
}

pub fn router(config: Config, facade_client: FacadeClient) -> Router {
    let state = Arc::new(AppState {
        health_checker: HealthChecker::new(config, facade_client),
    });

    Router::new()
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(config: Config, facade_client: FacadeClient) -> Result<(), Error> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    let app = router(config, facade_client);
    let listener = TcpListener::bind(&addr).await?;

    info!(address = %addr, "Health check server started");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all().await;

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}
