use axum::extract::State;
use serde::Serialize;

use crate::config::{config, Environment};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub environment: Environment,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub store: &'static str,
}

/// GET / - service info
pub async fn root() -> ApiResult<ServiceInfo> {
    Ok(ApiResponse::success(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        environment: config().environment,
    }))
}

/// GET /health - store reachability
pub async fn health(State(state): State<AppState>) -> ApiResult<Health> {
    let store = state.health.backend();
    if let Err(e) = state.health.ping().await {
        tracing::error!(store, error = %e, "health check failed");
        return Err(ApiError::service_unavailable(format!("{} store unavailable", store)));
    }
    Ok(ApiResponse::success(Health { status: "ok", store }))
}
