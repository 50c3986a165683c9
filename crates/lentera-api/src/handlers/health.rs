//! Health check handlers

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;
use utoipa::ToSchema;

/// Upper bound for each dependency check
const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn root() -> &'static str {
    "Welcome to Lentera Cendekia API"
}

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub name: String,
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
    })
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    pub database: bool,
    pub cache: bool,
    pub storage: bool,
}

async fn check_dependency<F, E>(name: &str, check: F) -> bool
where
    F: std::future::Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    match timeout(CHECK_TIMEOUT, check).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(dependency = name, error = %e, "Readiness check failed");
            false
        }
        Err(_) => {
            warn!(dependency = name, "Readiness check timed out");
            false
        }
    }
}

/// Readiness check: database, cache and object storage must answer
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = check_dependency("database", async {
        sqlx::query("SELECT 1").execute(&state.db).await.map(|_| ())
    });
    let cache = check_dependency("cache", state.cache.ping());
    let storage = check_dependency("storage", state.storage.ping());
    let (database, cache, storage) = tokio::join!(database, cache, storage);

    let checks = ReadinessChecks {
        database,
        cache,
        storage,
    };
    let ready = state.is_ready() && database && cache && storage;
    let response = ReadinessResponse { ready, checks };

    if ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// JSON metrics response
#[derive(Serialize, ToSchema)]
pub struct MetricsResponse {
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub requests_per_second: f64,
    pub db_pool_size: u32,
    pub db_pool_idle: usize,
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "health",
    responses((status = 200, description = "Request counters", body = MetricsResponse))
)]
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.uptime_secs();
    let total_requests = state.get_request_count();
    let rps = if uptime > 0 {
        total_requests as f64 / uptime as f64
    } else {
        0.0
    };

    Json(MetricsResponse {
        uptime_seconds: uptime,
        total_requests,
        requests_per_second: rps,
        db_pool_size: state.db.size(),
        db_pool_idle: state.db.num_idle(),
    })
}
