//! Lentera Cendekia API
//!
//! HTTP server for the tutoring platform: accounts and sessions, classes,
//! mentoring sessions with attendance proofs, and public site content.

pub mod audit;
pub mod auth;
pub mod backends;
pub mod cache;
pub mod error;
pub mod handlers;
pub mod mail;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod storage;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{metrics_middleware, security_headers_middleware};
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// CORS for the configured front-end origins; unparsable entries are skipped
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let max_body = state.config.server.max_body_size;
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .merge(routes::health_routes())
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            metrics_middleware,
        ))
        .layer(DefaultBodyLimit::max(max_body))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// State backed by in-memory cache, sessions, storage and mail; the
/// PostgreSQL pool connects lazily to `DATABASE_URL` (or the default URL)
/// and only matters to tests that need it
#[cfg(any(test, feature = "test-utils"))]
pub fn test_state() -> Arc<AppState> {
    test_state_with_mailer(Arc::new(mail::LogMailer::new()))
}

/// [`test_state`] delivering through `mailer`
#[cfg(any(test, feature = "test-utils"))]
pub fn test_state_with_mailer(mailer: Arc<dyn mail::Mailer>) -> Arc<AppState> {
    use lentera_core::config::AppConfig;
    use lentera_core::db::InMemorySessionStore;
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;

    let mut config = AppConfig::default();
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database.url = url;
    }
    let db = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy(&config.database.url)
        .expect("database URL parses");

    Arc::new(AppState::new(
        config,
        db,
        Arc::new(InMemorySessionStore::new()),
        Arc::new(cache::MemoryCache::new()),
        Arc::new(storage::MemoryStorage::new()),
        mailer,
    ))
}

/// Router over [`test_state`]; must be called inside a tokio runtime
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(test_state())
}
