//! Lentera Cendekia API Server

use lentera_api::backends;
use lentera_api::{create_router, state::AppState};
use lentera_core::config::AppConfig;
use lentera_core::db::{self, PgSessionStore};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &AppConfig) {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("lentera_api={level},lentera_core={level},tower_http={level}").into()
    });

    if config.logging.json_format {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config);
    config.validate()?;

    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;
    info!("Database migrations applied");

    let cache = backends::connect_cache(&config.cache).await?;
    let storage = backends::object_storage(&config.storage).await?;
    let mailer = backends::mailer(&config.mail)?;
    let sessions = Arc::new(PgSessionStore::new(pool.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(config, pool, sessions, cache, storage, mailer));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Lentera API Server starting on http://{}", addr);
    info!("Swagger UI available at http://{}/swagger-ui/", addr);
    info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
