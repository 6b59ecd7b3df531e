mod auth;
mod config;
mod cover_letter;
mod db;
mod documents;
mod errors;
mod llm_client;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use chrono::Duration;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::blacklist::RedisBlacklist;
use crate::auth::store::PgUserStore;
use crate::auth::tokens::TokenIssuer;
use crate::config::Config;
use crate::cover_letter::LlmCoverLetterWriter;
use crate::db::create_pool;
use crate::documents::store::PgDocumentStore;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting EaseApply API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (runs migrations)
    let db = create_pool(&config.database_url).await?;

    // Initialize Redis (refresh-token blacklist)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone())?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let tokens = TokenIssuer::new(
        &config.jwt_secret,
        Duration::minutes(config.access_token_ttl_minutes),
        Duration::days(config.refresh_token_ttl_days),
    );
    info!(
        access_ttl_minutes = config.access_token_ttl_minutes,
        refresh_ttl_days = config.refresh_token_ttl_days,
        rotate = config.rotate_refresh_tokens,
        "Token issuer configured"
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        tokens,
        users: Arc::new(PgUserStore::new(db.clone())),
        blacklist: Arc::new(RedisBlacklist::new(redis)),
        documents: Arc::new(PgDocumentStore::new(db)),
        writer: Arc::new(LlmCoverLetterWriter::new(llm)),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
