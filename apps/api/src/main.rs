mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod plan;
mod preferences;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::gemini::GeminiConnector;
use crate::llm_client::LlmClient;
use crate::plan::pipeline::PlanGenerator;
use crate::preferences::store::PgFeedbackStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting AICan API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL pool is lazy: feedback is best-effort and must not block startup
    let db = create_pool(&config.database_url)?;
    let feedback = Arc::new(PgFeedbackStore::new(db));

    // LLM client connects on first generation
    if config.gemini_api_key.is_none() {
        warn!("GEMINI_API_KEY is not set; plan generation will fail until it is configured");
    }
    let llm = LlmClient::new(Arc::new(GeminiConnector::new(
        config.gemini_api_key.clone(),
    )));
    let generator = PlanGenerator::new(llm);

    let state = AppState {
        generator,
        feedback,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
