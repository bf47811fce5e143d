use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::llm_client::MODEL;
use crate::state::AppState;

/// GET /health
/// Returns service version, the model in use and whether its credential is configured.
/// A missing key does not make the service unhealthy: generation fails fast until it is set.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "aican-api",
        "model": MODEL,
        "llm_configured": state.config.gemini_api_key.is_some()
    }))
}
