pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::plan::handlers::handle_generate_plan;
use crate::preferences::handlers::{handle_feedback_stats, handle_my_preferences};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Plan API
        .route("/api/v1/treino", post(handle_generate_plan))
        // Feedback API (read-only)
        .route("/api/v1/feedback/me", get(handle_my_preferences))
        .route("/api/v1/feedback/stats", get(handle_feedback_stats))
        .with_state(state)
}
