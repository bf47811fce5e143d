use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::preferences::{FeedbackStats, UserPreferences};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: i64,
}

/// GET /api/v1/feedback/me
///
/// Returns the user's aggregated likes and dislikes. Unlike generation, a store failure
/// here is an error: the whole point of the endpoint is the data.
pub async fn handle_my_preferences(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<UserPreferences>, AppError> {
    let records = state.feedback.feedback_for_user(params.user_id).await?;
    Ok(Json(UserPreferences::from_records(&records)))
}

/// GET /api/v1/feedback/stats
///
/// Satisfaction rate and the most rejected exercises and meals.
pub async fn handle_feedback_stats(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<FeedbackStats>, AppError> {
    let records = state.feedback.feedback_for_user(params.user_id).await?;
    Ok(Json(FeedbackStats::from_records(&records)))
}
