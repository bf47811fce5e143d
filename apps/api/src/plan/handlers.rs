//! Axum route handlers for the Plan API.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::plan::models::{GenerationRequest, TrainingPlan};
use crate::preferences::load_preferences;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GeneratePlanBody {
    pub user_id: i64,
    #[serde(flatten)]
    pub request: GenerationRequest,
}

#[derive(Debug, Serialize)]
pub struct GeneratePlanResponse {
    pub plano: TrainingPlan,
    pub status: String,
    pub mensagem: String,
}

/// POST /api/v1/treino
///
/// Validates the request, applies the user's exclusions from feedback history, and runs
/// the generation pipeline. The plan is returned as-is; persisting it is the caller's job.
pub async fn handle_generate_plan(
    State(state): State<AppState>,
    Json(body): Json<GeneratePlanBody>,
) -> Result<(StatusCode, Json<GeneratePlanResponse>), AppError> {
    let GeneratePlanBody {
        user_id,
        mut request,
    } = body;
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let preferences = load_preferences(state.feedback.as_ref(), user_id).await;
    request.exclusions = preferences.exclusions();
    if !request.exclusions.is_empty() {
        info!(
            "Applying preferences for user {user_id}: {} exercises and {} meals to avoid",
            request.exclusions.exercises.len(),
            request.exclusions.meals.len()
        );
    }

    let plan = state.generator.generate(&request).await?;
    let mensagem = format!("Plano '{}' criado para {}", plan.name, request.name.trim());

    Ok((
        StatusCode::CREATED,
        Json(GeneratePlanResponse {
            plano: plan,
            status: "sucesso".to_string(),
            mensagem,
        }),
    ))
}
