use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::plan::pipeline::PlanError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Plan generation failed: {0}")]
    Plan(#[from] PlanError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Plan(err) => {
                let (status, code) = match err {
                    PlanError::Configuration(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
                    }
                    PlanError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
                    PlanError::UpstreamUnavailable(_) => {
                        (StatusCode::SERVICE_UNAVAILABLE, "UPSTREAM_UNAVAILABLE")
                    }
                    PlanError::Communication(_) => (StatusCode::BAD_GATEWAY, "LLM_ERROR"),
                    PlanError::MalformedResponse { .. } | PlanError::IncompleteResponse(_) => {
                        (StatusCode::BAD_GATEWAY, "INVALID_AI_RESPONSE")
                    }
                };
                (status, code, err.user_message().to_string())
            }
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Erro ao processar requisição. Tente novamente.".to_string(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation(msg) => tracing::warn!("Validation failed: {msg}"),
            AppError::Plan(err) => tracing::error!("Plan generation failed: {err}"),
            AppError::Internal(e) => tracing::error!("Internal error: {e:?}"),
        }

        let (status, code, message) = self.parts();
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
