//! Plan Generation — runs one request through the full pipeline.
//!
//! Flow: build prompt → complete → sanitize → parse + validate → normalize →
//!       typed plan.
//!
//! Only the completion step does I/O. A structurally invalid response is terminal for
//! the request: nothing here loops on schema failure, and no partial plan is ever
//! returned. Diagnostic detail is logged at error level; `PlanError::user_message`
//! is what callers show.

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::llm_client::{LlmClient, LlmError};
use crate::plan::builder::build_prompt;
use crate::plan::models::{
    CostTier, GenerationRequest, TrainingPlan, FIELD_NUTRITION, TIMING_POST_WORKOUT,
    TIMING_PRE_WORKOUT,
};
use crate::plan::normalizer::normalize_plan;
use crate::plan::sanitizer::sanitize;
use crate::plan::validator::{parse_and_validate, ValidationError};

/// Raw completion text is logged up to this many characters.
const RAW_EXCERPT_CHARS: usize = 500;

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Where a generation request currently is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Building,
    Requesting,
    Sanitizing,
    Validating,
    Normalizing,
    Complete,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("communication error: {0}")]
    Communication(String),

    #[error("malformed response at line {line}, column {column}: {message}")]
    MalformedResponse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("incomplete response: {0}")]
    IncompleteResponse(String),
}

impl From<LlmError> for PlanError {
    fn from(e: LlmError) -> Self {
        let detail = e.to_string();
        match e {
            LlmError::Configuration(_) => PlanError::Configuration(detail),
            LlmError::RateLimited { .. } => PlanError::RateLimited(detail),
            LlmError::UpstreamUnavailable { .. } => PlanError::UpstreamUnavailable(detail),
            LlmError::Communication { .. } => PlanError::Communication(detail),
        }
    }
}

impl From<ValidationError> for PlanError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Malformed {
                line,
                column,
                message,
            } => PlanError::MalformedResponse {
                line,
                column,
                message,
            },
            ValidationError::Schema(schema) => PlanError::IncompleteResponse(schema.to_string()),
        }
    }
}

impl PlanError {
    /// The stage the request failed in.
    pub fn stage(&self) -> Stage {
        match self {
            PlanError::Configuration(_)
            | PlanError::RateLimited(_)
            | PlanError::UpstreamUnavailable(_)
            | PlanError::Communication(_) => Stage::Requesting,
            PlanError::MalformedResponse { .. } | PlanError::IncompleteResponse(_) => {
                Stage::Validating
            }
        }
    }

    /// Stable message for end users. Never carries provider or parser detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            PlanError::Configuration(_) => {
                "O serviço de IA não está configurado. Contate o suporte."
            }
            PlanError::RateLimited(_) => {
                "Muitas requisições ao serviço de IA. Aguarde alguns instantes e tente novamente."
            }
            PlanError::UpstreamUnavailable(_) => {
                "O serviço de IA está temporariamente indisponível. Tente novamente em instantes."
            }
            PlanError::Communication(_) => {
                "Erro ao processar requisição com IA. Tente novamente."
            }
            PlanError::MalformedResponse { .. } | PlanError::IncompleteResponse(_) => {
                "A IA retornou uma resposta inválida. Tente gerar o plano novamente."
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs plan generations. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct PlanGenerator {
    llm: LlmClient,
}

impl PlanGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    /// Generates one plan for an already-validated request.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<TrainingPlan, PlanError> {
        let span = info_span!("generate_plan", request_id = %Uuid::new_v4());
        self.run(request).instrument(span).await
    }

    async fn run(&self, request: &GenerationRequest) -> Result<TrainingPlan, PlanError> {
        debug!(stage = ?Stage::Building, "Building prompt");
        let prompt = build_prompt(request);
        info!(
            "Generating plan: {} days/week, location={}, goal={}, {} exercise and {} meal exclusions",
            request.availability,
            request.location.code(),
            request.goal.code(),
            request.exclusions.exercises.len(),
            request.exclusions.meals.len()
        );

        debug!(stage = ?Stage::Requesting, "Prompt is {} chars", prompt.len());
        let raw = self.llm.complete(&prompt).await.map_err(|e| {
            let err = PlanError::from(e);
            error!(stage = ?err.stage(), "Completion failed: {err}");
            err
        })?;

        let plan = process_completion(&raw)?;
        info!(
            "Plan '{}' generated: {} days, {} exercises, {} meals",
            plan.name,
            plan.days.len(),
            plan.exercise_count(),
            plan.meal_count()
        );
        debug!(stage = ?Stage::Complete, "Generation complete");
        Ok(plan)
    }
}

/// Turns raw completion text into a typed plan: sanitize → validate → normalize → assemble.
pub fn process_completion(raw: &str) -> Result<TrainingPlan, PlanError> {
    debug!(stage = ?Stage::Sanitizing, "Raw completion is {} chars", raw.len());
    let sanitized = sanitize(raw);

    debug!(stage = ?Stage::Validating, "Parsing sanitized completion");
    let mut value = parse_and_validate(&sanitized).map_err(|e| {
        let err = PlanError::from(e);
        log_rejected_response(&err, raw, &sanitized);
        err
    })?;

    debug!(stage = ?Stage::Normalizing, "Normalizing plan");
    let report = normalize_plan(&mut value);
    if report.changes() > 0 {
        info!(
            "Normalized plan: {} rest values coerced, {} defaulted, {} links synthesized, {} replaced, {} trimmed, {} entries dropped, {} blocks reset",
            report.rest_coerced,
            report.rest_defaulted,
            report.links_synthesized,
            report.links_replaced,
            report.links_trimmed,
            report.entries_dropped,
            report.blocks_reset
        );
    }
    log_unclassified_tiers(&value);

    serde_json::from_value::<TrainingPlan>(value).map_err(|e| {
        let err = PlanError::IncompleteResponse(format!("plan does not match the expected shape: {e}"));
        log_rejected_response(&err, raw, &sanitized);
        err
    })
}

fn log_rejected_response(err: &PlanError, raw: &str, sanitized: &str) {
    error!(stage = ?err.stage(), "AI response rejected: {err}");
    if let PlanError::MalformedResponse { line, column, .. } = err {
        if let Some(offending) = sanitized.lines().nth(line.saturating_sub(1)) {
            error!("Offending line: {offending}");
            error!("Position:       {}^", " ".repeat(column.saturating_sub(1)));
        }
    }
    error!("Raw response (first {RAW_EXCERPT_CHARS} chars): {}", excerpt(raw));
}

/// Cost-tier keys the model invented are kept, but worth knowing about.
fn log_unclassified_tiers(plan: &Value) {
    let Some(nutrition) = plan.get(FIELD_NUTRITION).and_then(Value::as_object) else {
        return;
    };
    for timing in [TIMING_PRE_WORKOUT, TIMING_POST_WORKOUT] {
        let Some(block) = nutrition.get(timing).and_then(Value::as_object) else {
            warn!("Nutrition suggestions have no '{timing}' block");
            continue;
        };
        for key in block.keys() {
            match CostTier::from_key(key) {
                Some(tier) => debug!("{timing}: '{key}' is the {} tier", tier.label()),
                None => warn!("{timing}: unclassified cost tier '{key}' kept as-is"),
            }
        }
    }
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(RAW_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use crate::llm_client::testing::{scripted_client, ScriptedProvider};
    use crate::llm_client::ProviderError;
    use crate::plan::models::{Exclusions, Goal, TrainingLocation};

    use super::*;

    const VALID_COMPLETION: &str = r#"```json
{
    "nome_da_rotina": "Hipertrofia ABC",
    "dias_de_treino": [
        {
            "identificacao": "Dia A",
            "foco_muscular": "Peito",
            "exercicios": [
                {
                    "nome": "Supino Reto",
                    "series": "4x",
                    "repeticoes": "8-12",
                    "descanso_segundos": "90",
                    "detalhes_execucao": "Controle a descida",
                },
            ]
        }
    ],
    "sugestoes_nutricionais": {
        "pre_treino": {
            "opcao_economica": {
                "nome": "Banana com aveia",
                "custo_estimado": "R$ 3,00",
                "ingredientes": ["1 banana", "2 colheres de aveia"],
                "explicacao": "Energia rápida"
            }
        },
        "pos_treino": {}
    }
}
```"#;

    fn reference_request() -> GenerationRequest {
        GenerationRequest {
            name: "João Silva".to_string(),
            height_cm: 175.0,
            weight_kg: 80.0,
            age: 30,
            availability: 3,
            location: TrainingLocation::Gym,
            goal: Goal::Hypertrophy,
            exclusions: Exclusions::default(),
        }
    }

    fn generator_with(script: Vec<Result<String, ProviderError>>) -> PlanGenerator {
        let (client, _, _) = scripted_client(ScriptedProvider::new(script));
        PlanGenerator::new(client)
    }

    #[test]
    fn test_process_completion_repairs_and_normalizes() {
        let plan = process_completion(VALID_COMPLETION).unwrap();

        assert_eq!(plan.name, "Hipertrofia ABC");
        let exercise = &plan.days[0].exercises[0];
        assert_eq!(exercise.rest_seconds, 90);
        assert_eq!(
            exercise.video_url,
            "https://www.youtube.com/results?search_query=como+fazer+Supino+Reto"
        );
        let meal = &plan.nutrition.pre_workout["opcao_economica"];
        assert_eq!(
            meal.recipe_url,
            "https://www.google.com/search?q=como+fazer+Banana+com+aveia"
        );
        assert_eq!(plan.meal_count(), 1);
    }

    #[test]
    fn test_process_completion_reports_parse_position() {
        let err = process_completion("{\n  \"nome_da_rotina\": \"A\"\n  \"dias\": []\n}").unwrap_err();
        assert!(matches!(err, PlanError::MalformedResponse { line: 3, .. }), "{err:?}");
        assert_eq!(err.stage(), Stage::Validating);
    }

    #[test]
    fn test_process_completion_rejects_missing_days() {
        let err = process_completion(r#"{"nome_da_rotina": "A", "sugestoes_nutricionais": {}}"#)
            .unwrap_err();
        match err {
            PlanError::IncompleteResponse(detail) => assert!(detail.contains("dias_de_treino")),
            other => panic!("expected IncompleteResponse, got {other:?}"),
        }
    }

    fn plan_with(day: serde_json::Value, nutrition: serde_json::Value) -> String {
        serde_json::json!({
            "nome_da_rotina": "Programa",
            "dias_de_treino": [day],
            "sugestoes_nutricionais": nutrition
        })
        .to_string()
    }

    fn squat_day() -> serde_json::Value {
        serde_json::json!({"identificacao": "Dia A", "exercicios": [{"nome": "Agachamento"}]})
    }

    #[test]
    fn test_scalar_ingredients_become_a_list() {
        let raw = plan_with(
            squat_day(),
            serde_json::json!({
                "pre_treino": {"opcao_economica": {"nome": "Mingau", "ingredientes": "1 banana, aveia"}},
                "pos_treino": {"opcao_premium": {"nome": "Frango", "ingredientes": ["150g frango", 150]}}
            }),
        );
        let plan = process_completion(&raw).unwrap();
        assert_eq!(
            plan.nutrition.pre_workout["opcao_economica"].ingredients,
            vec!["1 banana, aveia"]
        );
        assert_eq!(
            plan.nutrition.post_workout["opcao_premium"].ingredients,
            vec!["150g frango", "150"]
        );
    }

    #[test]
    fn test_non_text_muscle_focus_is_kept_as_text() {
        let raw = plan_with(
            serde_json::json!({"identificacao": "Dia A", "foco_muscular": 1, "exercicios": [{"nome": "Remada"}]}),
            serde_json::json!({}),
        );
        let plan = process_completion(&raw).unwrap();
        assert_eq!(plan.days[0].muscle_focus.as_deref(), Some("1"));
    }

    #[test]
    fn test_non_object_entries_are_dropped_not_fatal() {
        let raw = plan_with(
            serde_json::json!({"identificacao": "Dia A", "exercicios": ["Supino", {"nome": "Remada"}]}),
            serde_json::json!({
                "pre_treino": {"opcao_economica": "Banana", "opcao_premium": {"nome": "Tapioca"}},
                "pos_treino": []
            }),
        );
        let plan = process_completion(&raw).unwrap();
        assert_eq!(plan.exercise_count(), 1);
        assert_eq!(plan.days[0].exercises[0].name, "Remada");
        assert_eq!(plan.meal_count(), 1);
        assert!(plan.nutrition.post_workout.is_empty());
    }

    #[test]
    fn test_day_without_any_exercise_object_is_incomplete() {
        let raw = plan_with(
            serde_json::json!({"identificacao": "Dia A", "exercicios": ["Supino"]}),
            serde_json::json!({}),
        );
        let err = process_completion(&raw).unwrap_err();
        assert!(matches!(err, PlanError::IncompleteResponse(_)));
    }

    #[test]
    fn test_user_messages_hide_detail() {
        let err = PlanError::MalformedResponse {
            line: 7,
            column: 12,
            message: "expected `,` or `}`".to_string(),
        };
        assert!(!err.user_message().contains('7'));
        assert!(!err.user_message().contains("expected"));
    }

    #[tokio::test]
    async fn test_generate_end_to_end() {
        let generator = generator_with(vec![Ok(VALID_COMPLETION.to_string())]);
        let plan = generator.generate(&reference_request()).await.unwrap();
        assert_eq!(plan.days.len(), 1);
        assert_eq!(plan.exercise_count(), 1);
    }

    #[tokio::test]
    async fn test_generate_surfaces_exhausted_rate_limit() {
        let generator = generator_with(vec![
            Err(ProviderError::new(Some(429), "quota")),
            Err(ProviderError::new(Some(429), "quota")),
            Err(ProviderError::new(Some(429), "quota")),
        ]);
        let err = generator.generate(&reference_request()).await.unwrap_err();
        assert!(matches!(err, PlanError::RateLimited(_)));
        assert_eq!(err.stage(), Stage::Requesting);
    }

    #[tokio::test]
    async fn test_schema_failure_is_not_retried() {
        let provider = ScriptedProvider::new(vec![
            Ok(r#"{"nome_da_rotina": "A", "dias_de_treino": [], "sugestoes_nutricionais": {}}"#
                .to_string()),
            Ok(VALID_COMPLETION.to_string()),
        ]);
        let (client, _, _) = scripted_client(provider.clone());
        let generator = PlanGenerator::new(client);

        let err = generator.generate(&reference_request()).await.unwrap_err();

        assert!(matches!(err, PlanError::IncompleteResponse(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_excerpt_is_capped_on_char_boundary() {
        let raw = "ç".repeat(600);
        assert_eq!(excerpt(&raw).chars().count(), RAW_EXCERPT_CHARS);
    }
}
