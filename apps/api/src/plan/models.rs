//! Data model for plan generation: the request that drives a prompt and the
//! plan that comes back out of the pipeline.
//!
//! Field names on the wire are Portuguese (`nome_da_rotina`, `dias_de_treino`, ...)
//! because that is the contract the model is prompted with and the shape API
//! consumers receive.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const FIELD_ROUTINE_NAME: &str = "nome_da_rotina";
pub const FIELD_TRAINING_DAYS: &str = "dias_de_treino";
pub const FIELD_NUTRITION: &str = "sugestoes_nutricionais";
pub const FIELD_EXERCISES: &str = "exercicios";
pub const TIMING_PRE_WORKOUT: &str = "pre_treino";
pub const TIMING_POST_WORKOUT: &str = "pos_treino";

/// At most this many exercise names and this many meal names are excluded per prompt.
pub const MAX_EXCLUSIONS: usize = 10;

// ────────────────────────────────────────────────────────────────────────────
// Request side
// ────────────────────────────────────────────────────────────────────────────

/// Where the user trains. Unknown codes are kept verbatim so the prompt can
/// still render them; `GenerationRequest::validate` is what rejects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrainingLocation {
    Gym,
    Home,
    Outdoor,
    Other(String),
}

impl TrainingLocation {
    pub fn code(&self) -> &str {
        match self {
            TrainingLocation::Gym => "academia",
            TrainingLocation::Home => "casa",
            TrainingLocation::Outdoor => "arLivre",
            TrainingLocation::Other(code) => code,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            TrainingLocation::Gym => "Academia",
            TrainingLocation::Home => "Em casa",
            TrainingLocation::Outdoor => "Ao ar livre",
            TrainingLocation::Other(code) => code,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TrainingLocation::Other(_))
    }
}

impl From<String> for TrainingLocation {
    fn from(code: String) -> Self {
        match code.as_str() {
            "academia" => TrainingLocation::Gym,
            "casa" => TrainingLocation::Home,
            "arLivre" => TrainingLocation::Outdoor,
            _ => TrainingLocation::Other(code),
        }
    }
}

impl From<TrainingLocation> for String {
    fn from(location: TrainingLocation) -> Self {
        location.code().to_string()
    }
}

/// What the user wants out of the plan. Same fail-open treatment as `TrainingLocation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Goal {
    LoseWeight,
    GainWeight,
    Hypertrophy,
    Definition,
    Other(String),
}

impl Goal {
    pub fn code(&self) -> &str {
        match self {
            Goal::LoseWeight => "perder",
            Goal::GainWeight => "ganhar",
            Goal::Hypertrophy => "hipertrofia",
            Goal::Definition => "definicao",
            Goal::Other(code) => code,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Goal::LoseWeight => "Perder peso",
            Goal::GainWeight => "Ganhar peso",
            Goal::Hypertrophy => "Hipertrofia muscular",
            Goal::Definition => "Definição muscular",
            Goal::Other(code) => code,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Goal::Other(_))
    }
}

impl From<String> for Goal {
    fn from(code: String) -> Self {
        match code.as_str() {
            "perder" => Goal::LoseWeight,
            "ganhar" => Goal::GainWeight,
            "hipertrofia" => Goal::Hypertrophy,
            "definicao" => Goal::Definition,
            _ => Goal::Other(code),
        }
    }
}

impl From<Goal> for String {
    fn from(goal: Goal) -> Self {
        goal.code().to_string()
    }
}

/// Item names the generator must not reuse, sourced from negative feedback.
/// Order matters: when more than `MAX_EXCLUSIONS` exist, the first ones win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub exercises: Vec<String>,
    #[serde(default)]
    pub meals: Vec<String>,
}

impl Exclusions {
    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty() && self.meals.is_empty()
    }
}

/// Immutable input to one plan generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(rename = "nome")]
    pub name: String,
    /// Centimetres.
    #[serde(rename = "altura")]
    pub height_cm: f64,
    /// Kilograms.
    #[serde(rename = "peso")]
    pub weight_kg: f64,
    #[serde(rename = "idade")]
    pub age: u32,
    /// Training days per week.
    #[serde(rename = "disponibilidade")]
    pub availability: u32,
    #[serde(rename = "local")]
    pub location: TrainingLocation,
    #[serde(rename = "objetivo")]
    pub goal: Goal,
    #[serde(default, skip_serializing_if = "Exclusions::is_empty")]
    pub exclusions: Exclusions,
}

#[derive(Debug, Error, PartialEq)]
pub enum RequestError {
    #[error("name must have between 2 and 100 characters")]
    Name,
    #[error("height must be between 50 and 300 cm, got {0}")]
    Height(f64),
    #[error("weight must be between 20 and 500 kg, got {0}")]
    Weight(f64),
    #[error("age must be between 11 and 110, got {0}")]
    Age(u32),
    #[error("availability must be between 1 and 7 days per week, got {0}")]
    Availability(u32),
    #[error("unknown training location '{0}' (expected academia, casa or arLivre)")]
    Location(String),
    #[error("unknown goal '{0}' (expected perder, ganhar, hipertrofia or definicao)")]
    Goal(String),
}

impl GenerationRequest {
    /// Checks the input invariants, reporting the first violation.
    pub fn validate(&self) -> Result<(), RequestError> {
        let name_len = self.name.trim().chars().count();
        if !(2..=100).contains(&name_len) {
            return Err(RequestError::Name);
        }
        if !(self.height_cm > 50.0 && self.height_cm < 300.0) {
            return Err(RequestError::Height(self.height_cm));
        }
        if !(self.weight_kg > 20.0 && self.weight_kg < 500.0) {
            return Err(RequestError::Weight(self.weight_kg));
        }
        if !(11..=110).contains(&self.age) {
            return Err(RequestError::Age(self.age));
        }
        if !(1..=7).contains(&self.availability) {
            return Err(RequestError::Availability(self.availability));
        }
        if !self.location.is_known() {
            return Err(RequestError::Location(self.location.code().to_string()));
        }
        if !self.goal.is_known() {
            return Err(RequestError::Goal(self.goal.code().to_string()));
        }
        Ok(())
    }

    /// Body mass index: weight / height_m².
    pub fn bmi(&self) -> f64 {
        let height_m = self.height_cm / 100.0;
        self.weight_kg / (height_m * height_m)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Plan side
// ────────────────────────────────────────────────────────────────────────────

/// A fully validated and normalized plan. Only the pipeline constructs these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    #[serde(rename = "nome_da_rotina", deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(rename = "dias_de_treino")]
    pub days: Vec<TrainingDay>,
    #[serde(rename = "sugestoes_nutricionais")]
    pub nutrition: NutritionSuggestionSet,
}

impl TrainingPlan {
    pub fn exercise_count(&self) -> usize {
        self.days.iter().map(|d| d.exercises.len()).sum()
    }

    pub fn meal_count(&self) -> usize {
        self.nutrition.pre_workout.len() + self.nutrition.post_workout.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDay {
    #[serde(rename = "identificacao", default, deserialize_with = "lenient_text")]
    pub label: String,
    #[serde(rename = "foco_muscular", default, deserialize_with = "lenient_optional_text")]
    pub muscle_focus: Option<String>,
    #[serde(rename = "exercicios")]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(rename = "nome", default, deserialize_with = "lenient_text")]
    pub name: String,
    /// Free text, e.g. "4x".
    #[serde(rename = "series", default, deserialize_with = "lenient_text")]
    pub sets: String,
    /// Free text, e.g. "8-12".
    #[serde(rename = "repeticoes", default, deserialize_with = "lenient_text")]
    pub reps: String,
    #[serde(rename = "descanso_segundos")]
    pub rest_seconds: u32,
    #[serde(rename = "detalhes_execucao", default, deserialize_with = "lenient_text")]
    pub notes: String,
    pub video_url: String,
}

/// Meal suggestions keyed by cost tier (`opcao_economica`, `opcao_equilibrada`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionSuggestionSet {
    #[serde(rename = "pre_treino", default)]
    pub pre_workout: BTreeMap<String, Meal>,
    #[serde(rename = "pos_treino", default)]
    pub post_workout: BTreeMap<String, Meal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    #[serde(rename = "nome", default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(rename = "custo_estimado", default, deserialize_with = "lenient_text")]
    pub estimated_cost: String,
    #[serde(rename = "ingredientes", default, deserialize_with = "lenient_list")]
    pub ingredients: Vec<String>,
    #[serde(rename = "link_receita")]
    pub recipe_url: String,
    #[serde(rename = "explicacao", default, deserialize_with = "lenient_text")]
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostTier {
    Economy,
    Balanced,
    Premium,
}

impl CostTier {
    /// Classifies a nutrition bucket key. Returns `None` for keys the model invented.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "opcao_economica" | "economica" => Some(CostTier::Economy),
            "opcao_equilibrada" | "equilibrada" => Some(CostTier::Balanced),
            "opcao_premium" | "premium" => Some(CostTier::Premium),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CostTier::Economy => "economica",
            CostTier::Balanced => "equilibrada",
            CostTier::Premium => "premium",
        }
    }
}

/// Free-text fields accept any JSON value. Models routinely emit `"series": 4` or
/// `"foco": null` where text is expected; lists are joined, objects read as empty.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text_of(Value::deserialize(deserializer)?))
}

/// Optional text: null and blank both read as absent.
fn lenient_optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = text_of(Value::deserialize(deserializer)?);
    Ok(Some(text).filter(|t| !t.trim().is_empty()))
}

/// Text lists accept a single scalar (`"ingredientes": "1 banana"`) as a one-item list.
/// Items that carry no text are skipped.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        other => vec![other],
    };
    Ok(items
        .into_iter()
        .filter_map(scalar_text)
        .filter(|t| !t.trim().is_empty())
        .collect())
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn text_of(value: Value) -> String {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(scalar_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => scalar_text(other).unwrap_or_default(),
    }
}
