//! Prompt Builder — renders a `GenerationRequest` into the plan generation prompt.
//!
//! Pure and deterministic: the same request always yields a byte-identical prompt.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::llm_client::prompts::{JSON_FORMAT_RULES, JSON_ONLY_CLOSING, JSON_ONLY_PREAMBLE};
use crate::plan::models::{Exclusions, GenerationRequest, MAX_EXCLUSIONS};
use crate::plan::prompts::{
    EXCLUSION_HEADER, EXERCISE_EXCLUSION_TEMPLATE, JSON_EXAMPLE, MEAL_EXCLUSION_TEMPLATE,
    PLAN_PROMPT_TEMPLATE,
};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Builds the full generation prompt for `request`, including its exclusion clause.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let imc = format!("{:.2}", request.bmi());
    let altura = request.height_cm.to_string();
    let peso = request.weight_kg.to_string();
    let idade = request.age.to_string();
    let frequencia = request.availability.to_string();
    let restricoes = exclusion_clause(&request.exclusions);

    render(
        PLAN_PROMPT_TEMPLATE,
        &[
            ("preamble", JSON_ONLY_PREAMBLE),
            ("nome", request.name.trim()),
            ("altura", &altura),
            ("peso", &peso),
            ("idade", &idade),
            ("imc", &imc),
            ("frequencia", &frequencia),
            ("local", request.location.description()),
            ("objetivo", request.goal.description()),
            ("restricoes", &restricoes),
            ("json_rules", JSON_FORMAT_RULES),
            ("json_example", JSON_EXAMPLE),
            ("closing", JSON_ONLY_CLOSING),
        ],
    )
}

/// Renders the "must not include" clause, or an empty string when nothing is excluded.
/// Only the first `MAX_EXCLUSIONS` names of each list are named.
pub fn exclusion_clause(exclusions: &Exclusions) -> String {
    let exercises = join_names(&exclusions.exercises);
    let meals = join_names(&exclusions.meals);
    if exercises.is_empty() && meals.is_empty() {
        return String::new();
    }

    let mut lines = vec![String::new(), EXCLUSION_HEADER.to_string()];
    if !exercises.is_empty() {
        lines.push(render(EXERCISE_EXCLUSION_TEMPLATE, &[("itens", &exercises)]));
    }
    if !meals.is_empty() {
        lines.push(render(MEAL_EXCLUSION_TEMPLATE, &[("itens", &meals)]));
    }
    lines.join("\n")
}

fn join_names(names: &[String]) -> String {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .take(MAX_EXCLUSIONS)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single-pass placeholder substitution. Substituted values are never rescanned,
/// so user-provided text containing `{...}` cannot inject other placeholders.
/// Unknown placeholders are left as-is.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::models::{Goal, TrainingLocation};

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

    #[test]
    fn test_prompt_embeds_derived_values() {
        let prompt = build_prompt(&reference_request());
        assert!(prompt.contains("IMC: 26.12"), "{prompt}");
        assert!(prompt.contains("Frequência: 3"));
        assert!(prompt.contains("Local: Academia"));
        assert!(prompt.contains("Objetivo: Hipertrofia muscular"));
        assert!(prompt.contains("Altura: 175 cm"));
        assert!(prompt.contains("Nome: João Silva"));
        assert!(prompt.contains("Gerar 3 dias de treino"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let request = reference_request();
        assert_eq!(build_prompt(&request), build_prompt(&request));
    }

    #[test]
    fn test_prompt_carries_format_rules_and_exemplar() {
        let prompt = build_prompt(&reference_request());
        assert!(prompt.starts_with(JSON_ONLY_PREAMBLE));
        assert!(prompt.contains(JSON_FORMAT_RULES));
        assert!(prompt.contains("\"dias_de_treino\": ["));
        assert!(prompt.trim_end().ends_with(JSON_ONLY_CLOSING));
        assert!(!PLACEHOLDER.is_match(&prompt), "unrendered placeholder left in prompt");
    }

    #[test]
    fn test_prompt_without_exclusions_has_no_forbidding_clause() {
        let prompt = build_prompt(&reference_request());
        assert!(!prompt.contains("JAMAIS"));
        assert!(!prompt.contains(EXCLUSION_HEADER));
    }

    #[test]
    fn test_excluded_exercise_is_forbidden_by_name() {
        let mut request = reference_request();
        request.exclusions.exercises = vec!["Supino Reto".to_string()];
        let prompt = build_prompt(&request);
        assert!(prompt.contains("JAMAIS os inclua: Supino Reto."), "{prompt}");
        assert!(prompt.contains("mesmo grupo muscular"));
        assert!(!prompt.contains("JAMAIS as inclua"));
    }

    #[test]
    fn test_excluded_meals_get_macro_substitution_instruction() {
        let mut request = reference_request();
        request.exclusions.meals = vec!["Frango Grelhado".to_string(), "Peixe".to_string()];
        let prompt = build_prompt(&request);
        assert!(prompt.contains("JAMAIS as inclua: Frango Grelhado, Peixe."));
        assert!(prompt.contains("macronutrientes"));
    }

    #[test]
    fn test_exclusions_are_capped_at_ten_in_order() {
        let names: Vec<String> = (1..=15).map(|i| format!("Exercicio {i}")).collect();
        let clause = exclusion_clause(&Exclusions {
            exercises: names,
            meals: vec![],
        });
        assert!(clause.contains("Exercicio 1, "));
        assert!(clause.contains("Exercicio 10."));
        assert!(!clause.contains("Exercicio 11"));
    }

    #[test]
    fn test_blank_exclusion_names_are_ignored() {
        let clause = exclusion_clause(&Exclusions {
            exercises: vec!["  ".to_string()],
            meals: vec![],
        });
        assert!(clause.is_empty());
    }

    #[test]
    fn test_unknown_codes_render_verbatim() {
        let mut request = reference_request();
        request.location = TrainingLocation::Other("praia".to_string());
        request.goal = Goal::Other("maratona".to_string());
        let prompt = build_prompt(&request);
        assert!(prompt.contains("Local: praia"));
        assert!(prompt.contains("Objetivo: maratona"));
    }

    #[test]
    fn test_user_text_cannot_inject_placeholders() {
        let mut request = reference_request();
        request.name = "Ana {imc}".to_string();
        let prompt = build_prompt(&request);
        assert!(prompt.contains("Nome: Ana {imc}"));
    }
}
