//! Response Sanitizer — syntactic recovery of JSON from raw completion text.
//!
//! Steps, in order:
//! 1. trim surrounding whitespace
//! 2. strip a leading ``` fence (with or without a language tag) and a trailing fence
//! 3. slice from the first `{` to the last `}` inclusive, dropping surrounding prose
//! 4. remove commas that directly precede a closing `}` or `]`
//!
//! No semantic checks happen here. Step 4 is a regex patch, not a parser: a comma
//! followed by `}` inside a string literal is also removed. That trade-off is kept
//! on purpose rather than growing this into a permissive JSON parser.

use once_cell::sync::Lazy;
use regex::Regex;

/// One or more commas (with any whitespace) right before a closing bracket.
static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",(?:\s*,)*\s*([}\]])").expect("trailing comma pattern is valid"));

/// Language tag after an opening fence, e.g. `json`, `JSON`, `json5`.
static FENCE_LANGUAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_+-]*").expect("fence language pattern is valid"));

const FENCE: &str = "```";

/// Runs all sanitization steps. Idempotent: sanitizing the output again is a no-op.
pub fn sanitize(raw: &str) -> String {
    let text = strip_json_fences(raw);
    let text = extract_object(text);
    remove_trailing_commas(text)
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let mut text = text.trim();
    if let Some(stripped) = text.strip_prefix(FENCE) {
        let tag_len = FENCE_LANGUAGE.find(stripped).map_or(0, |m| m.end());
        text = stripped[tag_len..].trim_start();
    }
    if let Some(stripped) = text.strip_suffix(FENCE) {
        text = stripped.trim_end();
    }
    text
}

/// Returns the slice from the first `{` to the last `}` inclusive.
/// Text without such a pair is returned unchanged; parsing will reject it.
pub fn extract_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

pub fn remove_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN_BODY: &str = "{\"nome_da_rotina\": \"Plano ABC\", \"dias_de_treino\": []}";

    #[test]
    fn test_fence_tags_are_stripped_case_insensitively() {
        for tag in ["json", "JSON", "json5", "Json"] {
            let raw = format!("```{tag}\n{PLAN_BODY}\n```");
            assert_eq!(strip_json_fences(&raw), PLAN_BODY, "tag {tag}");
        }
    }

    #[test]
    fn test_untagged_fence_around_plan() {
        let raw = format!("\n```\n{PLAN_BODY}\n```\n");
        assert_eq!(strip_json_fences(&raw), PLAN_BODY);
    }

    #[test]
    fn test_unfenced_plan_is_only_trimmed() {
        let raw = format!("  {PLAN_BODY}\n");
        assert_eq!(strip_json_fences(&raw), PLAN_BODY);
    }

    #[test]
    fn test_fence_without_closing_marker() {
        let raw = format!("```JSON\n{PLAN_BODY}");
        assert_eq!(strip_json_fences(&raw), PLAN_BODY);
    }

    #[test]
    fn test_fenced_plan_inside_prose_is_recovered() {
        let raw = format!("Aqui está seu plano:\n```json5\n{PLAN_BODY}\n```\nBons treinos!");
        let parsed: serde_json::Value = serde_json::from_str(&sanitize(&raw)).unwrap();
        assert_eq!(parsed["nome_da_rotina"], "Plano ABC");
    }

    #[test]
    fn test_extract_object_drops_surrounding_prose() {
        let input = "Claro! Aqui está o seu plano:\n{\"a\": {\"b\": 1}}\nBons treinos!";
        assert_eq!(extract_object(input), "{\"a\": {\"b\": 1}}");
    }

    #[test]
    fn test_extract_object_without_braces_is_unchanged() {
        assert_eq!(extract_object("sem json aqui"), "sem json aqui");
        assert_eq!(extract_object("} invertido {"), "} invertido {");
    }

    #[test]
    fn test_trailing_commas_removed_before_closers() {
        assert_eq!(remove_trailing_commas("{\"a\": 1,}"), "{\"a\": 1}");
        assert_eq!(remove_trailing_commas("[1, 2,\n  ]"), "[1, 2]");
        assert_eq!(remove_trailing_commas("[1, 2, , ]"), "[1, 2]");
        assert_eq!(remove_trailing_commas("{\"a\": [1, 2]}"), "{\"a\": [1, 2]}");
    }

    #[test]
    fn test_fenced_response_with_trailing_comma_parses() {
        let raw = "```json\n{\n  \"nome_da_rotina\": \"Plano\",\n  \"dias_de_treino\": [\n    {\"identificacao\": \"Dia A\",},\n  ],\n}\n```";
        let sanitized = sanitize(raw);
        let parsed: serde_json::Value = serde_json::from_str(&sanitized).unwrap();
        let expected = serde_json::json!({
            "nome_da_rotina": "Plano",
            "dias_de_treino": [{"identificacao": "Dia A"}]
        });
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "```json\n{\"a\": [1, 2,],}\n```",
            "Segue o JSON: {\"a\": {\"b\": [1,,]}} obrigado",
            "{\"a\": 1}",
            "nada de json",
            "",
            "```\n```",
        ];
        for sample in samples {
            let once = sanitize(sample);
            let twice = sanitize(&once);
            assert_eq!(once, twice, "sanitize not idempotent for {sample:?}");
        }
    }
}
