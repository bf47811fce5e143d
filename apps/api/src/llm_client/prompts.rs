// Shared prompt fragments.
// Each feature that needs LLM calls defines its own prompts.rs alongside it;
// this file only holds the JSON-output rules every prompt must carry.

/// Opening line that frames the model as a JSON-only backend.
pub const JSON_ONLY_PREAMBLE: &str =
    "Você é uma API de backend. Retorne APENAS um objeto JSON válido, sem texto antes ou depois.";

/// Formatting constraints targeting the malformations models emit most often:
/// single quotes, quoted integers, trailing commas and markdown fences.
pub const JSON_FORMAT_RULES: &str = "\
REGRAS CRÍTICAS DE JSON:
✓ Use aspas duplas APENAS
✓ TODAS as chaves e valores string com aspas duplas
✓ Números SEM aspas: \"descanso_segundos\": 60 (não \"60\")
✓ VERIFIQUE cada vírgula - não pode haver vírgula antes de } ou ]
✓ CADA valor string deve estar entre aspas: \"valor\"
✓ Arrays com [], Objects com {}
✓ Sem quebras de linha dentro de strings - usar espaços normais
✗ Não use blocos de código markdown (```)
✗ Não adicione NADA fora do JSON";

/// Closing line repeated at the end of the prompt.
pub const JSON_ONLY_CLOSING: &str = "COMECE COM { E TERMINE COM } - NADA MAIS!";
