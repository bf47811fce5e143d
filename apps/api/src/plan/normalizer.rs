//! Plan Normalizer — field-level repair of a structurally valid plan.
//!
//! Runs only after `validator::validate_structure` succeeds. It visits every exercise
//! of every day and every meal of both timing buckets; a malformed field degrades to
//! its default instead of aborting the plan. Running it twice changes nothing the
//! second time.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::plan::models::{
    FIELD_EXERCISES, FIELD_NUTRITION, FIELD_TRAINING_DAYS, TIMING_POST_WORKOUT,
    TIMING_PRE_WORKOUT,
};

pub const DEFAULT_REST_SECONDS: u32 = 60;

const FIELD_REST: &str = "descanso_segundos";
const FIELD_VIDEO_URL: &str = "video_url";
const FIELD_RECIPE_URL: &str = "link_receita";
const FIELD_NAME: &str = "nome";

/// Localized phrase every synthesized search query starts with ("how to make/do").
const QUERY_PREFIX: &str = "como fazer";

static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.|m\.)?youtube\.com/results\?search_query=\S+$")
        .expect("video url pattern is valid")
});

static RECIPE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://(?:www\.)?google\.com/search\?q=\S+$")
        .expect("recipe url pattern is valid")
});

/// Where a synthesized search link points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget {
    /// Exercise demonstration videos.
    Video,
    /// Meal recipes.
    Recipe,
}

impl SearchTarget {
    fn base(&self) -> &'static str {
        match self {
            SearchTarget::Video => "https://www.youtube.com/results?search_query=",
            SearchTarget::Recipe => "https://www.google.com/search?q=",
        }
    }

    fn is_canonical(&self, url: &str) -> bool {
        match self {
            SearchTarget::Video => VIDEO_URL.is_match(url),
            SearchTarget::Recipe => RECIPE_URL.is_match(url),
        }
    }
}

/// Counts of what a normalization pass changed. All zero on an already-normal plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub exercises_visited: usize,
    pub meals_visited: usize,
    pub rest_coerced: usize,
    pub rest_defaulted: usize,
    pub links_synthesized: usize,
    pub links_replaced: usize,
    pub links_trimmed: usize,
    /// Exercises and meals that were not objects and were removed.
    pub entries_dropped: usize,
    /// Timing blocks that were not objects and were reset to empty.
    pub blocks_reset: usize,
}

impl NormalizationReport {
    pub fn changes(&self) -> usize {
        self.rest_coerced
            + self.rest_defaulted
            + self.links_synthesized
            + self.links_replaced
            + self.links_trimmed
            + self.entries_dropped
            + self.blocks_reset
    }
}

/// Builds the canonical search URL for `query` on `target`.
pub fn canonical_search_url(target: SearchTarget, query: &str) -> String {
    format!(
        "{}{}",
        target.base(),
        quote_plus(&format!("{QUERY_PREFIX} {}", query.trim()))
    )
}

/// Form-style escaping: unreserved characters kept, spaces as `+`, the rest percent-encoded.
fn quote_plus(text: &str) -> String {
    urlencoding::encode(text).replace("%20", "+")
}

/// Normalizes every exercise and meal of `plan` in place.
///
/// Entries that are not objects carry nothing to repair and are dropped with a warning;
/// a timing block that is not an object is reset to empty.
pub fn normalize_plan(plan: &mut Value) -> NormalizationReport {
    let mut report = NormalizationReport::default();

    if let Some(days) = plan.get_mut(FIELD_TRAINING_DAYS).and_then(Value::as_array_mut) {
        for (index, day) in days.iter_mut().enumerate() {
            let Some(exercises) = day.get_mut(FIELD_EXERCISES).and_then(Value::as_array_mut)
            else {
                continue;
            };
            let before = exercises.len();
            exercises.retain(Value::is_object);
            let dropped = before - exercises.len();
            if dropped > 0 {
                warn!("Training day {}: dropped {dropped} exercise(s) that were not objects", index + 1);
                report.entries_dropped += dropped;
            }
            for exercise in exercises.iter_mut().filter_map(Value::as_object_mut) {
                normalize_exercise(exercise, &mut report);
            }
        }
    }

    if let Some(nutrition) = plan.get_mut(FIELD_NUTRITION).and_then(Value::as_object_mut) {
        for timing in [TIMING_PRE_WORKOUT, TIMING_POST_WORKOUT] {
            let Some(block) = nutrition.get_mut(timing) else {
                continue;
            };
            if !block.is_object() {
                warn!("Nutrition block '{timing}' is not an object, reset to empty");
                *block = Value::Object(Map::new());
                report.blocks_reset += 1;
            }
            let Some(block) = block.as_object_mut() else {
                continue;
            };
            let before = block.len();
            block.retain(|_, meal| meal.is_object());
            let dropped = before - block.len();
            if dropped > 0 {
                warn!("Nutrition block '{timing}': dropped {dropped} meal(s) that were not objects");
                report.entries_dropped += dropped;
            }
            for (tier_key, meal) in block.iter_mut() {
                if let Some(meal) = meal.as_object_mut() {
                    normalize_meal(tier_key, meal, &mut report);
                }
            }
        }
    }

    report
}

fn normalize_exercise(exercise: &mut Map<String, Value>, report: &mut NormalizationReport) {
    report.exercises_visited += 1;

    match normalize_rest(exercise.get(FIELD_REST)) {
        RestOutcome::Unchanged => {}
        RestOutcome::Coerced(seconds) => {
            exercise.insert(FIELD_REST.to_string(), Value::from(seconds));
            report.rest_coerced += 1;
        }
        RestOutcome::Defaulted => {
            exercise.insert(FIELD_REST.to_string(), Value::from(DEFAULT_REST_SECONDS));
            report.rest_defaulted += 1;
        }
    }

    let name = exercise
        .get(FIELD_NAME)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    apply_link(exercise, FIELD_VIDEO_URL, SearchTarget::Video, &name, report);
}

fn normalize_meal(tier_key: &str, meal: &mut Map<String, Value>, report: &mut NormalizationReport) {
    report.meals_visited += 1;

    let query = meal
        .get(FIELD_NAME)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(tier_key)
        .to_string();
    apply_link(meal, FIELD_RECIPE_URL, SearchTarget::Recipe, &query, report);
}

#[derive(Debug, PartialEq, Eq)]
enum RestOutcome {
    Unchanged,
    Coerced(u32),
    Defaulted,
}

/// Integers that fit `u32` stay; digit-only strings become integers; anything else
/// (missing, negative, fractional, non-numeric text) becomes the default.
fn normalize_rest(value: Option<&Value>) -> RestOutcome {
    match value {
        Some(Value::Number(n)) if n.as_u64().is_some_and(|v| v <= u64::from(u32::MAX)) => {
            RestOutcome::Unchanged
        }
        Some(Value::String(s)) => {
            let digits = s.trim();
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
                digits
                    .parse::<u32>()
                    .map_or(RestOutcome::Defaulted, RestOutcome::Coerced)
            } else {
                RestOutcome::Defaulted
            }
        }
        _ => RestOutcome::Defaulted,
    }
}

fn apply_link(
    item: &mut Map<String, Value>,
    field: &str,
    target: SearchTarget,
    query: &str,
    report: &mut NormalizationReport,
) {
    let current = item.get(field).and_then(Value::as_str).map(|raw| (raw, raw.trim()));
    match current {
        Some((raw, url)) if target.is_canonical(url) => {
            if raw.len() != url.len() {
                let url = url.to_string();
                item.insert(field.to_string(), Value::String(url));
                report.links_trimmed += 1;
            }
            return;
        }
        Some((_, url)) if !url.is_empty() => report.links_replaced += 1,
        _ => report.links_synthesized += 1,
    }
    item.insert(
        field.to_string(),
        Value::String(canonical_search_url(target, query)),
    );
}
