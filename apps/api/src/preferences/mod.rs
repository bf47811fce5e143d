//! Preference Filter — turns a user's like/dislike history into prompt exclusions.
//!
//! Best-effort by construction: `load_preferences` never fails. A store that cannot be
//! reached yields empty lists and generation proceeds without personalization.
//! Disliked items feed `Exclusions`; liked items are kept for display and future ranking.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::plan::models::{Exclusions, MAX_EXCLUSIONS};

pub mod handlers;
pub mod store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Exercise,
    Meal,
}

impl ItemKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "exercicio" => Some(ItemKind::Exercise),
            "refeicao" => Some(ItemKind::Meal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackRecord {
    pub kind: ItemKind,
    pub name: String,
    pub liked: bool,
}

/// Read-only access to feedback history, in the order records were given.
///
/// Carried in `AppState` as `Arc<dyn FeedbackStore>`.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn feedback_for_user(&self, user_id: i64) -> Result<Vec<FeedbackRecord>>;
}

/// Liked and disliked names for one item kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreferenceLists {
    #[serde(rename = "gostou")]
    pub liked: Vec<String>,
    #[serde(rename = "nao_gostou")]
    pub disliked: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserPreferences {
    #[serde(rename = "exercicios")]
    pub exercises: PreferenceLists,
    #[serde(rename = "refeicoes")]
    pub meals: PreferenceLists,
}

impl UserPreferences {
    /// Aggregates records in order. Names are trimmed, blanks dropped, and a repeated
    /// name keeps only its first occurrence within its list.
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let mut preferences = UserPreferences::default();
        let mut seen: HashSet<(ItemKind, bool, &str)> = HashSet::new();

        for record in records {
            let name = record.name.trim();
            if name.is_empty() || !seen.insert((record.kind, record.liked, name)) {
                continue;
            }
            let lists = match record.kind {
                ItemKind::Exercise => &mut preferences.exercises,
                ItemKind::Meal => &mut preferences.meals,
            };
            let target = if record.liked {
                &mut lists.liked
            } else {
                &mut lists.disliked
            };
            target.push(name.to_string());
        }

        preferences
    }

    /// The first `MAX_EXCLUSIONS` disliked exercises and meals.
    pub fn exclusions(&self) -> Exclusions {
        Exclusions {
            exercises: first_n(&self.exercises.disliked),
            meals: first_n(&self.meals.disliked),
        }
    }
}

/// How many most-rejected names of each kind the stats report.
pub const TOP_REJECTED: usize = 5;

/// Aggregate feedback metrics for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedbackStats {
    #[serde(rename = "total_feedbacks")]
    pub total: usize,
    #[serde(rename = "total_positivos")]
    pub positive: usize,
    #[serde(rename = "total_negativos")]
    pub negative: usize,
    /// Percentage of positive feedback, rounded to 2 places. 0.0 with no feedback.
    #[serde(rename = "taxa_satisfacao")]
    pub satisfaction_rate: f64,
    #[serde(rename = "exercicios_mais_rejeitados")]
    pub most_rejected_exercises: Vec<String>,
    #[serde(rename = "refeicoes_mais_rejeitadas")]
    pub most_rejected_meals: Vec<String>,
}

impl FeedbackStats {
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let total = records.len();
        let positive = records.iter().filter(|r| r.liked).count();
        let satisfaction_rate = if total == 0 {
            0.0
        } else {
            let rate = positive as f64 / total as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        };

        FeedbackStats {
            total,
            positive,
            negative: total - positive,
            satisfaction_rate,
            most_rejected_exercises: most_rejected(records, ItemKind::Exercise),
            most_rejected_meals: most_rejected(records, ItemKind::Meal),
        }
    }
}

/// Disliked names of `kind` ranked by count; ties keep first-seen order.
fn most_rejected(records: &[FeedbackRecord], kind: ItemKind) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for record in records.iter().filter(|r| r.kind == kind && !r.liked) {
        let name = record.name.trim();
        if name.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(seen, _)| *seen == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }
    // Stable sort keeps store order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(TOP_REJECTED)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn first_n(names: &[String]) -> Vec<String> {
    names.iter().take(MAX_EXCLUSIONS).cloned().collect()
}

/// Loads and aggregates a user's preferences, degrading to empty lists on store failure.
pub async fn load_preferences(store: &dyn FeedbackStore, user_id: i64) -> UserPreferences {
    match store.feedback_for_user(user_id).await {
        Ok(records) => {
            let preferences = UserPreferences::from_records(&records);
            debug!(
                "Loaded {} feedback records for user {user_id}: {} disliked exercises, {} disliked meals",
                records.len(),
                preferences.exercises.disliked.len(),
                preferences.meals.disliked.len()
            );
            preferences
        }
        Err(e) => {
            warn!("Could not load feedback for user {user_id}, continuing without preferences: {e:#}");
            UserPreferences::default()
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Serves a fixed set of records, or fails every query.
    pub struct InMemoryFeedbackStore {
        pub records: Vec<(i64, FeedbackRecord)>,
        pub fail: bool,
    }

    #[async_trait]
    impl FeedbackStore for InMemoryFeedbackStore {
        async fn feedback_for_user(&self, user_id: i64) -> Result<Vec<FeedbackRecord>> {
            if self.fail {
                anyhow::bail!("connection refused");
            }
            Ok(self
                .records
                .iter()
                .filter(|(owner, _)| *owner == user_id)
                .map(|(_, record)| record.clone())
                .collect())
        }
    }

    pub fn record(kind: ItemKind, name: &str, liked: bool) -> FeedbackRecord {
        FeedbackRecord {
            kind,
            name: name.to_string(),
            liked,
        }
    }
}
