use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::feedback::FeedbackRow;
use crate::preferences::{FeedbackRecord, FeedbackStore, ItemKind};

/// Reads feedback history from PostgreSQL. Read-only.
pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn feedback_for_user(&self, user_id: i64) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query_as::<_, FeedbackRow>(
            r#"
            SELECT tipo, item_nome, gostou
            FROM feedbacks
            WHERE usuario_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(record_from_row).collect())
    }
}

/// Rows without a recognised kind or a name carry nothing to aggregate.
fn record_from_row(row: FeedbackRow) -> Option<FeedbackRecord> {
    let kind = ItemKind::from_code(row.tipo.as_deref()?)?;
    let name = row.item_nome?;
    Some(FeedbackRecord {
        kind,
        name,
        liked: row.gostou,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(tipo: Option<&str>, item_nome: Option<&str>, gostou: bool) -> FeedbackRow {
        FeedbackRow {
            tipo: tipo.map(str::to_string),
            item_nome: item_nome.map(str::to_string),
            gostou,
        }
    }

    #[test]
    fn test_record_from_row_maps_known_kinds() {
        let record = record_from_row(row(Some("refeicao"), Some("Peixe"), false)).unwrap();
        assert_eq!(record.kind, ItemKind::Meal);
        assert_eq!(record.name, "Peixe");
        assert!(!record.liked);
    }

    #[test]
    fn test_record_from_row_skips_legacy_and_unknown_rows() {
        assert!(record_from_row(row(None, Some("Supino"), true)).is_none());
        assert!(record_from_row(row(Some("exercicio"), None, true)).is_none());
        assert!(record_from_row(row(Some("treino"), Some("Dia A"), true)).is_none());
    }
}
