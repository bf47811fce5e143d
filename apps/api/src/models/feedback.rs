use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One like/dislike record as stored in `feedbacks`.
/// `tipo` and `item_nome` are nullable for rows written before item feedback existed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackRow {
    pub tipo: Option<String>,
    pub item_nome: Option<String>,
    pub gostou: bool,
}
