use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interest {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub is_custom: bool,
}
