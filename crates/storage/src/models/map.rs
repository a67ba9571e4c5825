use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Map {
    pub map_id: String,
    pub map_name: String,
    pub version: i32,
    pub content_hash: Option<String>,
    /// Derived expected finish time; absent until the first usable recompute.
    pub expected_time_ms: Option<i64>,
}
