use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One completed race, keyed for idempotent resubmission by `client_competition_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Competition {
    pub competition_id: Uuid,
    pub client_competition_id: Uuid,
    pub streamer_id: String,
    pub streamer_login: String,
    pub streamer_display_name: String,
    pub season_id: Option<String>,
    pub map_id: String,
    pub map_name: String,
    pub map_version: Option<i32>,
    pub map_hash: Option<String>,
    pub vehicle_type: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub winner_viewer_id: Option<String>,
    pub winner_display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
