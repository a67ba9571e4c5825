use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StreamerSummary {
    pub streamer_id: String,
    pub streamer_login: String,
    pub streamer_display_name: String,
    pub competitions: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapSummary {
    pub map_id: String,
    pub map_name: String,
    pub competitions: i64,
}

/// Distinct streamers and maps with data, for populating filter controls.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MetadataResponse {
    pub ok: bool,
    pub streamers: Vec<StreamerSummary>,
    pub maps: Vec<MapSummary>,
}
