use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use storage::services::{BaselineOutcome, SkipReason, recompute_map_baseline};
use utoipa::ToSchema;

use crate::error::WebError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MapBaselineResponse {
    pub ok: bool,
    pub map_id: String,
    pub baseline: BaselineOutcome,
}

#[utoipa::path(
    post,
    path = "/api/admin/maps/{map_id}/baseline",
    params(
        ("map_id" = String, Path, description = "Map identifier")
    ),
    responses(
        (
            status = 200,
            description = "Recompute finished; `baseline` tells whether the value changed",
            body = MapBaselineResponse
        ),
        (status = 401, description = "Missing or invalid admin API key"),
        (status = 404, description = "Unknown map")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "admin"
)]
pub async fn recompute_baseline(
    State(state): State<AppState>,
    Path(map_id): Path<String>,
) -> Result<Json<MapBaselineResponse>, WebError> {
    let store = state.store()?;
    let baseline = recompute_map_baseline(store, &state.probe, &map_id).await?;

    if let BaselineOutcome::Skipped {
        reason: SkipReason::UnknownMap,
    } = baseline
    {
        return Err(WebError::NotFound(format!("Map '{}' does not exist", map_id)));
    }

    Ok(Json(MapBaselineResponse {
        ok: true,
        map_id,
        baseline,
    }))
}
