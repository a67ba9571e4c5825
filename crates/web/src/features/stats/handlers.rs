use axum::{
    extract::{OriginalUri, Query, State, rejection::QueryRejection},
    http::HeaderMap,
    response::Response,
};
use storage::{
    dto::{
        leaderboard::{LeaderboardParams, LeaderboardResponse},
        metadata::MetadataResponse,
    },
    services::{list_metadata, query_leaderboard},
};

use crate::cache::{CacheKey, CacheStatus, CachedResponse};
use crate::error::WebError;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/stats/viewers",
    params(LeaderboardParams),
    responses(
        (
            status = 200,
            description = "One page of per-viewer statistics",
            body = LeaderboardResponse
        ),
        (status = 400, description = "Malformed query string"),
        (status = 500, description = "Store not configured or query failed"),
        (status = 503, description = "Statistics tables not initialized")
    ),
    tag = "stats"
)]
pub async fn get_viewer_stats(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    params: Result<Query<LeaderboardParams>, QueryRejection>,
) -> Result<Response, WebError> {
    let key = CacheKey::from_request(&headers, &uri);
    if let Some(hit) = state.cache.get(&key).await {
        return Ok(hit.into_response(CacheStatus::Hit));
    }

    let Query(params) = params.map_err(|e| WebError::BadRequest(e.body_text()))?;
    let store = state.store()?;
    let query = params.into_query();

    let leaderboard = query_leaderboard(store, &state.probe, &query).await?;

    let cached = CachedResponse::json(&leaderboard, state.cache_ttl.leaderboard)
        .map_err(|e| WebError::InternalServerError(e.to_string()))?;
    state.cache.insert(key, cached.clone()).await;

    Ok(cached.into_response(CacheStatus::Miss))
}

#[utoipa::path(
    get,
    path = "/api/stats/meta",
    responses(
        (
            status = 200,
            description = "Streamers and maps that have competitions",
            body = MetadataResponse
        ),
        (status = 500, description = "Store not configured or query failed"),
        (status = 503, description = "Statistics tables not initialized")
    ),
    tag = "stats"
)]
pub async fn get_metadata(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    let key = CacheKey::from_request(&headers, &uri);
    if let Some(hit) = state.cache.get(&key).await {
        return Ok(hit.into_response(CacheStatus::Hit));
    }

    let store = state.store()?;
    let metadata = list_metadata(store).await?;

    let cached = CachedResponse::json(&metadata, state.cache_ttl.metadata)
        .map_err(|e| WebError::InternalServerError(e.to_string()))?;
    state.cache.insert(key, cached.clone()).await;

    Ok(cached.into_response(CacheStatus::Miss))
}
