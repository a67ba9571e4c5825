use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use storage::dto::submission::{SubmitCompetitionRequest, SubmitCompetitionResponse};
use validator::Validate;

use crate::error::WebError;
use crate::middleware::auth::AuthenticatedStreamer;
use crate::state::AppState;

use super::services;

#[utoipa::path(
    post,
    path = "/api/competitions",
    request_body = SubmitCompetitionRequest,
    responses(
        (
            status = 200,
            description = "Competition stored (created or updated)",
            body = SubmitCompetitionResponse
        ),
        (status = 400, description = "Invalid submission"),
        (status = 401, description = "Missing or invalid streamer API key"),
        (status = 403, description = "Key belongs to a different streamer"),
        (status = 503, description = "Statistics tables not initialized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "competitions"
)]
pub async fn submit_competition(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedStreamer>,
    payload: Result<Json<SubmitCompetitionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitCompetitionResponse>), WebError> {
    let Json(payload) = payload.map_err(|e| WebError::BadRequest(e.body_text()))?;
    payload.validate()?;
    let submission = payload
        .into_validated()
        .map_err(|msg| WebError::BadRequest(msg.to_string()))?;

    if submission.streamer_id != caller.streamer_id {
        tracing::warn!(
            caller = %caller.streamer_id,
            streamer_id = %submission.streamer_id,
            "Submission for another streamer rejected"
        );
        return Err(WebError::Forbidden(
            "Only the organizing streamer may submit this competition".to_string(),
        ));
    }

    let response = services::submit(&state, &submission).await?;

    Ok((StatusCode::OK, Json(response)))
}
