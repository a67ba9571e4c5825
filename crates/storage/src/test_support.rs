//! Builders shared by the unit tests of this crate.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::dto::submission::{SubmittedResult, ValidatedSubmission};
use crate::models::ResultStatus;

fn result(viewer_id: &str, rank: i32, status: ResultStatus, time: Option<i64>) -> SubmittedResult {
    SubmittedResult {
        viewer_id: viewer_id.to_string(),
        viewer_login: Some(viewer_id.to_lowercase()),
        viewer_display_name: Some(viewer_id.to_string()),
        avatar_url: None,
        is_bot: false,
        finish_rank: rank,
        status,
        finish_time_ms: time,
        vehicle: None,
        distance: None,
        progress: None,
    }
}

pub fn finished(viewer_id: &str, rank: i32, time_ms: i64) -> SubmittedResult {
    result(viewer_id, rank, ResultStatus::Finished, Some(time_ms))
}

pub fn dnf(viewer_id: &str, rank: i32) -> SubmittedResult {
    result(viewer_id, rank, ResultStatus::Dnf, None)
}

pub fn bot(viewer_id: &str, rank: i32, time_ms: i64) -> SubmittedResult {
    SubmittedResult {
        is_bot: true,
        ..finished(viewer_id, rank, time_ms)
    }
}

pub fn submission(
    map_id: &str,
    map_version: i32,
    map_hash: Option<&str>,
    results: Vec<SubmittedResult>,
) -> ValidatedSubmission {
    let started_at = Utc::now();
    ValidatedSubmission {
        client_competition_id: Uuid::new_v4(),
        streamer_id: "1001".to_string(),
        streamer_login: "speedqueen".to_string(),
        streamer_display_name: "SpeedQueen".to_string(),
        map_id: map_id.to_string(),
        map_name: format!("Map {map_id}"),
        map_version: Some(map_version),
        map_hash: map_hash.map(str::to_string),
        vehicle_type: "kart".to_string(),
        started_at,
        ended_at: started_at + Duration::minutes(3),
        results,
    }
}
