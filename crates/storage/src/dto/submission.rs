use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::ResultStatus;
use crate::services::map_baseline::BaselineOutcome;

pub const MAX_RESULTS_PER_SUBMISSION: usize = 600;

/// Version assumed for maps submitted without one.
pub const DEFAULT_MAP_VERSION: i32 = 1;

/// Viewer ids with this prefix are synthetic participants.
pub const BOT_ID_PREFIX: &str = "bot:";

/// Request payload for submitting one finished competition with its results
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCompetitionRequest {
    /// Client-generated id; resubmitting the same id updates in place
    pub competition_uuid: Option<Uuid>,

    #[validate(length(min = 1, max = 64, message = "streamerId is required"))]
    pub streamer_id: String,

    #[validate(length(min = 1, max = 64))]
    pub streamer_login: String,

    #[validate(length(min = 1, max = 255))]
    pub streamer_display_name: String,

    #[validate(length(min = 1, max = 128, message = "mapId is required"))]
    pub map_id: String,

    #[validate(length(min = 1, max = 255))]
    pub map_name: String,

    #[validate(range(min = 1))]
    pub map_version: Option<i32>,

    #[validate(length(max = 128))]
    pub map_hash: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub vehicle_type: String,

    pub started_at: Option<DateTime<Utc>>,

    pub ended_at: Option<DateTime<Utc>>,

    #[validate(length(max = 600, message = "At most 600 results per competition"), nested)]
    #[serde(default)]
    pub results: Vec<SubmittedResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResult {
    #[validate(length(min = 1, max = 64, message = "viewerId is required"))]
    pub viewer_id: String,

    #[validate(length(max = 64))]
    pub viewer_login: Option<String>,

    #[validate(length(max = 255))]
    pub viewer_display_name: Option<String>,

    #[validate(url, length(max = 500))]
    pub avatar_url: Option<String>,

    #[serde(default)]
    pub is_bot: bool,

    #[validate(range(min = 1, message = "finishRank must be >= 1"))]
    pub finish_rank: i32,

    pub status: ResultStatus,

    #[validate(range(min = 0))]
    pub finish_time_ms: Option<i64>,

    #[validate(length(max = 64))]
    pub vehicle: Option<String>,

    pub distance: Option<f64>,

    pub progress: Option<f64>,
}

impl SubmittedResult {
    pub fn is_bot(&self) -> bool {
        self.is_bot || self.viewer_id.starts_with(BOT_ID_PREFIX)
    }

    pub fn login(&self) -> &str {
        self.viewer_login.as_deref().unwrap_or(&self.viewer_id)
    }

    pub fn display_name(&self) -> &str {
        self.viewer_display_name.as_deref().unwrap_or(self.login())
    }

    /// Finish time is only meaningful for finished results.
    pub fn effective_finish_time_ms(&self) -> Option<i64> {
        match self.status {
            ResultStatus::Finished => self.finish_time_ms,
            ResultStatus::Dnf => None,
        }
    }
}

/// A submission whose required fields are present and mutually consistent.
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub client_competition_id: Uuid,
    pub streamer_id: String,
    pub streamer_login: String,
    pub streamer_display_name: String,
    pub map_id: String,
    pub map_name: String,
    pub map_version: Option<i32>,
    pub map_hash: Option<String>,
    pub vehicle_type: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub results: Vec<SubmittedResult>,
}

impl SubmitCompetitionRequest {
    /// Checks that need more than one field. Runs after `validate()`.
    pub fn into_validated(self) -> Result<ValidatedSubmission, &'static str> {
        let client_competition_id = self
            .competition_uuid
            .ok_or("competitionUuid is required")?;
        let started_at = self.started_at.ok_or("startedAt is required")?;
        let ended_at = self.ended_at.ok_or("endedAt is required")?;

        if ended_at < started_at {
            return Err("endedAt must be on or after startedAt");
        }

        if self.results.len() > MAX_RESULTS_PER_SUBMISSION {
            return Err("At most 600 results per competition");
        }

        let mut seen = HashSet::with_capacity(self.results.len());
        if !self.results.iter().all(|r| seen.insert(r.viewer_id.as_str())) {
            return Err("Each viewer may appear only once per competition");
        }

        Ok(ValidatedSubmission {
            client_competition_id,
            streamer_id: self.streamer_id,
            streamer_login: self.streamer_login,
            streamer_display_name: self.streamer_display_name,
            map_id: self.map_id,
            map_name: self.map_name,
            map_version: self.map_version,
            map_hash: self.map_hash.filter(|h| !h.trim().is_empty()),
            vehicle_type: self.vehicle_type,
            started_at,
            ended_at,
            results: self.results,
        })
    }
}

impl ValidatedSubmission {
    pub fn effective_map_version(&self) -> i32 {
        self.map_version.unwrap_or(DEFAULT_MAP_VERSION)
    }

    /// First finisher ranked 1, in submission order.
    pub fn winner(&self) -> Option<&SubmittedResult> {
        self.results
            .iter()
            .find(|r| r.status == ResultStatus::Finished && r.finish_rank == 1)
    }

    pub fn human_viewer_ids(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| !r.is_bot())
            .map(|r| r.viewer_id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCompetitionResponse {
    pub ok: bool,
    pub competition_id: Uuid,
    pub season_id: Option<String>,
    pub result_count: usize,
    pub baseline: BaselineOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn result(viewer_id: &str, rank: i32, status: ResultStatus) -> SubmittedResult {
        SubmittedResult {
            viewer_id: viewer_id.to_string(),
            viewer_login: None,
            viewer_display_name: None,
            avatar_url: None,
            is_bot: false,
            finish_rank: rank,
            status,
            finish_time_ms: Some(10_000),
            vehicle: None,
            distance: None,
            progress: None,
        }
    }

    fn request() -> SubmitCompetitionRequest {
        let started = Utc::now();
        SubmitCompetitionRequest {
            competition_uuid: Some(Uuid::new_v4()),
            streamer_id: "1001".to_string(),
            streamer_login: "speedqueen".to_string(),
            streamer_display_name: "SpeedQueen".to_string(),
            map_id: "harbor".to_string(),
            map_name: "Harbor Run".to_string(),
            map_version: Some(2),
            map_hash: Some(" ".to_string()),
            vehicle_type: "kart".to_string(),
            started_at: Some(started),
            ended_at: Some(started + Duration::minutes(3)),
            results: vec![
                result("7", 2, ResultStatus::Finished),
                result("8", 1, ResultStatus::Dnf),
                result("9", 1, ResultStatus::Finished),
                result("bot:3", 3, ResultStatus::Finished),
            ],
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let req = request();
        assert!(req.validate().is_ok());
        let submission = req.into_validated().unwrap();
        assert_eq!(submission.map_hash, None);
        assert_eq!(submission.winner().map(|r| r.viewer_id.as_str()), Some("9"));
        assert_eq!(submission.human_viewer_ids(), vec!["7", "8", "9"]);
    }

    #[test]
    fn test_missing_uuid_is_rejected() {
        let req = SubmitCompetitionRequest {
            competition_uuid: None,
            ..request()
        };
        assert_eq!(req.into_validated().unwrap_err(), "competitionUuid is required");
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let mut req = request();
        req.ended_at = req.started_at.map(|s| s - Duration::seconds(1));
        assert_eq!(
            req.into_validated().unwrap_err(),
            "endedAt must be on or after startedAt"
        );
    }

    #[test]
    fn test_duplicate_viewer_is_rejected() {
        let mut req = request();
        req.results.push(result("7", 4, ResultStatus::Dnf));
        assert!(req.into_validated().is_err());
    }

    #[test]
    fn test_too_many_results_fail_validation() {
        let mut req = request();
        req.results = (0..601)
            .map(|i| result(&i.to_string(), i + 1, ResultStatus::Finished))
            .collect();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_rank_zero_fails_validation() {
        let mut req = request();
        req.results[0].finish_rank = 0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_dnf_time_is_ignored() {
        let dnf = result("8", 5, ResultStatus::Dnf);
        assert_eq!(dnf.effective_finish_time_ms(), None);
        assert_eq!(dnf.display_name(), "8");
    }
}
