use chrono::Utc;
use storage::dto::submission::{SubmitCompetitionRequest, ValidatedSubmission};
use storage::models::ResultStatus;
use tracing::warn;
use validator::Validate;

use crate::{ImporterError, Result};

/// Applies the submission rules of the HTTP interface to an offline file,
/// plus warnings for data that is accepted but probably wrong.
pub struct SubmissionValidator;

impl SubmissionValidator {
    pub fn validate(
        request: SubmitCompetitionRequest,
    ) -> Result<(ValidatedSubmission, ValidationReport)> {
        let mut report = ValidationReport::default();

        if let Err(errors) = request.validate() {
            report.errors.push(errors.to_string());
        }

        let submission = match request.into_validated() {
            Ok(submission) => Some(submission),
            Err(msg) => {
                report.errors.push(msg.to_string());
                None
            }
        };

        let Some(submission) = submission.filter(|_| report.errors.is_empty()) else {
            return Err(ImporterError::ValidationError(format!(
                "Validation failed with {} error(s): {}",
                report.errors.len(),
                report.errors.join("; ")
            )));
        };

        if submission.results.is_empty() {
            report
                .warnings
                .push("Competition has no results".to_string());
        } else if submission.winner().is_none() {
            report
                .warnings
                .push("No FINISHED result with rank 1; winner will be unset".to_string());
        }

        if submission.started_at > Utc::now() {
            report
                .warnings
                .push(format!("startedAt {} is in the future", submission.started_at));
        }

        if submission.map_version.is_none() {
            report
                .warnings
                .push("mapVersion is not specified; version 1 is assumed".to_string());
        }

        for result in &submission.results {
            if result.status == ResultStatus::Finished && result.finish_time_ms.is_none() {
                report.warnings.push(format!(
                    "Viewer '{}' finished without a finish time",
                    result.viewer_id
                ));
            }
        }

        if !submission.results.is_empty() && submission.human_viewer_ids().is_empty() {
            report
                .warnings
                .push("Every result belongs to a bot".to_string());
        }

        Ok((submission, report))
    }
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("  {}", warning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(body: serde_json::Value) -> SubmitCompetitionRequest {
        serde_json::from_value(body).unwrap()
    }

    fn base() -> serde_json::Value {
        serde_json::json!({
            "competitionUuid": "5b0a1f3c-2d1e-4c6b-9a8f-7e6d5c4b3a21",
            "streamerId": "1001",
            "streamerLogin": "speedqueen",
            "streamerDisplayName": "SpeedQueen",
            "mapId": "harbor",
            "mapName": "Harbor Run",
            "vehicleType": "kart",
            "startedAt": "2025-05-01T12:00:00Z",
            "endedAt": "2025-05-01T12:03:00Z",
            "results": [
                { "viewerId": "A", "finishRank": 1, "status": "FINISHED", "finishTimeMs": 10000 },
                { "viewerId": "B", "finishRank": 2, "status": "FINISHED" }
            ]
        })
    }

    #[test]
    fn test_valid_file_produces_warnings_only() {
        let (submission, report) = SubmissionValidator::validate(request(base())).unwrap();
        assert_eq!(submission.results.len(), 2);
        assert!(report.errors.is_empty());
        assert!(report.warnings.iter().any(|w| w.contains("mapVersion")));
        assert!(report.warnings.iter().any(|w| w.contains("'B'")));
    }

    #[test]
    fn test_missing_timestamps_fail() {
        let mut body = base();
        body.as_object_mut().unwrap().remove("endedAt");
        let err = SubmissionValidator::validate(request(body)).unwrap_err();
        assert!(err.to_string().contains("endedAt is required"));
    }

    #[test]
    fn test_field_rules_fail() {
        let mut body = base();
        body["results"][0]["finishRank"] = serde_json::json!(0);
        assert!(SubmissionValidator::validate(request(body)).is_err());
    }

    #[test]
    fn test_all_bot_race_is_flagged() {
        let mut body = base();
        body["results"] = serde_json::json!([
            { "viewerId": "bot:1", "finishRank": 1, "status": "FINISHED", "finishTimeMs": 9000 }
        ]);
        let (_, report) = SubmissionValidator::validate(request(body)).unwrap();
        assert!(report.warnings.iter().any(|w| w.contains("bot")));
    }
}
