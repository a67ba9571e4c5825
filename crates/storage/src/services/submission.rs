use crate::capability::{OptionalColumn, SchemaProbe};
use crate::dto::submission::{SubmitCompetitionResponse, ValidatedSubmission};
use crate::error::Result;
use crate::models::Competition;
use crate::store::StatsStore;

use super::achievements::AchievementEvaluator;
use super::map_baseline::{BaselineOutcome, recompute_map_baseline};

#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub competition: Competition,
    pub result_count: usize,
    pub baseline: BaselineOutcome,
}

impl From<SubmissionOutcome> for SubmitCompetitionResponse {
    fn from(outcome: SubmissionOutcome) -> Self {
        Self {
            ok: true,
            competition_id: outcome.competition.competition_id,
            season_id: outcome.competition.season_id,
            result_count: outcome.result_count,
            baseline: outcome.baseline,
        }
    }
}

/// Persists one competition with its results, then runs the side effects.
///
/// Only the season lookup and the upsert can fail the call. The baseline
/// recompute and achievement evaluation run after the write has committed and
/// their failures are logged and reported, never propagated.
pub async fn submit_competition<S>(
    store: &S,
    probe: &SchemaProbe,
    achievements: &dyn AchievementEvaluator,
    submission: &ValidatedSubmission,
) -> Result<SubmissionOutcome>
where
    S: StatsStore + ?Sized,
{
    let season = store.find_season_at(submission.started_at).await?;
    let season_id = season.as_ref().map(|s| s.season_id.as_str());
    let with_bot_flag = probe.has_column(store, OptionalColumn::BotFlag).await;

    let competition = store
        .upsert_submission(submission, season_id, with_bot_flag)
        .await?;

    tracing::info!(
        competition_id = %competition.competition_id,
        client_competition_id = %competition.client_competition_id,
        streamer_id = %competition.streamer_id,
        map_id = %competition.map_id,
        season_id = ?competition.season_id,
        results = submission.results.len(),
        "Competition stored"
    );

    let baseline = match recompute_map_baseline(store, probe, &competition.map_id).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(
                map_id = %competition.map_id,
                error = %e,
                "Map baseline recompute failed"
            );
            BaselineOutcome::Failed {
                message: e.to_string(),
            }
        }
    };

    let humans = submission.human_viewer_ids();
    if !humans.is_empty()
        && let Err(e) = achievements.evaluate(&competition, &humans).await
    {
        tracing::warn!(
            competition_id = %competition.competition_id,
            error = %e,
            "Achievement evaluation failed"
        );
    }

    Ok(SubmissionOutcome {
        competition,
        result_count: submission.results.len(),
        baseline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::memory::MemoryStore;
    use crate::models::Season;
    use crate::services::achievements::LoggingAchievementEvaluator;
    use crate::test_support::{bot, dnf, finished, submission};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingEvaluator {
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl AchievementEvaluator for RecordingEvaluator {
        async fn evaluate(&self, _competition: &Competition, viewer_ids: &[String]) -> Result<()> {
            self.calls.lock().unwrap().push(viewer_ids.to_vec());
            if self.fail {
                return Err(StorageError::Backend("achievements offline".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        let store = MemoryStore::new();
        let probe = SchemaProbe::default();
        let mut race = submission("harbor", 1, None, vec![finished("A", 1, 10_000), dnf("B", 2)]);

        let first = submit_competition(&store, &probe, &LoggingAchievementEvaluator, &race)
            .await
            .unwrap();

        race.results[1] = finished("B", 2, 13_000);
        let second = submit_competition(&store, &probe, &LoggingAchievementEvaluator, &race)
            .await
            .unwrap();

        assert_eq!(first.competition.competition_id, second.competition.competition_id);
        assert_eq!(store.competition_count(), 1);
        assert_eq!(store.result_count(), 2);
        assert_eq!(
            store.result(second.competition.competition_id, "B").map(|r| r.finish_time_ms),
            Some(Some(13_000))
        );
    }

    #[tokio::test]
    async fn test_season_resolved_from_start_time() {
        let store = MemoryStore::new();
        let probe = SchemaProbe::default();
        let race = submission("harbor", 1, None, vec![finished("A", 1, 10_000)]);
        store.add_season(Season {
            season_id: "s1".to_string(),
            name: "Season 1".to_string(),
            starts_at: race.started_at - Duration::days(1),
            ends_at: race.started_at,
        });

        let outcome = submit_competition(&store, &probe, &LoggingAchievementEvaluator, &race)
            .await
            .unwrap();
        assert_eq!(outcome.competition.season_id.as_deref(), Some("s1"));

        let mut later = submission("harbor", 1, None, vec![finished("A", 1, 10_000)]);
        later.started_at = race.started_at + Duration::seconds(1);
        let outcome = submit_competition(&store, &probe, &LoggingAchievementEvaluator, &later)
            .await
            .unwrap();
        assert_eq!(outcome.competition.season_id, None);
    }

    #[tokio::test]
    async fn test_winner_and_baseline_recorded() {
        let store = MemoryStore::new();
        let probe = SchemaProbe::default();
        let race = submission("harbor", 1, None, vec![dnf("B", 1), finished("A", 1, 10_000)]);

        let outcome = submit_competition(&store, &probe, &LoggingAchievementEvaluator, &race)
            .await
            .unwrap();
        assert_eq!(outcome.competition.winner_viewer_id.as_deref(), Some("A"));
        assert_eq!(outcome.result_count, 2);
        assert!(matches!(
            outcome.baseline,
            BaselineOutcome::Updated {
                expected_time_ms: 10_000,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_achievements_skip_bots_and_failures_are_swallowed() {
        let store = MemoryStore::new();
        let probe = SchemaProbe::default();
        let evaluator = RecordingEvaluator {
            fail: true,
            ..Default::default()
        };
        let race = submission(
            "harbor",
            1,
            None,
            vec![finished("A", 1, 10_000), bot("bot:7", 2, 11_000), bot("X", 3, 12_000)],
        );

        let outcome = submit_competition(&store, &probe, &evaluator, &race).await;
        assert!(outcome.is_ok());
        assert_eq!(*evaluator.calls.lock().unwrap(), vec![vec!["A".to_string()]]);
    }

    #[tokio::test]
    async fn test_baseline_failure_does_not_fail_submission() {
        let store = MemoryStore::new().fail_baseline_writes();
        let probe = SchemaProbe::default();
        let race = submission("harbor", 1, None, vec![finished("A", 1, 10_000)]);

        let outcome = submit_competition(&store, &probe, &LoggingAchievementEvaluator, &race)
            .await
            .unwrap();
        assert!(matches!(outcome.baseline, BaselineOutcome::Failed { .. }));
        assert_eq!(store.competition_count(), 1);
    }
}
