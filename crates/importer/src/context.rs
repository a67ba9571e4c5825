use std::sync::Arc;

use storage::SchemaProbe;
use storage::dto::submission::ValidatedSubmission;
use storage::services::{
    AchievementEvaluator, BaselineOutcome, LoggingAchievementEvaluator, SubmissionOutcome,
    recompute_map_baseline, submit_competition,
};
use storage::store::StatsStore;
use tracing::{info, warn};

use crate::Result;

/// Everything an offline import needs to write through the same pipeline as
/// the HTTP submission endpoint.
pub struct ImportContext {
    pub store: Arc<dyn StatsStore>,
    pub probe: SchemaProbe,
    pub achievements: Arc<dyn AchievementEvaluator>,
}

impl ImportContext {
    pub fn new(store: Arc<dyn StatsStore>) -> Self {
        Self {
            store,
            probe: SchemaProbe::default(),
            achievements: Arc::new(LoggingAchievementEvaluator),
        }
    }

    pub async fn submit(&self, submission: &ValidatedSubmission) -> Result<SubmissionOutcome> {
        let outcome = submit_competition(
            self.store.as_ref(),
            &self.probe,
            self.achievements.as_ref(),
            submission,
        )
        .await?;
        Ok(outcome)
    }

    /// Recomputes one map, or every known map when `map_id` is `None`.
    /// Keeps going past failing maps and returns how many failed.
    pub async fn recompute_baselines(&self, map_id: Option<&str>) -> Result<usize> {
        let map_ids = match map_id {
            Some(id) => vec![id.to_string()],
            None => self.store.list_map_ids().await?,
        };

        info!("Recomputing baselines for {} map(s)", map_ids.len());

        let mut failures = 0;
        for id in &map_ids {
            match recompute_map_baseline(self.store.as_ref(), &self.probe, id).await {
                Ok(BaselineOutcome::Updated {
                    expected_time_ms,
                    samples,
                    included_bots,
                }) => info!(
                    map_id = %id,
                    expected_time_ms,
                    samples,
                    included_bots,
                    "Baseline updated"
                ),
                Ok(outcome) => info!(map_id = %id, ?outcome, "Baseline not updated"),
                Err(e) => {
                    warn!(map_id = %id, error = %e, "Baseline recompute failed");
                    failures += 1;
                }
            }
        }

        Ok(failures)
    }
}
