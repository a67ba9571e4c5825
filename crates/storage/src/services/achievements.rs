use async_trait::async_trait;

use crate::error::Result;
use crate::models::Competition;

/// Boundary to the achievement system. Invoked once per stored submission.
#[async_trait]
pub trait AchievementEvaluator: Send + Sync {
    async fn evaluate(&self, competition: &Competition, viewer_ids: &[String]) -> Result<()>;
}

/// Records evaluation requests in the log and unlocks nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingAchievementEvaluator;

#[async_trait]
impl AchievementEvaluator for LoggingAchievementEvaluator {
    async fn evaluate(&self, competition: &Competition, viewer_ids: &[String]) -> Result<()> {
        tracing::info!(
            competition_id = %competition.competition_id,
            map_id = %competition.map_id,
            viewers = viewer_ids.len(),
            "Achievement evaluation requested"
        );
        Ok(())
    }
}
