pub mod achievements;
pub mod aggregation;
pub mod leaderboard;
pub mod map_baseline;
pub mod submission;

pub use achievements::{AchievementEvaluator, LoggingAchievementEvaluator};
pub use leaderboard::{list_metadata, query_leaderboard};
pub use map_baseline::{BaselineOutcome, SkipReason, recompute_map_baseline};
pub use submission::{SubmissionOutcome, submit_competition};
