pub mod common;
pub mod leaderboard;
pub mod metadata;
pub mod submission;
