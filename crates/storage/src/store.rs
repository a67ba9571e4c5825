use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::dto::metadata::{MapSummary, StreamerSummary};
use crate::dto::submission::ValidatedSubmission;
use crate::error::Result;
use crate::models::{Competition, Map, Season};
use crate::query::PredicateSet;

pub use crate::services::aggregation::ResultRow;

#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    async fn column_exists(&self, table: &'static str, column: &'static str) -> Result<bool>;
}

/// Which competitions on a map count toward its baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionMatch {
    Hash(String),
    Version(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineScope {
    pub map_id: String,
    pub version: VersionMatch,
    pub exclude_bots: bool,
}

/// Everything the statistics engine and the submission path need from a backing store.
///
/// Predicates handed to the read methods were built for this store: they
/// only carry bot exclusion when the bot-flag column exists.
#[async_trait]
pub trait StatsStore: SchemaIntrospector {
    /// Distinct viewers matching `predicates`.
    async fn count_viewers(&self, predicates: &PredicateSet) -> Result<i64>;

    async fn fetch_result_rows(&self, predicates: &PredicateSet) -> Result<Vec<ResultRow>>;

    async fn list_streamers(&self) -> Result<Vec<StreamerSummary>>;

    async fn list_maps(&self) -> Result<Vec<MapSummary>>;

    async fn find_season_at(&self, at: DateTime<Utc>) -> Result<Option<Season>>;

    /// Upserts the competition with its results in one transaction and
    /// registers the map. `with_bot_flag` controls whether the bot flag is written.
    async fn upsert_submission(
        &self,
        submission: &ValidatedSubmission,
        season_id: Option<&str>,
        with_bot_flag: bool,
    ) -> Result<Competition>;

    async fn find_map(&self, map_id: &str, with_baseline: bool) -> Result<Option<Map>>;

    async fn list_map_ids(&self) -> Result<Vec<String>>;

    /// Per-competition minimum FINISHED positive finish time within `scope`.
    async fn winning_times(&self, scope: &BaselineScope) -> Result<Vec<i64>>;

    async fn write_map_baseline(&self, map_id: &str, expected_time_ms: i64) -> Result<()>;
}
