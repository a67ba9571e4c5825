use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::dto::metadata::{MapSummary, StreamerSummary};
use crate::dto::submission::ValidatedSubmission;
use crate::error::Result;
use crate::models::{Competition, Map, Season};
use crate::query::PredicateSet;
use crate::repository::{
    CompetitionRepository, LeaderboardRepository, MapRepository, SchemaRepository,
    SeasonRepository,
};
use crate::store::{BaselineScope, ResultRow, SchemaIntrospector, StatsStore};

const MAX_CONNECTIONS: u32 = 10;

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SchemaIntrospector for Database {
    async fn column_exists(&self, table: &'static str, column: &'static str) -> Result<bool> {
        SchemaRepository::new(&self.pool)
            .column_exists(table, column)
            .await
    }
}

#[async_trait]
impl StatsStore for Database {
    async fn count_viewers(&self, predicates: &PredicateSet) -> Result<i64> {
        LeaderboardRepository::new(&self.pool)
            .count_viewers(predicates)
            .await
    }

    async fn fetch_result_rows(&self, predicates: &PredicateSet) -> Result<Vec<ResultRow>> {
        LeaderboardRepository::new(&self.pool)
            .fetch_rows(predicates)
            .await
    }

    async fn list_streamers(&self) -> Result<Vec<StreamerSummary>> {
        CompetitionRepository::new(&self.pool).list_streamers().await
    }

    async fn list_maps(&self) -> Result<Vec<MapSummary>> {
        CompetitionRepository::new(&self.pool).list_maps().await
    }

    async fn find_season_at(&self, at: DateTime<Utc>) -> Result<Option<Season>> {
        SeasonRepository::new(&self.pool).find_at(at).await
    }

    async fn upsert_submission(
        &self,
        submission: &ValidatedSubmission,
        season_id: Option<&str>,
        with_bot_flag: bool,
    ) -> Result<Competition> {
        CompetitionRepository::new(&self.pool)
            .upsert_submission(submission, season_id, with_bot_flag)
            .await
    }

    async fn find_map(&self, map_id: &str, with_baseline: bool) -> Result<Option<Map>> {
        MapRepository::new(&self.pool)
            .find(map_id, with_baseline)
            .await
    }

    async fn list_map_ids(&self) -> Result<Vec<String>> {
        MapRepository::new(&self.pool).list_ids().await
    }

    async fn winning_times(&self, scope: &BaselineScope) -> Result<Vec<i64>> {
        MapRepository::new(&self.pool).winning_times(scope).await
    }

    async fn write_map_baseline(&self, map_id: &str, expected_time_ms: i64) -> Result<()> {
        MapRepository::new(&self.pool)
            .write_baseline(map_id, expected_time_ms)
            .await
    }
}
