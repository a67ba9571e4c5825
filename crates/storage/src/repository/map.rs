use sqlx::{PgPool, QueryBuilder};

use crate::dto::submission::DEFAULT_MAP_VERSION;
use crate::error::Result;
use crate::models::Map;
use crate::store::{BaselineScope, VersionMatch};

pub struct MapRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MapRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// `with_baseline` must only be set when the baseline column exists.
    pub async fn find(&self, map_id: &str, with_baseline: bool) -> Result<Option<Map>> {
        let baseline = if with_baseline {
            "expected_time_ms"
        } else {
            "NULL::BIGINT AS expected_time_ms"
        };
        let sql = format!(
            "SELECT map_id, map_name, version, content_hash, {baseline} FROM maps WHERE map_id = $1"
        );

        let map = sqlx::query_as::<_, Map>(&sql)
            .bind(map_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(map)
    }

    pub async fn list_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT map_id FROM maps ORDER BY map_id")
            .fetch_all(self.pool)
            .await?;

        Ok(ids)
    }

    /// Fastest positive FINISHED time of every competition in scope.
    pub async fn winning_times(&self, scope: &BaselineScope) -> Result<Vec<i64>> {
        let mut query = QueryBuilder::new(
            r#"
            SELECT MIN(r.finish_time_ms)
            FROM competitions c
            INNER JOIN competition_results r ON r.competition_id = c.competition_id
            WHERE r.status = 'FINISHED'
              AND r.finish_time_ms > 0
              AND c.map_id = "#,
        );
        query.push_bind(&scope.map_id);

        match &scope.version {
            VersionMatch::Hash(hash) => {
                query.push(" AND c.map_hash = ");
                query.push_bind(hash);
            }
            VersionMatch::Version(version) => {
                query.push(" AND COALESCE(c.map_version, ");
                query.push_bind(DEFAULT_MAP_VERSION);
                query.push(") = ");
                query.push_bind(*version);
            }
        }

        if scope.exclude_bots {
            query.push(" AND r.is_bot = FALSE");
        }
        query.push(" GROUP BY c.competition_id");

        let times = query
            .build_query_scalar::<i64>()
            .fetch_all(self.pool)
            .await?;

        Ok(times)
    }

    pub async fn write_baseline(&self, map_id: &str, expected_time_ms: i64) -> Result<()> {
        sqlx::query("UPDATE maps SET expected_time_ms = $2 WHERE map_id = $1")
            .bind(map_id)
            .bind(expected_time_ms)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
