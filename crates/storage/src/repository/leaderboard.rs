use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, QueryBuilder};

use crate::error::Result;
use crate::models::ResultStatus;
use crate::query::PredicateSet;
use crate::query::predicate::BASE_JOIN;
use crate::store::ResultRow;

#[derive(FromRow)]
struct JoinedResultRow {
    viewer_id: String,
    viewer_login: String,
    viewer_display_name: String,
    viewer_avatar_url: Option<String>,
    status: String,
    finish_rank: Option<i32>,
    finish_time_ms: Option<i64>,
    started_at: DateTime<Utc>,
}

impl From<JoinedResultRow> for ResultRow {
    fn from(row: JoinedResultRow) -> Self {
        Self {
            viewer_id: row.viewer_id,
            viewer_login: row.viewer_login,
            viewer_display_name: row.viewer_display_name,
            viewer_avatar_url: row.viewer_avatar_url,
            status: ResultStatus::from_db(&row.status),
            finish_rank: row.finish_rank,
            finish_time_ms: row.finish_time_ms,
            started_at: row.started_at,
        }
    }
}

/// Reads over the competition × result join. Both queries render the same
/// predicate set onto the same join.
pub struct LeaderboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LeaderboardRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn count_viewers(&self, predicates: &PredicateSet) -> Result<i64> {
        let mut query = QueryBuilder::new("SELECT COUNT(DISTINCT r.viewer_id)");
        query.push(BASE_JOIN);
        predicates.push_sql(&mut query);

        let count = query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }

    pub async fn fetch_rows(&self, predicates: &PredicateSet) -> Result<Vec<ResultRow>> {
        let mut query = QueryBuilder::new(
            r#"
            SELECT r.viewer_id, r.viewer_login, r.viewer_display_name, r.viewer_avatar_url,
                   r.status, r.finish_rank, r.finish_time_ms, c.started_at
            "#,
        );
        query.push(BASE_JOIN);
        predicates.push_sql(&mut query);
        query.push(" ORDER BY r.viewer_id, c.started_at");

        let rows = query
            .build_query_as::<JoinedResultRow>()
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(ResultRow::from).collect())
    }
}
