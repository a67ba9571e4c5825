use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::Season;

pub struct SeasonRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SeasonRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Season whose inclusive range contains `at`; the earliest-starting one on overlap.
    pub async fn find_at(&self, at: DateTime<Utc>) -> Result<Option<Season>> {
        let season = sqlx::query_as::<_, Season>(
            r#"
            SELECT season_id, name, starts_at, ends_at
            FROM seasons
            WHERE starts_at <= $1 AND ends_at >= $1
            ORDER BY starts_at, season_id
            LIMIT 1
            "#,
        )
        .bind(at)
        .fetch_optional(self.pool)
        .await?;

        Ok(season)
    }
}
