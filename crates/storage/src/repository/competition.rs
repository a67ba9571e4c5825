use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::dto::metadata::{MapSummary, StreamerSummary};
use crate::dto::submission::{SubmittedResult, ValidatedSubmission};
use crate::error::{Result, StorageError};
use crate::models::Competition;

/// Rows per multi-row result upsert.
pub const RESULT_BATCH_SIZE: usize = 100;

const COMPETITION_COLUMNS: &str = r#"
    competition_id, client_competition_id, streamer_id, streamer_login,
    streamer_display_name, season_id, map_id, map_name, map_version, map_hash,
    vehicle_type, started_at, ended_at, winner_viewer_id, winner_display_name, created_at
"#;

pub struct CompetitionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CompetitionRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Registers the map, upserts the competition and all of its results in
    /// one transaction, so readers never see a competition without results.
    /// A competition id already owned by another streamer rolls everything back.
    pub async fn upsert_submission(
        &self,
        submission: &ValidatedSubmission,
        season_id: Option<&str>,
        with_bot_flag: bool,
    ) -> Result<Competition> {
        let mut tx = self.pool.begin().await?;

        self.register_map(submission, &mut tx).await?;
        let competition = self
            .upsert_competition(submission, season_id, &mut tx)
            .await?;

        for chunk in submission.results.chunks(RESULT_BATCH_SIZE) {
            self.upsert_results(competition.competition_id, chunk, with_bot_flag, &mut tx)
                .await?;
        }

        tx.commit().await?;
        Ok(competition)
    }

    async fn register_map(
        &self,
        submission: &ValidatedSubmission,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO maps (map_id, map_name, version, content_hash)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (map_id)
            DO UPDATE SET
                map_name = CASE WHEN EXCLUDED.version > maps.version
                                THEN EXCLUDED.map_name ELSE maps.map_name END,
                content_hash = CASE
                    WHEN EXCLUDED.version > maps.version THEN EXCLUDED.content_hash
                    WHEN EXCLUDED.version = maps.version
                        THEN COALESCE(maps.content_hash, EXCLUDED.content_hash)
                    ELSE maps.content_hash END,
                version = GREATEST(maps.version, EXCLUDED.version)
            "#,
        )
        .bind(&submission.map_id)
        .bind(&submission.map_name)
        .bind(submission.effective_map_version())
        .bind(&submission.map_hash)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn upsert_competition(
        &self,
        submission: &ValidatedSubmission,
        season_id: Option<&str>,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Competition> {
        let winner = submission.winner();
        let sql = format!(
            r#"
            INSERT INTO competitions (
                client_competition_id, streamer_id, streamer_login, streamer_display_name,
                season_id, map_id, map_name, map_version, map_hash, vehicle_type,
                started_at, ended_at, winner_viewer_id, winner_display_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (client_competition_id)
            DO UPDATE SET
                streamer_id = EXCLUDED.streamer_id,
                streamer_login = EXCLUDED.streamer_login,
                streamer_display_name = EXCLUDED.streamer_display_name,
                season_id = EXCLUDED.season_id,
                map_id = EXCLUDED.map_id,
                map_name = EXCLUDED.map_name,
                map_version = EXCLUDED.map_version,
                map_hash = EXCLUDED.map_hash,
                vehicle_type = EXCLUDED.vehicle_type,
                started_at = EXCLUDED.started_at,
                ended_at = EXCLUDED.ended_at,
                winner_viewer_id = EXCLUDED.winner_viewer_id,
                winner_display_name = EXCLUDED.winner_display_name
            WHERE competitions.streamer_id = EXCLUDED.streamer_id
            RETURNING {COMPETITION_COLUMNS}
            "#
        );

        let competition = sqlx::query_as::<_, Competition>(&sql)
            .bind(submission.client_competition_id)
            .bind(&submission.streamer_id)
            .bind(&submission.streamer_login)
            .bind(&submission.streamer_display_name)
            .bind(season_id)
            .bind(&submission.map_id)
            .bind(&submission.map_name)
            .bind(submission.effective_map_version())
            .bind(&submission.map_hash)
            .bind(&submission.vehicle_type)
            .bind(submission.started_at)
            .bind(submission.ended_at)
            .bind(winner.map(|w| w.viewer_id.as_str()))
            .bind(winner.map(|w| w.display_name()))
            .fetch_optional(&mut **tx)
            .await?;

        // No row back means the conflicting competition is another streamer's.
        competition.ok_or(StorageError::CompetitionOwnedElsewhere(
            submission.client_competition_id,
        ))
    }

    async fn upsert_results(
        &self,
        competition_id: Uuid,
        results: &[SubmittedResult],
        with_bot_flag: bool,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<()> {
        if results.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::new(
            r#"INSERT INTO competition_results (
                competition_id, viewer_id, viewer_login, viewer_display_name, viewer_avatar_url,
                finish_rank, status, finish_time_ms, vehicle, distance_m, progress"#,
        );
        if with_bot_flag {
            query.push(", is_bot");
        }
        query.push(") ");

        query.push_values(results, |mut row, result| {
            row.push_bind(competition_id)
                .push_bind(&result.viewer_id)
                .push_bind(result.login())
                .push_bind(result.display_name())
                .push_bind(&result.avatar_url)
                .push_bind(result.finish_rank)
                .push_bind(result.status.as_str())
                .push_bind(result.effective_finish_time_ms())
                .push_bind(&result.vehicle)
                .push_bind(result.distance)
                .push_bind(result.progress);
            if with_bot_flag {
                row.push_bind(result.is_bot());
            }
        });

        query.push(
            r#"
            ON CONFLICT (competition_id, viewer_id)
            DO UPDATE SET
                viewer_login = EXCLUDED.viewer_login,
                viewer_display_name = EXCLUDED.viewer_display_name,
                viewer_avatar_url = EXCLUDED.viewer_avatar_url,
                finish_rank = EXCLUDED.finish_rank,
                status = EXCLUDED.status,
                finish_time_ms = EXCLUDED.finish_time_ms,
                vehicle = EXCLUDED.vehicle,
                distance_m = EXCLUDED.distance_m,
                progress = EXCLUDED.progress
            "#,
        );
        if with_bot_flag {
            query.push(", is_bot = EXCLUDED.is_bot");
        }

        query.build().execute(&mut **tx).await?;
        Ok(())
    }

    /// Streamers with at least one competition, labelled by their latest identity.
    pub async fn list_streamers(&self) -> Result<Vec<StreamerSummary>> {
        let streamers = sqlx::query_as::<_, StreamerSummary>(
            r#"
            SELECT streamer_id,
                   (ARRAY_AGG(streamer_login ORDER BY started_at DESC))[1] AS streamer_login,
                   (ARRAY_AGG(streamer_display_name ORDER BY started_at DESC))[1]
                        AS streamer_display_name,
                   COUNT(*) AS competitions
            FROM competitions
            GROUP BY streamer_id
            ORDER BY competitions DESC, streamer_id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(streamers)
    }

    pub async fn list_maps(&self) -> Result<Vec<MapSummary>> {
        let maps = sqlx::query_as::<_, MapSummary>(
            r#"
            SELECT map_id,
                   (ARRAY_AGG(map_name ORDER BY started_at DESC))[1] AS map_name,
                   COUNT(*) AS competitions
            FROM competitions
            GROUP BY map_id
            ORDER BY competitions DESC, map_id
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(maps)
    }
}
