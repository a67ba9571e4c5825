use sqlx::PgPool;

use crate::error::Result;

pub struct SchemaRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SchemaRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn column_exists(&self, table: &str, column: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM information_schema.columns
                WHERE table_schema = current_schema()
                  AND table_name = $1
                  AND column_name = $2
            )
            "#,
        )
        .bind(table)
        .bind(column)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}
