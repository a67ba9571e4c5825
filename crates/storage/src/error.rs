use thiserror::Error;

/// SQLSTATE raised by PostgreSQL when a referenced table does not exist.
const UNDEFINED_TABLE: &str = "42P01";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Competition {0} belongs to another streamer")]
    CompetitionOwnedElsewhere(uuid::Uuid),

    #[error("Schema not initialized: {0}")]
    SchemaNotReady(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = error
            && db_err.code().as_deref() == Some(UNDEFINED_TABLE)
        {
            return StorageError::SchemaNotReady(db_err.message().to_string());
        }
        StorageError::Database(error)
    }
}

impl StorageError {
    pub fn is_schema_not_ready(&self) -> bool {
        matches!(self, StorageError::SchemaNotReady(_))
    }
}
