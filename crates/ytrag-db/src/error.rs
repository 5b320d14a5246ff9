use thiserror::Error;

/// Errors that can occur within the database access layer.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for ytrag_core::YtragError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Sql(e) => ytrag_core::YtragError::Database(e.to_string()),
            DbError::Migrate(e) => ytrag_core::YtragError::Database(e.to_string()),
            DbError::Validation(msg) => ytrag_core::YtragError::Validation(msg),
            DbError::NotFound(msg) => ytrag_core::YtragError::NotFound(msg),
        }
    }
}
