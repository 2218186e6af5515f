//! Source store errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// The source itself is gone, not just one table. Fatal for the whole run.
    pub fn is_connection(&self) -> bool {
        match self {
            SourceError::Postgres(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::WorkerCrashed
            ),
            SourceError::Sqlite(e) => matches!(
                e.sqlite_error_code(),
                Some(rusqlite::ErrorCode::CannotOpen | rusqlite::ErrorCode::NotADatabase)
            ),
            SourceError::Unavailable(_) => true,
            SourceError::TableNotFound(_) => false,
        }
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
