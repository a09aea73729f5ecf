use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    /// Any I/O failure of the store that has nothing to do with versioning.
    #[error("The metrics store is unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("A stored row could not be decoded: {0}")]
    InvalidData(#[from] core_types::CoreError),

    #[error("The requested data was not found in the database.")]
    NotFound,
}
