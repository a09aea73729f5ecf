use crate::error::DbError;
use dotenvy::dotenv;
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::env;
use std::time::Duration;

/// Establishes a connection pool to the PostgreSQL database.
///
/// Reads `DATABASE_URL` from the environment, loading a `.env` file first if
/// one is present.
pub async fn connect() -> Result<PgPool, DbError> {
    dotenv().ok();

    let database_url = env::var("DATABASE_URL")
        .map_err(|_e| DbError::ConnectionConfigError("DATABASE_URL must be set.".to_string()))?;

    connect_with(&database_url, 10).await
}

/// Connects to an explicit URL. Concurrent recomputes each hold a connection
/// only for a single statement, so a small pool serves many callers.
pub async fn connect_with(database_url: &str, max_connections: u32) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, "Connected to the metrics database.");
    Ok(pool)
}

/// Applies the embedded migrations so the schema matches this build.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations are up to date.");
    Ok(())
}
