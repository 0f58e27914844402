//! SQLite pool construction shared by both backends.

use std::str::FromStr;

use memory_core::BackendError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Opens (and creates if missing) the database file at `database_url`.
pub async fn connect(database_url: &str) -> Result<SqlitePool, BackendError> {
    info!(database_url, "Initializing memory SQLite pool");

    let options = SqliteConnectOptions::new()
        .create_if_missing(true)
        .filename(database_url);

    SqlitePool::connect_with(options)
        .await
        .map_err(unavailable)
}

/// Opens a private in-memory database. Limited to one connection so every query sees the
/// same database.
pub async fn connect_in_memory() -> Result<SqlitePool, BackendError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(unavailable)?;
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(unavailable)
}

/// Maps a driver error onto the retryable backend error.
pub(crate) fn unavailable(e: sqlx::Error) -> BackendError {
    BackendError::Unavailable(e.to_string())
}
