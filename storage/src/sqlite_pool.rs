//! SQLite connection pool wrapper for the storage crate.

use std::str::FromStr;

use tracing::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Manages a single SQLite pool; creates the DB file and tables if missing.
#[derive(Clone)]
pub struct SqlitePoolManager {
    pool: SqlitePool,
}

impl SqlitePoolManager {
    /// Creates a pool for the given database URL.
    ///
    /// `sqlite::memory:` opens a private in-memory database on a single connection (so every
    /// query sees the same data); anything else is treated as a file path.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        info!("Initializing SQLite pool: {}", database_url);

        let pool = if database_url.starts_with("sqlite::memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(SqliteConnectOptions::from_str(database_url)?)
                .await?
        } else {
            let options = SqliteConnectOptions::new()
                .create_if_missing(true)
                .foreign_keys(true)
                .filename(database_url.trim_start_matches("sqlite://"));
            SqlitePool::connect_with(options).await?
        };

        let manager = Self { pool };
        manager.init_schema().await?;
        Ok(manager)
    }

    /// Returns the underlying pool for running queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        info!("Creating database tables if not exist");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS personas (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                user_name TEXT NOT NULL,
                src TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                instructions TEXT NOT NULL,
                seed TEXT NOT NULL,
                category_id TEXT NOT NULL REFERENCES categories(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_personas_category_id ON personas(category_id);
            CREATE INDEX IF NOT EXISTS idx_personas_created_at ON personas(created_at);
            CREATE INDEX IF NOT EXISTS idx_messages_conversation_user ON messages(conversation_id, user_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
