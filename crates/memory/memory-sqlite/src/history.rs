use async_trait::async_trait;
use memory_core::{BackendError, HistoryBackend, HistoryEntry};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::pool::unavailable;

/// SQLite-backed sorted-set history log.
///
/// Each entry is its own row; `id` (AUTOINCREMENT) breaks score ties in insertion order.
#[derive(Clone)]
pub struct SqliteHistoryBackend {
    pool: SqlitePool,
}

impl SqliteHistoryBackend {
    /// Wraps an existing pool and creates the schema if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, BackendError> {
        let backend = Self { pool };
        backend.init_schema().await?;
        Ok(backend)
    }

    async fn init_schema(&self) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history_entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                history_key TEXT NOT NULL,
                score REAL NOT NULL,
                member TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_key_score ON history_entries(history_key, score, id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    /// Check-then-insert for `insert_if_empty`, run inside the caller's transaction.
    async fn seed_locked(
        conn: &mut SqliteConnection,
        key: &str,
        entries: &[HistoryEntry],
    ) -> Result<bool, sqlx::Error> {
        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM history_entries WHERE history_key = ?")
                .bind(key)
                .fetch_one(&mut *conn)
                .await?;
        if existing > 0 {
            return Ok(false);
        }

        for entry in entries {
            sqlx::query("INSERT INTO history_entries (history_key, score, member) VALUES (?, ?, ?)")
                .bind(key)
                .bind(entry.score)
                .bind(&entry.text)
                .execute(&mut *conn)
                .await?;
        }
        Ok(true)
    }
}

#[async_trait]
impl HistoryBackend for SqliteHistoryBackend {
    async fn append(&self, key: &str, entry: HistoryEntry) -> Result<(), BackendError> {
        sqlx::query("INSERT INTO history_entries (history_key, score, member) VALUES (?, ?, ?)")
            .bind(key)
            .bind(entry.score)
            .bind(&entry.text)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn tail(&self, key: &str, limit: usize) -> Result<Vec<HistoryEntry>, BackendError> {
        let rows = sqlx::query(
            r#"
            SELECT score, member FROM (
                SELECT id, score, member FROM history_entries
                WHERE history_key = ?
                ORDER BY score DESC, id DESC
                LIMIT ?
            )
            ORDER BY score ASC, id ASC
            "#,
        )
        .bind(key)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.iter()
            .map(|row| {
                let score: f64 = row
                    .try_get("score")
                    .map_err(|e| BackendError::Corrupt(e.to_string()))?;
                let member: String = row
                    .try_get("member")
                    .map_err(|e| BackendError::Corrupt(e.to_string()))?;
                Ok(HistoryEntry::new(score, member))
            })
            .collect()
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM history_entries WHERE history_key = ? LIMIT 1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;
        Ok(found.is_some())
    }

    async fn count(&self, key: &str) -> Result<usize, BackendError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM history_entries WHERE history_key = ?")
                .bind(key)
                .fetch_one(&self.pool)
                .await
                .map_err(unavailable)?;
        Ok(count as usize)
    }

    async fn insert_if_empty(
        &self,
        key: &str,
        entries: Vec<HistoryEntry>,
    ) -> Result<bool, BackendError> {
        // IMMEDIATE takes the write lock up front so two seeders cannot both see an empty log.
        // Dropping the transaction unfinished (timeout, cancelled request) rolls it back
        // before the connection is reused.
        let mut tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(unavailable)?;

        let inserted = Self::seed_locked(&mut tx, key, &entries)
            .await
            .map_err(unavailable)?;
        tx.commit().await.map_err(unavailable)?;
        debug!(inserted, lines = entries.len(), "history seed transaction committed");
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::connect_in_memory;

    async fn backend() -> SqliteHistoryBackend {
        let pool = connect_in_memory().await.unwrap();
        SqliteHistoryBackend::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_tail_returns_most_recent_oldest_first() {
        let history = backend().await;
        for i in 0..40 {
            history
                .append("k", HistoryEntry::new(1000.0 + i as f64, format!("line {}", i)))
                .await
                .unwrap();
        }

        let tail = history.tail("k", 30).await.unwrap();
        assert_eq!(tail.len(), 30);
        assert_eq!(tail.first().unwrap().text, "line 10");
        assert_eq!(tail.last().unwrap().text, "line 39");
    }

    #[tokio::test]
    async fn test_equal_scores_keep_insertion_order() {
        let history = backend().await;
        history.append("k", HistoryEntry::new(7.0, "first")).await.unwrap();
        history.append("k", HistoryEntry::new(7.0, "second")).await.unwrap();

        let tail = history.tail("k", 10).await.unwrap();
        let texts: Vec<&str> = tail.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_insert_if_empty_is_one_shot() {
        let history = backend().await;
        let seed = vec![HistoryEntry::new(0.0, "a"), HistoryEntry::new(1.0, "b")];

        assert!(history.insert_if_empty("k", seed.clone()).await.unwrap());
        assert!(!history.insert_if_empty("k", seed).await.unwrap());
        assert_eq!(history.count("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_missing_key() {
        let history = backend().await;
        assert!(!history.exists("nope").await.unwrap());
        assert!(history.tail("nope", 30).await.unwrap().is_empty());
    }
}
