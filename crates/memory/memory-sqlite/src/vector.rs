use async_trait::async_trait;
use memory_core::{
    cosine_similarity, BackendError, IndexedPassage, RetrievalDocument, VectorIndex,
};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::pool::unavailable;

/// SQLite-backed vector index.
///
/// Embeddings are stored as little-endian `f32` BLOBs. Search loads only the rows of the
/// requested scope and ranks them by cosine similarity in process.
#[derive(Clone)]
pub struct SqliteVectorIndex {
    pool: SqlitePool,
}

impl SqliteVectorIndex {
    /// Wraps an existing pool and creates the schema if needed.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, BackendError> {
        let index = Self { pool };
        index.init_schema().await?;
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS passages (
                id TEXT PRIMARY KEY,
                scope_id TEXT NOT NULL,
                content TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_passages_scope ON passages(scope_id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    /// Number of passages stored under `scope_id`.
    pub async fn count_scope(&self, scope_id: &str) -> Result<usize, BackendError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM passages WHERE scope_id = ?")
            .bind(scope_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(count as usize)
    }
}

fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_embedding(blob: &[u8]) -> Result<Vec<f32>, BackendError> {
    if blob.len() % 4 != 0 {
        return Err(BackendError::Corrupt(format!(
            "embedding blob length {} is not a multiple of 4",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn upsert(&self, passage: IndexedPassage) -> Result<(), BackendError> {
        sqlx::query(
            r#"
            INSERT INTO passages (id, scope_id, content, embedding, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                scope_id = excluded.scope_id,
                content = excluded.content,
                embedding = excluded.embedding
            "#,
        )
        .bind(passage.id.to_string())
        .bind(&passage.scope_id)
        .bind(&passage.text)
        .bind(encode_embedding(&passage.embedding))
        .bind(passage.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        scope_id: &str,
        limit: usize,
    ) -> Result<Vec<RetrievalDocument>, BackendError> {
        let rows = sqlx::query("SELECT content, embedding FROM passages WHERE scope_id = ?")
            .bind(scope_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in &rows {
            let content: String = row
                .try_get("content")
                .map_err(|e| BackendError::Corrupt(e.to_string()))?;
            let blob: Vec<u8> = row
                .try_get("embedding")
                .map_err(|e| BackendError::Corrupt(e.to_string()))?;
            let embedding = decode_embedding(&blob)?;
            scored.push(RetrievalDocument {
                text: content,
                score: cosine_similarity(query_embedding, &embedding),
                scope_id: scope_id.to_string(),
            });
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        debug!(scope_id, candidates = rows.len(), hits = scored.len(), "sqlite vector search");
        Ok(scored)
    }
}
