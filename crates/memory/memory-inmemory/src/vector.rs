use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use memory_core::{
    cosine_similarity, BackendError, IndexedPassage, RetrievalDocument, VectorIndex,
};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory vector index for testing and development.
#[derive(Debug, Clone)]
pub struct InMemoryVectorIndex {
    passages: Arc<RwLock<HashMap<Uuid, IndexedPassage>>>,
    available: Arc<AtomicBool>,
}

impl InMemoryVectorIndex {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self {
            passages: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulates an outage: while unavailable every call returns `BackendError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the number of passages in the index.
    pub async fn len(&self) -> usize {
        self.passages.read().await.len()
    }

    /// Returns true if the index is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable(
                "in-memory vector index marked unavailable".to_string(),
            ))
        }
    }
}

impl Default for InMemoryVectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, passage: IndexedPassage) -> Result<(), BackendError> {
        self.check_available()?;
        let mut passages = self.passages.write().await;
        passages.insert(passage.id, passage);
        Ok(())
    }

    /// Scores every passage in `scope_id` against the query and keeps the top `limit`.
    async fn search(
        &self,
        query_embedding: &[f32],
        scope_id: &str,
        limit: usize,
    ) -> Result<Vec<RetrievalDocument>, BackendError> {
        self.check_available()?;
        let passages = self.passages.read().await;

        let mut scored: Vec<RetrievalDocument> = passages
            .values()
            .filter(|p| p.scope_id == scope_id)
            .map(|p| RetrievalDocument {
                text: p.text.clone(),
                score: cosine_similarity(query_embedding, &p.embedding),
                scope_id: p.scope_id.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);

        tracing::debug!(scope_id, hits = scored.len(), "in-memory vector search");
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(IndexedPassage::new("p1", "Hello world", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap();
        index
            .upsert(IndexedPassage::new("p1", "Goodbye world", vec![0.0, 1.0, 0.0]))
            .await
            .unwrap();
        index
            .upsert(IndexedPassage::new("p1", "Hello there", vec![0.9, 0.1, 0.0]))
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0], "p1", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Hello world");
        assert_eq!(hits[1].text, "Hello there");
    }

    #[tokio::test]
    async fn test_search_never_crosses_scopes() {
        let index = InMemoryVectorIndex::new();
        index
            .upsert(IndexedPassage::new("p1", "mine", vec![1.0, 0.0]))
            .await
            .unwrap();
        index
            .upsert(IndexedPassage::new("p2", "theirs", vec![1.0, 0.0]))
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], "p1", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits.iter().all(|h| h.scope_id == "p1"));
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let index = InMemoryVectorIndex::new();
        let mut passage = IndexedPassage::new("p1", "v1", vec![1.0]);
        index.upsert(passage.clone()).await.unwrap();
        passage.text = "v2".to_string();
        index.upsert(passage).await.unwrap();
        assert_eq!(index.len().await, 1);
    }
}
