//! Semantic retrieval over long-term persona passages.
//!
//! Query path is best-effort: embedding errors, index errors and timeouts all come back as
//! [`RetrievalOutcome::Degraded`], never as an error. Ingestion is an explicit admin
//! operation and propagates [`IngestError`].

use std::sync::Arc;
use std::time::Duration;

use embedding::EmbeddingService;
use memory_core::{IndexedPassage, RetrievalDocument, VectorIndex};
use tracing::{debug, info, instrument, warn};

use crate::error::IngestError;

/// Result of a retrieval query.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrievalOutcome {
    /// Up to `k` passages from the requested scope, most similar first. May be empty.
    Hits(Vec<RetrievalDocument>),
    /// Retrieval failed; the turn proceeds without extra context.
    Degraded { reason: String },
}

impl RetrievalOutcome {
    pub fn documents(&self) -> &[RetrievalDocument] {
        match self {
            RetrievalOutcome::Hits(docs) => docs,
            RetrievalOutcome::Degraded { .. } => &[],
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, RetrievalOutcome::Degraded { .. })
    }

    /// Passage texts joined by newlines; `""` when there are none.
    pub fn joined_text(&self) -> String {
        self.documents()
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone)]
pub struct RetrievalIndex {
    embedder: Arc<dyn EmbeddingService>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    timeout: Duration,
}

impl RetrievalIndex {
    pub fn new(
        embedder: Arc<dyn EmbeddingService>,
        index: Arc<dyn VectorIndex>,
        top_k: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            top_k,
            timeout,
        }
    }

    /// Searches with the configured `k`.
    pub async fn search(&self, query: &str, scope_id: &str) -> RetrievalOutcome {
        self.search_k(query, scope_id, self.top_k).await
    }

    /// Embeds `query` and returns up to `k` passages tagged with `scope_id`.
    #[instrument(skip_all, fields(scope_id = %scope_id, query_len = query.len(), k = k))]
    pub async fn search_k(&self, query: &str, scope_id: &str, k: usize) -> RetrievalOutcome {
        if scope_id.trim().is_empty() {
            warn!("retrieval: blank scope id, skipping search");
            return RetrievalOutcome::Degraded {
                reason: "blank scope id".to_string(),
            };
        }
        if query.trim().is_empty() || k == 0 {
            debug!("retrieval: nothing to search for");
            return RetrievalOutcome::Hits(Vec::new());
        }

        match tokio::time::timeout(self.timeout, self.search_inner(query, scope_id, k)).await {
            Ok(Ok(mut docs)) => {
                let before = docs.len();
                docs.retain(|d| d.scope_id == scope_id);
                if docs.len() != before {
                    warn!(
                        dropped = before - docs.len(),
                        "retrieval: index returned passages from another scope, dropped"
                    );
                }
                docs.truncate(k);
                info!(hits = docs.len(), "step: retrieval search done");
                RetrievalOutcome::Hits(docs)
            }
            Ok(Err(reason)) => {
                warn!(reason = %reason, "retrieval: search failed, continuing without context");
                RetrievalOutcome::Degraded { reason }
            }
            Err(_) => {
                let reason = format!("timed out after {}ms", self.timeout.as_millis());
                warn!(reason = %reason, "retrieval: search timed out, continuing without context");
                RetrievalOutcome::Degraded { reason }
            }
        }
    }

    async fn search_inner(
        &self,
        query: &str,
        scope_id: &str,
        k: usize,
    ) -> Result<Vec<RetrievalDocument>, String> {
        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| format!("embedding failed: {}", e))?;
        debug!(dimension = query_embedding.len(), "step: embedding query vector done");

        self.index
            .search(&query_embedding, scope_id, k)
            .await
            .map_err(|e| e.to_string())
    }

    /// Embeds `passages` in one batch and upserts them under `scope_id`.
    /// Blank passages are skipped. Returns the number indexed.
    #[instrument(skip_all, fields(scope_id = %scope_id, passages = passages.len()))]
    pub async fn index_document(
        &self,
        scope_id: &str,
        passages: &[String],
    ) -> Result<usize, IngestError> {
        if scope_id.trim().is_empty() {
            return Err(IngestError::MissingScope);
        }
        let texts: Vec<String> = passages
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if texts.is_empty() {
            return Ok(0);
        }

        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(IngestError::Embedding)?;
        if embeddings.len() != texts.len() {
            return Err(IngestError::Embedding(anyhow::anyhow!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let count = texts.len();
        for (text, embedding) in texts.into_iter().zip(embeddings) {
            self.index
                .upsert(IndexedPassage::new(scope_id, text, embedding))
                .await?;
        }
        info!(count, "step: retrieval passages indexed");
        Ok(count)
    }
}

/// Splits a document into passages on blank lines.
pub fn split_passages(document: &str) -> Vec<String> {
    let mut passages = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in document.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                passages.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        passages.push(current.join("\n"));
    }
    passages
}
