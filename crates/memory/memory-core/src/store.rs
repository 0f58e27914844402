//! # Backend traits
//!
//! ## HistoryBackend
//!
//! A sorted-set-like, append-only log per storage key (see [`crate::MemoryKey::storage_key`]).
//! Unlike a plain sorted set, identical members are never merged: writing the same text twice
//! records two entries. Entries with equal scores keep their insertion order.
//!
//! ## VectorIndex
//!
//! Nearest-neighbour search over passages tagged with a scope id. The scope filter is a
//! required argument: implementations must never return passages from another scope.

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{HistoryEntry, IndexedPassage, RetrievalDocument};

/// Append-only, score-ordered conversation log keyed by a storage key string.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Appends one entry. Durable once this returns `Ok`.
    async fn append(&self, key: &str, entry: HistoryEntry) -> Result<(), BackendError>;

    /// Returns at most `limit` entries with the highest scores, ordered oldest-first
    /// (ascending score, ties in insertion order). Empty when the key has no entries.
    async fn tail(&self, key: &str, limit: usize) -> Result<Vec<HistoryEntry>, BackendError>;

    /// True when at least one entry exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool, BackendError>;

    /// Number of entries under `key`.
    async fn count(&self, key: &str) -> Result<usize, BackendError>;

    /// Atomically inserts `entries` only if `key` has no entries yet.
    /// Returns `true` when the entries were written, `false` when history already existed.
    async fn insert_if_empty(
        &self,
        key: &str,
        entries: Vec<HistoryEntry>,
    ) -> Result<bool, BackendError>;
}

/// Scoped vector similarity index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Inserts or replaces a passage (by id).
    async fn upsert(&self, passage: IndexedPassage) -> Result<(), BackendError>;

    /// Returns up to `limit` passages tagged with `scope_id`, most similar first.
    async fn search(
        &self,
        query_embedding: &[f32],
        scope_id: &str,
        limit: usize,
    ) -> Result<Vec<RetrievalDocument>, BackendError>;
}
