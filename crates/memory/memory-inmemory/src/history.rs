use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use memory_core::{BackendError, HistoryBackend, HistoryEntry};
use tokio::sync::RwLock;

/// One stored member: score, insertion sequence (tie-breaker) and text.
#[derive(Debug, Clone)]
struct Member {
    score: f64,
    seq: u64,
    text: String,
}

/// In-memory sorted-set history log.
#[derive(Debug, Clone)]
pub struct InMemoryHistoryBackend {
    logs: Arc<RwLock<HashMap<String, Vec<Member>>>>,
    next_seq: Arc<AtomicU64>,
    available: Arc<AtomicBool>,
}

impl InMemoryHistoryBackend {
    /// Creates a new empty backend.
    pub fn new() -> Self {
        Self {
            logs: Arc::new(RwLock::new(HashMap::new())),
            next_seq: Arc::new(AtomicU64::new(0)),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulates an outage: while unavailable every call returns `BackendError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of distinct keys holding at least one entry.
    pub async fn key_count(&self) -> usize {
        self.logs.read().await.len()
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable(
                "in-memory history backend marked unavailable".to_string(),
            ))
        }
    }

    fn member(&self, entry: HistoryEntry) -> Member {
        Member {
            score: entry.score,
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
            text: entry.text,
        }
    }
}

impl Default for InMemoryHistoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryBackend for InMemoryHistoryBackend {
    async fn append(&self, key: &str, entry: HistoryEntry) -> Result<(), BackendError> {
        self.check_available()?;
        let member = self.member(entry);
        let mut logs = self.logs.write().await;
        logs.entry(key.to_string()).or_default().push(member);
        Ok(())
    }

    async fn tail(&self, key: &str, limit: usize) -> Result<Vec<HistoryEntry>, BackendError> {
        self.check_available()?;
        let logs = self.logs.read().await;
        let Some(members) = logs.get(key) else {
            return Ok(Vec::new());
        };

        let mut sorted: Vec<&Member> = members.iter().collect();
        sorted.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        let skip = sorted.len().saturating_sub(limit);

        Ok(sorted
            .into_iter()
            .skip(skip)
            .map(|m| HistoryEntry::new(m.score, m.text.clone()))
            .collect())
    }

    async fn exists(&self, key: &str) -> Result<bool, BackendError> {
        self.check_available()?;
        let logs = self.logs.read().await;
        Ok(logs.get(key).is_some_and(|m| !m.is_empty()))
    }

    async fn count(&self, key: &str) -> Result<usize, BackendError> {
        self.check_available()?;
        let logs = self.logs.read().await;
        Ok(logs.get(key).map_or(0, Vec::len))
    }

    async fn insert_if_empty(
        &self,
        key: &str,
        entries: Vec<HistoryEntry>,
    ) -> Result<bool, BackendError> {
        self.check_available()?;
        // Check and insert under one write lock so concurrent seeders cannot both win.
        let mut logs = self.logs.write().await;
        let log = logs.entry(key.to_string()).or_default();
        if !log.is_empty() {
            return Ok(false);
        }
        for entry in entries {
            let member = self.member(entry);
            log.push(member);
        }
        if log.is_empty() {
            logs.remove(key);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tail_orders_by_score_then_insertion() {
        let backend = InMemoryHistoryBackend::new();
        backend.append("k", HistoryEntry::new(5.0, "b")).await.unwrap();
        backend.append("k", HistoryEntry::new(1.0, "a")).await.unwrap();
        backend.append("k", HistoryEntry::new(5.0, "c")).await.unwrap();

        let tail = backend.tail("k", 10).await.unwrap();
        let texts: Vec<&str> = tail.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_tail_keeps_highest_scores() {
        let backend = InMemoryHistoryBackend::new();
        for i in 0..5 {
            backend
                .append("k", HistoryEntry::new(i as f64, format!("e{}", i)))
                .await
                .unwrap();
        }
        let tail = backend.tail("k", 2).await.unwrap();
        let texts: Vec<&str> = tail.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["e3", "e4"]);
    }

    #[tokio::test]
    async fn test_duplicate_members_are_kept() {
        let backend = InMemoryHistoryBackend::new();
        backend.append("k", HistoryEntry::new(1.0, "same")).await.unwrap();
        backend.append("k", HistoryEntry::new(1.0, "same")).await.unwrap();
        assert_eq!(backend.count("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_if_empty() {
        let backend = InMemoryHistoryBackend::new();
        let seed = vec![HistoryEntry::new(0.0, "s0"), HistoryEntry::new(1.0, "s1")];
        assert!(backend.insert_if_empty("k", seed.clone()).await.unwrap());
        assert!(!backend.insert_if_empty("k", seed).await.unwrap());
        assert_eq!(backend.count("k").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_if_empty_with_no_entries_leaves_key_absent() {
        let backend = InMemoryHistoryBackend::new();
        assert!(backend.insert_if_empty("k", Vec::new()).await.unwrap());
        assert!(!backend.exists("k").await.unwrap());
        assert_eq!(backend.key_count().await, 0);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let backend = InMemoryHistoryBackend::new();
        backend.set_available(false);
        let err = backend.exists("k").await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
        backend.set_available(true);
        assert!(!backend.exists("k").await.unwrap());
    }
}
