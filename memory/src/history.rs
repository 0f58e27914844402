//! Per-conversation history log.
//!
//! Wraps a [`HistoryBackend`] with the key policy (complete keys only, injective storage
//! key), scoring (seed lines 0, 1, 2, …; live turns by epoch milliseconds) and a timeout on
//! every call. Failures surface as [`HistoryError::StoreUnavailable`] and are never turned
//! into an empty result.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use memory_core::{BackendError, HistoryBackend, HistoryEntry, MemoryKey, MemoryRole};
use tracing::{debug, error, info, instrument};

use crate::error::{HistoryError, SeedOutcome};

#[derive(Clone)]
pub struct HistoryStore {
    backend: Arc<dyn HistoryBackend>,
    timeout: Duration,
    /// Highest live score handed out; keeps scores non-decreasing if the wall clock steps back.
    last_score: Arc<AtomicI64>,
}

impl HistoryStore {
    pub fn new(backend: Arc<dyn HistoryBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            last_score: Arc::new(AtomicI64::new(0)),
        }
    }

    fn storage_key(key: &MemoryKey) -> Result<String, HistoryError> {
        if key.is_complete() {
            Ok(key.storage_key())
        } else {
            Err(HistoryError::InvalidKey(key.to_string()))
        }
    }

    fn next_score(&self) -> f64 {
        let now = Utc::now().timestamp_millis();
        let previous = self.last_score.fetch_max(now, Ordering::SeqCst);
        previous.max(now) as f64
    }

    async fn guarded<T, F>(&self, op: &'static str, fut: F) -> Result<T, HistoryError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!(op, error = %e, "history store call failed");
                Err(HistoryError::StoreUnavailable(e.to_string()))
            }
            Err(_) => {
                error!(op, timeout_ms = self.timeout.as_millis() as u64, "history store call timed out");
                Err(HistoryError::StoreUnavailable(format!(
                    "{} timed out after {}ms",
                    op,
                    self.timeout.as_millis()
                )))
            }
        }
    }

    /// Appends one line scored by the current time. Durable when this returns `Ok`.
    #[instrument(skip_all, fields(conversation_id = %key.conversation_id, user_id = %key.user_id, text_len = text.len()))]
    pub async fn write(&self, key: &MemoryKey, text: &str) -> Result<(), HistoryError> {
        let storage_key = Self::storage_key(key)?;
        let entry = HistoryEntry::new(self.next_score(), text);
        self.guarded("write", self.backend.append(&storage_key, entry))
            .await?;
        debug!("history entry written");
        Ok(())
    }

    /// Appends `text` prefixed with the role label, e.g. `"User: hi"`.
    pub async fn write_turn(
        &self,
        key: &MemoryKey,
        role: MemoryRole,
        text: &str,
    ) -> Result<(), HistoryError> {
        self.write(key, &role.prefixed(text)).await
    }

    /// The `limit` most recent lines, oldest first. Empty when the key has no history.
    #[instrument(skip_all, fields(conversation_id = %key.conversation_id, user_id = %key.user_id))]
    pub async fn read_recent(&self, key: &MemoryKey, limit: usize) -> Result<Vec<String>, HistoryError> {
        let storage_key = Self::storage_key(key)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let entries = self
            .guarded("read_recent", self.backend.tail(&storage_key, limit))
            .await?;
        debug!(entries = entries.len(), "history window read");
        Ok(entries.into_iter().map(|e| e.text).collect())
    }

    pub async fn exists(&self, key: &MemoryKey) -> Result<bool, HistoryError> {
        let storage_key = Self::storage_key(key)?;
        self.guarded("exists", self.backend.exists(&storage_key)).await
    }

    /// Number of stored lines for `key`.
    pub async fn count(&self, key: &MemoryKey) -> Result<usize, HistoryError> {
        let storage_key = Self::storage_key(key)?;
        self.guarded("count", self.backend.count(&storage_key)).await
    }

    /// Writes the seed transcript if, and only if, the log is empty.
    ///
    /// `content` is split on `delimiter`; blank pieces are skipped and the rest are scored
    /// 0, 1, 2, … so they sort before any live turn. The emptiness check and the insert are
    /// one atomic backend operation, so concurrent seeders write the transcript once.
    #[instrument(skip_all, fields(conversation_id = %key.conversation_id, user_id = %key.user_id))]
    pub async fn seed_if_empty(
        &self,
        key: &MemoryKey,
        content: &str,
        delimiter: &str,
    ) -> Result<SeedOutcome, HistoryError> {
        let storage_key = Self::storage_key(key)?;
        let entries = split_seed(content, delimiter);
        let lines = entries.len();

        let inserted = self
            .guarded("seed_if_empty", self.backend.insert_if_empty(&storage_key, entries))
            .await?;

        if inserted {
            info!(lines, "step: history seeded");
            Ok(SeedOutcome::Seeded { lines })
        } else {
            debug!("history already present, seed skipped");
            Ok(SeedOutcome::AlreadyHadHistory)
        }
    }
}

pub(crate) fn split_seed(content: &str, delimiter: &str) -> Vec<HistoryEntry> {
    let pieces: Vec<&str> = if delimiter.is_empty() {
        vec![content]
    } else {
        content.split(delimiter).collect()
    };
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(i, line)| HistoryEntry::new(i as f64, line))
        .collect()
}
