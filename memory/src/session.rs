//! Per-process memory session: history, retrieval and the relational store behind one
//! handle, built lazily on first use.

use std::future::Future;
use std::sync::Arc;

use embedding::EmbeddingService;
use futures::future::{BoxFuture, FutureExt};
use memory_core::{HistoryBackend, MemoryKey, MemoryRole, VectorIndex};
use storage::{ChatRepository, NewMessage};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::config::MemoryConfig;
use crate::error::{ChatError, HistoryError, SeedOutcome};
use crate::history::HistoryStore;
use crate::retrieval::{RetrievalIndex, RetrievalOutcome};

/// Everything a turn needs before the prompt is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnContext {
    /// Set when a seed transcript was offered for this turn.
    pub seed: Option<SeedOutcome>,
    /// Most recent history entries, oldest first. Includes the user line just written.
    pub recent_history: Vec<String>,
    pub retrieval: RetrievalOutcome,
}

impl TurnContext {
    /// History lines joined by newlines.
    pub fn recent_history_text(&self) -> String {
        self.recent_history.join("\n")
    }

    /// Retrieved passages joined by newlines; `""` when degraded or empty.
    pub fn retrieved_context(&self) -> String {
        self.retrieval.joined_text()
    }
}

pub struct MemorySession {
    history: HistoryStore,
    retrieval: RetrievalIndex,
    repository: Arc<dyn ChatRepository>,
    config: MemoryConfig,
}

impl MemorySession {
    pub fn new(
        history_backend: Arc<dyn HistoryBackend>,
        vector_index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingService>,
        repository: Arc<dyn ChatRepository>,
        config: MemoryConfig,
    ) -> Self {
        let history = HistoryStore::new(history_backend, config.store_timeout);
        let retrieval = RetrievalIndex::new(
            embedder,
            vector_index,
            config.retrieval_top_k,
            config.retrieval_timeout,
        );
        Self {
            history,
            retrieval,
            repository,
            config,
        }
    }

    /// Assembles a session from already built components.
    pub fn from_parts(
        history: HistoryStore,
        retrieval: RetrievalIndex,
        repository: Arc<dyn ChatRepository>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            history,
            retrieval,
            repository,
            config,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn retrieval(&self) -> &RetrievalIndex {
        &self.retrieval
    }

    pub fn repository(&self) -> &Arc<dyn ChatRepository> {
        &self.repository
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Seeds an empty log, records the user's line, then reads the window and searches.
    ///
    /// History failures abort the turn. Retrieval failures come back as
    /// [`RetrievalOutcome::Degraded`] inside the context.
    #[instrument(skip_all, fields(conversation_id = %key.conversation_id, user_id = %key.user_id))]
    pub async fn prepare_turn(
        &self,
        key: &MemoryKey,
        user_text: &str,
        seed: Option<&str>,
    ) -> Result<TurnContext, HistoryError> {
        let seed = match seed {
            Some(content) => Some(
                self.history
                    .seed_if_empty(key, content, &self.config.seed_delimiter)
                    .await?,
            ),
            None => None,
        };
        debug!(seed = ?seed, "step: seed checked");

        self.history
            .write_turn(key, MemoryRole::User, user_text)
            .await?;
        let recent_history = self
            .history
            .read_recent(key, self.config.history_window)
            .await?;
        let retrieval = self.retrieval.search(user_text, key.scope_id()).await;

        info!(
            history = recent_history.len(),
            retrieved = retrieval.documents().len(),
            degraded = retrieval.is_degraded(),
            "step: turn context ready"
        );
        Ok(TurnContext {
            seed,
            recent_history,
            retrieval,
        })
    }

    /// Records a finished assistant reply in history and in the message store.
    ///
    /// Blank text is not recorded. History is written first; if it fails no message record
    /// is created.
    #[instrument(skip_all, fields(conversation_id = %key.conversation_id, text_len = text.len()))]
    pub async fn complete_turn(&self, key: &MemoryKey, text: &str) -> Result<(), ChatError> {
        if text.trim().is_empty() {
            debug!("complete_turn: blank reply, skipped");
            return Ok(());
        }
        self.history
            .write_turn(key, MemoryRole::Assistant, text)
            .await?;
        self.repository
            .create_message(NewMessage::assistant(
                key.conversation_id.as_str(),
                key.user_id.as_str(),
                text,
            ))
            .await?;
        info!("step: assistant reply persisted");
        Ok(())
    }
}

type SessionBuilder =
    Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<MemorySession>> + Send + Sync>;

/// Process-wide lazily built [`MemorySession`].
///
/// Concurrent first callers share one build. A failed build leaves the provider empty so
/// the next call retries.
pub struct SessionProvider {
    cell: OnceCell<Arc<MemorySession>>,
    build: SessionBuilder,
}

impl SessionProvider {
    pub fn new<F, Fut>(build: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<MemorySession>> + Send + 'static,
    {
        Self {
            cell: OnceCell::new(),
            build: Box::new(move || build().boxed()),
        }
    }

    /// Provider that is already initialized with `session`.
    pub fn ready(session: MemorySession) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Arc::new(session))),
            build: Box::new(|| {
                async { Err::<MemorySession, _>(anyhow::anyhow!("session provider was built ready")) }
                    .boxed()
            }),
        }
    }

    pub async fn get(&self) -> anyhow::Result<Arc<MemorySession>> {
        let session = self
            .cell
            .get_or_try_init(|| async {
                info!("building memory session");
                let session = (self.build)().await?;
                Ok::<_, anyhow::Error>(Arc::new(session))
            })
            .await?;
        Ok(Arc::clone(session))
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
