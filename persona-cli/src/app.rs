//! Wiring: stores, memory session and chat service built from [`AppConfig`].

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use embedding::{EmbeddingProvider, EmbeddingService, EnvEmbeddingConfig, HashingEmbedding};
use llm_client::CompletionProvider;
use memory::{ChatService, MemoryConfig, MemorySession, ModelSettings, RateLimiter, SessionProvider};
use memory_core::MemoryKey;
use memory_sqlite::{connect, connect_in_memory, SqliteHistoryBackend, SqliteVectorIndex};
use openai_embedding::OpenAIEmbedding;
use storage::{
    CategoryRecord, NewPersona, PersonaListing, PersonaRecord, PersonaRepository,
    SqliteChatRepository, SqlitePoolManager,
};
use tracing::info;

use crate::config::AppConfig;

/// Input for [`App::create_persona`]; instructions and seed are file contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaDraft {
    pub user_id: String,
    pub user_name: String,
    pub src: String,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub seed: String,
    /// Category id or name.
    pub category: String,
}

pub fn build_embedder(config: &EnvEmbeddingConfig) -> Result<Arc<dyn EmbeddingService>> {
    config.validate()?;
    let embedder: Arc<dyn EmbeddingService> = match config.embedding_provider {
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedding::from_config(config)),
        EmbeddingProvider::Hashing => Arc::new(HashingEmbedding::default()),
    };
    info!(provider = ?config.embedding_provider, "Embedding service ready");
    Ok(embedder)
}

fn ensure_parent_dir(database_url: &str) -> Result<()> {
    if database_url.starts_with("sqlite::memory:") {
        return Ok(());
    }
    let path = Path::new(database_url.trim_start_matches("sqlite://"));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    Ok(())
}

async fn build_session(
    memory_database_url: String,
    embedding: EnvEmbeddingConfig,
    repository: SqliteChatRepository,
    config: MemoryConfig,
) -> Result<MemorySession> {
    let embedder = build_embedder(&embedding)
        .context("Load embedding config (EMBEDDING_PROVIDER, OPENAI_API_KEY)")?;
    let pool = if memory_database_url.starts_with("sqlite::memory:") {
        connect_in_memory().await?
    } else {
        connect(&memory_database_url).await?
    };
    let history = SqliteHistoryBackend::from_pool(pool.clone()).await?;
    let index = SqliteVectorIndex::from_pool(pool).await?;
    Ok(MemorySession::new(
        Arc::new(history),
        Arc::new(index),
        embedder,
        Arc::new(repository),
        config,
    ))
}

pub struct App {
    config: AppConfig,
    repository: SqliteChatRepository,
    sessions: Arc<SessionProvider>,
}

impl App {
    /// Opens the relational store now; the memory session (and the embedder) is built on
    /// first use, so admin commands run without embedding credentials.
    pub async fn connect(config: AppConfig, embedding: EnvEmbeddingConfig) -> Result<Self> {
        ensure_parent_dir(&config.database_url)?;
        ensure_parent_dir(&config.memory_database_url)?;

        let pool_manager = SqlitePoolManager::new(&config.database_url)
            .await
            .with_context(|| format!("open database {}", config.database_url))?;
        let repository = SqliteChatRepository::new(pool_manager);

        let sessions = {
            let url = config.memory_database_url.clone();
            let repository = repository.clone();
            let memory_config = config.memory.clone();
            Arc::new(SessionProvider::new(move || {
                build_session(
                    url.clone(),
                    embedding.clone(),
                    repository.clone(),
                    memory_config.clone(),
                )
            }))
        };

        Ok(Self {
            config,
            repository,
            sessions,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn personas(&self) -> &PersonaRepository {
        self.repository.personas()
    }

    pub async fn session(&self) -> Result<Arc<MemorySession>> {
        self.sessions.get().await
    }

    pub async fn seed_categories(&self) -> Result<usize> {
        Ok(self.personas().seed_default_categories().await?)
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryRecord>> {
        Ok(self.personas().list_categories().await?)
    }

    async fn category(&self, id_or_name: &str) -> Result<CategoryRecord> {
        self.personas()
            .resolve_category(id_or_name)
            .await?
            .with_context(|| format!("unknown category: {}", id_or_name))
    }

    pub async fn create_persona(&self, draft: PersonaDraft) -> Result<PersonaRecord> {
        let category = self.category(&draft.category).await?;
        let persona = self
            .personas()
            .create_persona(NewPersona {
                user_id: draft.user_id,
                user_name: draft.user_name,
                src: draft.src,
                name: draft.name,
                description: draft.description,
                instructions: draft.instructions,
                seed: draft.seed,
                category_id: category.id,
            })
            .await?;
        Ok(persona)
    }

    pub async fn list_personas(
        &self,
        category: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<PersonaListing>> {
        let category_id = match category {
            Some(c) => Some(self.category(c).await?.id),
            None => None,
        };
        Ok(self
            .personas()
            .list_personas(category_id.as_deref(), search)
            .await?)
    }

    pub async fn delete_persona(&self, id: &str, user_id: &str) -> Result<PersonaRecord> {
        Ok(self.personas().delete_persona(id, user_id).await?)
    }

    async fn require_persona(&self, id: &str) -> Result<PersonaRecord> {
        self.personas()
            .find_persona(id)
            .await?
            .with_context(|| format!("persona not found: {}", id))
    }

    /// Splits `document` into passages and indexes them under the persona's scope.
    pub async fn ingest(&self, persona_id: &str, document: &str) -> Result<usize> {
        let persona = self.require_persona(persona_id).await?;
        let passages = memory::split_passages(document);
        let session = self.session().await?;
        let count = session
            .retrieval()
            .index_document(&persona.id, &passages)
            .await?;
        Ok(count)
    }

    /// Recent history window for the persona and user under the configured model.
    pub async fn history(
        &self,
        persona_id: &str,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<String>> {
        let persona = self.require_persona(persona_id).await?;
        let session = self.session().await?;
        let key = MemoryKey::new(persona.id, user_id, self.config.model_name.as_str());
        let limit = limit.unwrap_or(session.config().history_window);
        Ok(session.history().read_recent(&key, limit).await?)
    }

    pub fn chat_service(
        &self,
        provider: Arc<dyn CompletionProvider>,
        temperature: f32,
        max_tokens: u32,
    ) -> ChatService {
        let model = ModelSettings {
            model_name: self.config.model_name.clone(),
            temperature,
            max_tokens,
        };
        let service = ChatService::new(self.sessions.clone(), provider, model)
            .with_channel_capacity(self.config.memory.relay_channel_capacity);
        if self.config.rate_limit_max_requests == 0 {
            service
        } else {
            service.with_rate_limiter(Arc::new(RateLimiter::new(
                self.config.rate_limit_max_requests,
                self.config.rate_limit_window,
            )))
        }
    }
}
