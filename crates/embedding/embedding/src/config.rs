//! Embedding configuration: trait and env-based implementation.

use anyhow::Result;
use std::env;

/// Which embedding backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// OpenAI-compatible `/embeddings` endpoint.
    OpenAI,
    /// Offline [`crate::HashingEmbedding`]; no network.
    Hashing,
}

/// Embedding service configuration interface.
pub trait EmbeddingConfig: Send + Sync {
    fn provider(&self) -> EmbeddingProvider;
    fn model(&self) -> &str;
    /// API key for OpenAI-compatible embedding (OPENAI_API_KEY).
    fn openai_api_key(&self) -> &str;
    /// Optional base URL for OpenAI-compatible embedding (OPENAI_BASE_URL).
    fn openai_base_url(&self) -> Option<&str>;
}

/// Embedding config loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EnvEmbeddingConfig {
    pub embedding_provider: EmbeddingProvider,
    pub embedding_model: String,
    pub openai_api_key: String,
    pub openai_base_url: Option<String>,
}

impl EmbeddingConfig for EnvEmbeddingConfig {
    fn provider(&self) -> EmbeddingProvider {
        self.embedding_provider
    }
    fn model(&self) -> &str {
        &self.embedding_model
    }
    fn openai_api_key(&self) -> &str {
        &self.openai_api_key
    }
    fn openai_base_url(&self) -> Option<&str> {
        self.openai_base_url.as_deref().filter(|s| !s.is_empty())
    }
}

impl EnvEmbeddingConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self> {
        let embedding_provider = match env::var("EMBEDDING_PROVIDER").as_deref() {
            Ok(p) if p.eq_ignore_ascii_case("hashing") => EmbeddingProvider::Hashing,
            _ => EmbeddingProvider::OpenAI,
        };
        let embedding_model = env::var("EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());
        let openai_api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        let openai_base_url = env::var("OPENAI_BASE_URL").ok().filter(|s| !s.trim().is_empty());
        Ok(Self {
            embedding_provider,
            embedding_model,
            openai_api_key,
            openai_base_url,
        })
    }

    /// Validate config (the OpenAI provider requires OPENAI_API_KEY).
    pub fn validate(&self) -> Result<()> {
        if self.embedding_provider == EmbeddingProvider::OpenAI && self.openai_api_key.is_empty() {
            anyhow::bail!(
                "OPENAI_API_KEY is required when EMBEDDING_PROVIDER=openai (or unset); \
                 set EMBEDDING_PROVIDER=hashing for offline use"
            );
        }
        Ok(())
    }
}
