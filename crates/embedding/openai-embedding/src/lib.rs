//! # OpenAI Embedding Service
//!
//! [`EmbeddingService`] backed by an OpenAI-compatible `/embeddings` endpoint. Used to embed
//! persona passages at ingest time and user messages at query time; both sides must use the
//! same model or similarity scores are meaningless.
//!
//! ## Configuration
//!
//! - **API Key**: `OPENAI_API_KEY` (falls back to the env var when constructed with an empty key)
//! - **Base URL**: `OPENAI_BASE_URL`, optional, for compatible gateways
//! - **Model**: `EMBEDDING_MODEL`, default `text-embedding-3-small` (1536 dimensions)

use std::time::Duration;

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use embedding::{EmbeddingConfig, EmbeddingService};
use tracing::{debug, info, instrument, warn};

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

const EMBED_TIMEOUT: Duration = Duration::from_secs(30);
// Batch payloads are larger; allow more time.
const EMBED_BATCH_TIMEOUT: Duration = Duration::from_secs(60);
const LOG_PREVIEW_LEN: usize = 200;

/// OpenAI embedding service. Holds the async-openai client and model name.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedding {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIEmbedding {
    /// Creates a service against the default OpenAI endpoint.
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_base_url(api_key, model, None)
    }

    /// Creates a service; when `base_url` is `Some` and non-empty, requests go there instead.
    pub fn new_with_base_url(api_key: String, model: String, base_url: Option<&str>) -> Self {
        let api_key = if api_key.is_empty() {
            std::env::var("OPENAI_API_KEY").unwrap_or_default()
        } else {
            api_key
        };

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url.filter(|s| !s.is_empty()) {
            openai_config = openai_config.with_api_base(url);
        }

        Self {
            client: Client::with_config(openai_config),
            model,
        }
    }

    /// Builds the service from an [`EmbeddingConfig`] (key, base URL and model).
    pub fn from_config(config: &dyn EmbeddingConfig) -> Self {
        let model = if config.model().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model().to_string()
        };
        Self::new_with_base_url(
            config.openai_api_key().to_string(),
            model,
            config.openai_base_url(),
        )
    }

    /// Returns the embedding model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends one embeddings request with `inputs` and returns vectors in input order.
    async fn request(&self, inputs: Vec<&str>, timeout: Duration) -> anyhow::Result<Vec<Vec<f32>>> {
        let expected = inputs.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(inputs)
            .build()?;

        let embeddings = self.client.embeddings();
        let response = match tokio::time::timeout(timeout, embeddings.create(request)).await {
            Ok(Ok(r)) => {
                debug!("OpenAI embeddings response received");
                r
            }
            Ok(Err(e)) => {
                warn!(error = %e, "OpenAI embeddings request failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "OpenAI embeddings request timed out");
                anyhow::bail!(
                    "OpenAI embeddings request timed out after {} seconds",
                    timeout.as_secs()
                );
            }
        };

        let mut data = response.data;
        data.sort_by_key(|item| item.index);
        let vectors: Vec<Vec<f32>> = data.into_iter().map(|item| item.embedding).collect();

        if vectors.len() != expected {
            warn!(expected, got = vectors.len(), "OpenAI embeddings response count mismatch");
            anyhow::bail!("Expected {} embeddings, got {}", expected, vectors.len());
        }
        Ok(vectors)
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(LOG_PREVIEW_LEN) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[async_trait]
impl EmbeddingService for OpenAIEmbedding {
    #[instrument(skip(self, text), fields(model = %self.model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        info!(text_preview = %preview(text), "step: embedding OpenAI embed request");

        let embedding = self
            .request(vec![text], EMBED_TIMEOUT)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No embedding in response"))?;

        info!(dimension = embedding.len(), "step: embedding OpenAI embed done");
        Ok(embedding)
    }

    #[instrument(skip(self, texts), fields(model = %self.model, batch_size = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, anyhow::Error> {
        if texts.is_empty() {
            debug!("OpenAI embed_batch empty input, skipping");
            return Ok(vec![]);
        }

        info!("step: embedding OpenAI embed_batch request");
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embeddings = self.request(inputs, EMBED_BATCH_TIMEOUT).await?;

        info!(
            count = embeddings.len(),
            dimension = embeddings.first().map_or(0, Vec::len),
            "step: embedding OpenAI embed_batch done"
        );
        Ok(embeddings)
    }
}
