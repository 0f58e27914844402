//! # Completion provider abstraction
//!
//! Defines [`CompletionProvider`], which turns a [`CompletionRequest`] into a pull-based
//! [`TokenStream`] of text deltas. The stream ends with `None` on normal completion or
//! yields `Err` on a provider failure; consumers drive it with `StreamExt::next`.
//!
//! Implementations: [`OpenAILlmClient`] (any OpenAI-compatible endpoint) and
//! [`ScriptedProvider`] (replays a fixed token script, for tests and offline runs).

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

mod config;
mod openai_llm;
mod scripted;

pub use config::{EnvLlmConfig, LlmConfig};
pub use openai_llm::{mask_token, OpenAILlmClient};
pub use scripted::{ScriptStep, ScriptedProvider};

/// Errors raised by a completion provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompletionError {
    /// The request could not be started (bad config, connection refused, rejected request).
    #[error("completion request failed: {0}")]
    Request(String),

    /// The stream broke after it started.
    #[error("completion stream failed: {0}")]
    Stream(String),
}

/// Incremental text deltas from the provider.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, CompletionError>> + Send>>;

/// One completion call: persona instructions, assembled context and the new user message.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_instructions: String,
    pub context_block: String,
    pub user_message: String,
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Role-tagged messages for chat-style APIs.
    pub fn to_messages(&self) -> Vec<prompt::ChatMessage> {
        prompt::build_completion_messages(
            &self.system_instructions,
            &self.context_block,
            &self.user_message,
        )
    }
}

/// Streaming text-completion source.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Starts a streamed completion. Errors here mean no token was produced.
    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, CompletionError>;
}
