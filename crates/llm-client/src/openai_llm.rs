//! OpenAI-compatible streaming implementation of [`CompletionProvider`].

use std::sync::Arc;

use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use prompt::{ChatMessage, MessageRole};
use tracing::{debug, info, instrument, warn};

use crate::{CompletionError, CompletionProvider, CompletionRequest, LlmConfig, TokenStream};

/// Masks an API key/token for safe logging: shows first 7 chars + "***" + last 4 chars.
/// If length <= 11, returns "***" to avoid leaking any part of the key.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_char_boundary(7) || !token.is_char_boundary(len - 4) {
        "***".to_string()
    } else {
        format!("{}***{}", &token[..7], &token[len - 4..])
    }
}

/// Chat completions client for OpenAI and compatible gateways (Groq, local servers).
#[derive(Clone)]
pub struct OpenAILlmClient {
    client: Arc<Client<OpenAIConfig>>,
    masked_key: String,
}

impl OpenAILlmClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, String::new())
    }

    /// Uses `base_url` when non-empty, the default OpenAI endpoint otherwise.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let masked_key = mask_token(&api_key);
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if !base_url.trim().is_empty() {
            config = config.with_api_base(base_url);
        }
        Self {
            client: Arc::new(Client::with_config(config)),
            masked_key,
        }
    }

    pub fn from_config(config: &dyn LlmConfig) -> Self {
        Self::with_base_url(config.api_key().to_string(), config.base_url().to_string())
    }
}

/// Converts a single [`ChatMessage`] into OpenAI API message format.
fn chat_message_to_openai(
    msg: &ChatMessage,
) -> Result<ChatCompletionRequestMessage, async_openai::error::OpenAIError> {
    let content = msg.content.clone();
    let openai_msg: ChatCompletionRequestMessage = match msg.role {
        MessageRole::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()?
            .into(),
        MessageRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()?
            .into(),
    };
    Ok(openai_msg)
}

#[async_trait]
impl CompletionProvider for OpenAILlmClient {
    #[instrument(skip(self, request), fields(model = %request.model_name))]
    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, CompletionError> {
        let messages = request
            .to_messages()
            .iter()
            .map(chat_message_to_openai)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        info!(
            message_count = messages.len(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            api_key = %self.masked_key,
            "step: llm OpenAI create_stream request"
        );

        #[allow(deprecated)]
        let api_request = CreateChatCompletionRequestArgs::default()
            .model(request.model_name.clone())
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .build()
            .map_err(|e| CompletionError::Request(e.to_string()))?;

        if let Ok(json) = serde_json::to_string(&api_request) {
            debug!(request_json = %json, "OpenAI create_stream request JSON");
        }

        let upstream = self
            .client
            .chat()
            .create_stream(api_request)
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI create_stream failed");
                CompletionError::Request(e.to_string())
            })?;

        let tokens = upstream.filter_map(|result| {
            let item = match result {
                Ok(chunk) => {
                    if let Some(ref u) = chunk.usage {
                        info!(
                            prompt_tokens = u.prompt_tokens,
                            completion_tokens = u.completion_tokens,
                            total_tokens = u.total_tokens,
                            "OpenAI stream usage"
                        );
                    }
                    chunk
                        .choices
                        .first()
                        .and_then(|choice| choice.delta.content.clone())
                        .filter(|content| !content.is_empty())
                        .map(Ok)
                }
                Err(e) => Some(Err(CompletionError::Stream(e.to_string()))),
            };
            async move { item }
        });

        Ok(Box::pin(tokens))
    }
}
