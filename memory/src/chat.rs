//! Chat request orchestration: identity and rate checks, conversation lookup, turn
//! preparation, prompt assembly, completion and relay.

use std::sync::Arc;

use llm_client::{CompletionProvider, CompletionRequest};
use memory_core::MemoryKey;
use storage::NewMessage;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::context::ContextAssembler;
use crate::error::ChatError;
use crate::rate_limit::RateLimiter;
use crate::relay::{RelayReport, StreamRelay};
use crate::session::{MemorySession, SessionProvider};

/// Completion parameters used for every request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// One inbound chat message. `conversation_id` is the persona id in single-persona mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub conversation_id: String,
    pub user_id: String,
    pub message: String,
}

impl ChatRequest {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            message: message.into(),
        }
    }

    fn rate_limit_identifier(&self) -> String {
        format!("{}-{}", self.conversation_id, self.user_id)
    }
}

/// Everything resolved before the provider is called.
struct PreparedTurn {
    session: Arc<MemorySession>,
    key: MemoryKey,
    request: CompletionRequest,
}

#[derive(Clone)]
pub struct ChatService {
    sessions: Arc<SessionProvider>,
    provider: Arc<dyn CompletionProvider>,
    rate_limiter: Option<Arc<RateLimiter>>,
    model: ModelSettings,
    channel_capacity: usize,
}

impl ChatService {
    pub fn new(
        sessions: Arc<SessionProvider>,
        provider: Arc<dyn CompletionProvider>,
        model: ModelSettings,
    ) -> Self {
        Self {
            sessions,
            provider,
            rate_limiter: None,
            model,
            channel_capacity: crate::config::MemoryConfig::default().relay_channel_capacity,
        }
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Capacity of the channel created by [`ChatService::spawn`].
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn model(&self) -> &ModelSettings {
        &self.model
    }

    /// Handles one message, forwarding reply tokens to `out`.
    ///
    /// `Err` means the request was rejected before the provider was called; the user-facing
    /// text of the error has already been offered on `out`. Once streaming starts the
    /// result is always `Ok`, and a failed stream is described by the report.
    #[instrument(skip_all, fields(conversation_id = %request.conversation_id, user_id = %request.user_id, model = %self.model.model_name))]
    pub async fn handle(
        &self,
        request: ChatRequest,
        out: mpsc::Sender<String>,
    ) -> Result<RelayReport, ChatError> {
        let prepared = match self.prepare(&request).await {
            Ok(prepared) => prepared,
            Err(e) => {
                warn!(error = %e, "chat request rejected");
                let _ = out.try_send(e.user_message().to_string());
                return Err(e);
            }
        };

        let tokens = self.provider.stream(prepared.request).await;
        if let Err(e) = &tokens {
            warn!(error = %e, "completion provider failed to start");
        }
        let report = StreamRelay::for_session(prepared.session, prepared.key)
            .run(tokens, out)
            .await;
        info!(
            state = ?report.state,
            tokens = report.tokens_forwarded,
            persisted = report.persisted,
            "step: chat request finished"
        );
        Ok(report)
    }

    /// Runs [`ChatService::handle`] on its own task and returns the token receiver.
    pub fn spawn(
        &self,
        request: ChatRequest,
    ) -> (mpsc::Receiver<String>, JoinHandle<Result<RelayReport, ChatError>>) {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let service = self.clone();
        let handle = tokio::spawn(async move { service.handle(request, tx).await });
        (rx, handle)
    }

    async fn prepare(&self, request: &ChatRequest) -> Result<PreparedTurn, ChatError> {
        if request.user_id.trim().is_empty() {
            return Err(ChatError::Unauthorized);
        }
        if let Some(limiter) = &self.rate_limiter {
            if !limiter.check(&request.rate_limit_identifier()).await {
                return Err(ChatError::RateLimited);
            }
        }

        let session = self.sessions.get().await.map_err(|e| {
            ChatError::StoreUnavailable(format!("memory session unavailable: {:#}", e))
        })?;
        let persona = session
            .repository()
            .find_conversation(&request.conversation_id)
            .await?
            .ok_or_else(|| ChatError::ConversationNotFound(request.conversation_id.clone()))?;
        info!(persona = %persona.name, "step: conversation resolved");

        // The inbound record is written before history. If the history write then fails, the
        // transcript keeps the user's message and history does not.
        session
            .repository()
            .create_message(NewMessage::user(
                persona.id.as_str(),
                request.user_id.as_str(),
                request.message.as_str(),
            ))
            .await?;

        let key = MemoryKey::new(
            persona.id.as_str(),
            request.user_id.as_str(),
            self.model.model_name.as_str(),
        );
        let seed = Some(persona.seed.as_str()).filter(|s| !s.trim().is_empty());
        let turn = session.prepare_turn(&key, &request.message, seed).await?;

        let payload = ContextAssembler::new(session.config().context_token_budget).assemble(
            &persona.instructions,
            turn.retrieval.documents(),
            &turn.recent_history,
            &request.message,
        );
        info!(
            estimated_tokens = payload.estimated_tokens,
            dropped_history = payload.dropped_history,
            dropped_documents = payload.dropped_documents,
            "step: prompt assembled"
        );

        let request = CompletionRequest {
            system_instructions: payload.instructions.clone(),
            context_block: payload.context_block(),
            user_message: payload.user_input.clone(),
            model_name: self.model.model_name.clone(),
            temperature: self.model.temperature,
            max_tokens: self.model.max_tokens,
        };
        Ok(PreparedTurn {
            session,
            key,
            request,
        })
    }
}
