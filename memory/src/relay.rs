//! Streams one completion to the caller and persists the finished reply exactly once.
//!
//! ```text
//! Idle ──first token──▶ Streaming ──end of stream──▶ Completed
//!   │                       │
//!   └──── error / timeout / caller gone ──────────▶ Failed
//! ```
//!
//! One control loop pulls tokens, forwards each to the caller's bounded channel (waiting
//! under backpressure, never dropping) and appends it to the accumulator. Persistence runs
//! after the loop, at most once. The token stream and the channel sender are owned by
//! [`StreamRelay::run`], so both are released on every exit path, including when the
//! caller drops the future.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use llm_client::{CompletionError, TokenStream};
use memory_core::MemoryKey;
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::config::PartialReplyPolicy;
use crate::error::ChatError;
use crate::session::MemorySession;

/// Bound on delivering the final apology to a slow caller.
const APOLOGY_SEND_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Streaming,
    Completed,
    Failed,
}

/// Why a relay ended in [`RelayState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFailure {
    /// The provider could not start or broke mid-stream.
    Provider(CompletionError),
    /// The caller's receiver was dropped.
    CallerDisconnected,
    /// The overall request deadline passed.
    TimedOut,
}

impl RelayFailure {
    pub fn to_chat_error(&self) -> ChatError {
        match self {
            RelayFailure::Provider(e) => ChatError::StreamFailure(e.to_string()),
            RelayFailure::CallerDisconnected => {
                ChatError::StreamFailure("caller disconnected".to_string())
            }
            RelayFailure::TimedOut => ChatError::StreamFailure("request timed out".to_string()),
        }
    }
}

/// What happened to one streamed reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayReport {
    pub state: RelayState,
    /// Everything received from the provider.
    pub text: String,
    /// Tokens delivered to the caller (the apology is not counted).
    pub tokens_forwarded: usize,
    pub failure: Option<RelayFailure>,
    /// True when the reply was written to history and the message store.
    pub persisted: bool,
    /// Set when persistence was attempted and failed.
    pub persistence_error: Option<ChatError>,
}

pub struct StreamRelay {
    session: Arc<MemorySession>,
    key: MemoryKey,
    policy: PartialReplyPolicy,
    request_timeout: Duration,
    state: RelayState,
}

impl StreamRelay {
    pub fn new(
        session: Arc<MemorySession>,
        key: MemoryKey,
        policy: PartialReplyPolicy,
        request_timeout: Duration,
    ) -> Self {
        Self {
            session,
            key,
            policy,
            request_timeout,
            state: RelayState::Idle,
        }
    }

    /// Policy and timeout taken from the session's config.
    pub fn for_session(session: Arc<MemorySession>, key: MemoryKey) -> Self {
        let policy = session.config().partial_reply_policy;
        let request_timeout = session.config().request_timeout;
        Self::new(session, key, policy, request_timeout)
    }

    fn advance(&mut self, next: RelayState) {
        debug!(from = ?self.state, to = ?next, "relay state");
        self.state = next;
    }

    /// Drives `tokens` to completion. `tokens` is the result of starting the provider; an
    /// `Err` there is handled as a stream that failed before its first token.
    #[instrument(skip_all, fields(conversation_id = %self.key.conversation_id, user_id = %self.key.user_id, model = %self.key.model_name))]
    pub async fn run(
        mut self,
        tokens: Result<TokenStream, CompletionError>,
        out: mpsc::Sender<String>,
    ) -> RelayReport {
        let deadline = Instant::now() + self.request_timeout;
        let mut text = String::new();
        let mut forwarded = 0usize;

        let failure = match tokens {
            Err(e) => Some(RelayFailure::Provider(e)),
            Ok(mut stream) => {
                let failure = loop {
                    let next = match timeout_at(deadline, stream.next()).await {
                        Ok(next) => next,
                        Err(_) => break Some(RelayFailure::TimedOut),
                    };
                    match next {
                        Some(Ok(token)) => {
                            if token.is_empty() {
                                continue;
                            }
                            if self.state == RelayState::Idle {
                                self.advance(RelayState::Streaming);
                                info!("step: relay first token received");
                            }
                            text.push_str(&token);
                            match timeout_at(deadline, out.send(token)).await {
                                Ok(Ok(())) => forwarded += 1,
                                Ok(Err(_)) => break Some(RelayFailure::CallerDisconnected),
                                Err(_) => break Some(RelayFailure::TimedOut),
                            }
                        }
                        Some(Err(e)) => break Some(RelayFailure::Provider(e)),
                        None => break None,
                    }
                };
                // Release the provider connection before persisting.
                drop(stream);
                failure
            }
        };

        let mut report = match failure {
            None => {
                self.advance(RelayState::Completed);
                info!(tokens = forwarded, text_len = text.len(), "step: relay stream completed");
                RelayReport {
                    state: RelayState::Completed,
                    text,
                    tokens_forwarded: forwarded,
                    failure: None,
                    persisted: false,
                    persistence_error: None,
                }
            }
            Some(failure) => {
                self.advance(RelayState::Failed);
                warn!(failure = ?failure, tokens = forwarded, text_len = text.len(), "relay stream failed");
                if failure != RelayFailure::CallerDisconnected {
                    let apology = failure.to_chat_error().user_message().to_string();
                    if timeout(APOLOGY_SEND_TIMEOUT, out.send(apology)).await.is_err() {
                        debug!("apology not delivered, caller too slow");
                    }
                }
                RelayReport {
                    state: RelayState::Failed,
                    text,
                    tokens_forwarded: forwarded,
                    failure: Some(failure),
                    persisted: false,
                    persistence_error: None,
                }
            }
        };
        // Closes the caller's stream before the persistence round-trips.
        drop(out);

        let should_persist = match report.state {
            RelayState::Completed => true,
            RelayState::Failed => self.policy == PartialReplyPolicy::Persist,
            RelayState::Idle | RelayState::Streaming => false,
        };
        if should_persist && !report.text.trim().is_empty() {
            match self.session.complete_turn(&self.key, &report.text).await {
                Ok(()) => report.persisted = true,
                Err(e) => {
                    error!(error = %e, "relay: persisting reply failed");
                    report.persistence_error = Some(e);
                }
            }
        } else if should_persist {
            debug!("relay: empty reply, nothing persisted");
        }
        report
    }
}
