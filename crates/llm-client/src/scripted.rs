//! Deterministic provider that replays a token script.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio::sync::Mutex;

use crate::{CompletionError, CompletionProvider, CompletionRequest, TokenStream};

/// One step of a scripted stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    /// Yield a text delta.
    Token(String),
    /// Yield a stream error; the stream ends afterwards.
    Fail(String),
    /// Never yield again (simulates a hung provider).
    Stall,
}

impl ScriptStep {
    pub fn token(text: impl Into<String>) -> Self {
        ScriptStep::Token(text.into())
    }
}

/// Replays `steps` on every call and records each request it receives.
///
/// With `fail_to_start`, `stream()` itself returns [`CompletionError::Request`].
#[derive(Clone, Default)]
pub struct ScriptedProvider {
    steps: Vec<ScriptStep>,
    token_delay: Option<Duration>,
    fail_to_start: Option<String>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Scripts a successful stream of `tokens`.
    pub fn tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(tokens.into_iter().map(|t| ScriptStep::Token(t.into())).collect())
    }

    /// A provider whose `stream()` call fails before producing anything.
    pub fn failing_to_start(reason: impl Into<String>) -> Self {
        Self {
            fail_to_start: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Sleeps `delay` before each step.
    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = Some(delay);
        self
    }

    /// Requests received so far.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn stream(&self, request: CompletionRequest) -> Result<TokenStream, CompletionError> {
        self.requests.lock().await.push(request);
        if let Some(reason) = &self.fail_to_start {
            return Err(CompletionError::Request(reason.clone()));
        }

        let delay = self.token_delay;
        // Cut the script after the first failure so the stream ends there.
        let end = self
            .steps
            .iter()
            .position(|s| matches!(s, ScriptStep::Fail(_)))
            .map_or(self.steps.len(), |i| i + 1);
        let steps = self.steps[..end].to_vec();

        let tokens = stream::iter(steps).then(move |step| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match step {
                ScriptStep::Token(text) => Ok(text),
                ScriptStep::Fail(reason) => Err(CompletionError::Stream(reason)),
                ScriptStep::Stall => futures::future::pending().await,
            }
        });
        Ok(Box::pin(tokens))
    }
}
