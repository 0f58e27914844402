//! Error and outcome types, one per component boundary.
//!
//! History is authoritative and propagates [`HistoryError`]; retrieval never errors on the
//! query path (see [`crate::RetrievalOutcome`]); the chat façade speaks [`ChatError`].

use storage::StorageError;
use thiserror::Error;

/// Failure of a [`crate::HistoryStore`] call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// The backend failed or timed out. Retryable; never reported as empty history.
    #[error("history store unavailable: {0}")]
    StoreUnavailable(String),
    /// A key field is blank. Precondition violation, not retryable.
    #[error("incomplete memory key: {0}")]
    InvalidKey(String),
}

/// Result of [`crate::HistoryStore::seed_if_empty`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The log was empty and `lines` seed lines were written.
    Seeded { lines: usize },
    /// The log already had entries; nothing was written.
    AlreadyHadHistory,
}

/// Failure while ingesting passages into the retrieval index.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("scope id must not be blank")]
    MissingScope,
    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),
    #[error("vector index failed: {0}")]
    Index(#[from] memory_core::BackendError),
}

/// Terminal failures of a chat request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// Missing caller identity. Rejected before any core logic runs.
    #[error("unauthorized")]
    Unauthorized,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("conversation not found: {0}")]
    ConversationNotFound(String),
    /// History or relational store failure on a write path. Retryable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// The completion provider failed, hung, or the caller went away mid-stream.
    #[error("stream failure: {0}")]
    StreamFailure(String),
}

impl ChatError {
    /// Short text shown to the user in place of a reply.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::Unauthorized => "Sorry, you need to be signed in to chat.",
            ChatError::RateLimited => {
                "Sorry, you are sending messages too quickly. Please wait a moment."
            }
            ChatError::ConversationNotFound(_) => "Sorry, this conversation no longer exists.",
            ChatError::StoreUnavailable(_) => {
                "Sorry, I couldn't save your message. Please try again."
            }
            ChatError::StreamFailure(_) => {
                "Sorry, something went wrong while answering. Please try again."
            }
        }
    }
}

impl From<HistoryError> for ChatError {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::StoreUnavailable(reason) => ChatError::StoreUnavailable(reason),
            // Every key field comes from the caller's identity and the resolved conversation.
            HistoryError::InvalidKey(_) => ChatError::Unauthorized,
        }
    }
}

impl From<StorageError> for ChatError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(what) => ChatError::ConversationNotFound(what),
            StorageError::Forbidden(_) => ChatError::Unauthorized,
            other => ChatError::StoreUnavailable(other.to_string()),
        }
    }
}
