//! # Memory Crate
//!
//! Conversational memory and context assembly for persona chat.
//!
//! ## Modules
//!
//! - [`history`] - [`HistoryStore`]: per-conversation, time-ordered log with idempotent seeding
//! - [`retrieval`] - [`RetrievalIndex`]: scoped semantic search that degrades instead of failing
//! - [`context`] - [`ContextAssembler`]: budgeted prompt payload, pure
//! - [`relay`] - [`StreamRelay`]: forwards a token stream and persists the reply exactly once
//! - [`session`] - [`MemorySession`] and its lazily built [`SessionProvider`]
//! - [`chat`] - [`ChatService`]: the full request flow behind identity and rate checks
//! - [`rate_limit`] - [`RateLimiter`], fixed window per caller
//! - [`config`] - [`MemoryConfig`]
//! - [`error`] - [`HistoryError`], [`SeedOutcome`], [`IngestError`], [`ChatError`]
//!
//! ## Failure domains
//!
//! History is authoritative: a failed or timed-out read or write is returned to the caller.
//! Retrieval is enrichment: any failure becomes [`RetrievalOutcome::Degraded`] and the turn
//! continues with no extra context.
//!
//! ## External Interactions
//!
//! - **Backends**: `memory-core` traits, implemented by `memory-inmemory` and `memory-sqlite`
//! - **Embeddings**: `embedding::EmbeddingService`
//! - **Completions**: `llm_client::CompletionProvider`
//! - **Relational store**: `storage::ChatRepository` for conversation lookup and message records

pub mod chat;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod rate_limit;
pub mod relay;
pub mod retrieval;
pub mod session;

#[cfg(test)]
mod session_test;
#[cfg(test)]
mod test_support;

pub use chat::{ChatRequest, ChatService, ModelSettings};
pub use config::{MemoryConfig, PartialReplyPolicy};
pub use context::{estimate_tokens, ContextAssembler, PromptPayload};
pub use error::{ChatError, HistoryError, IngestError, SeedOutcome};
pub use history::HistoryStore;
pub use rate_limit::RateLimiter;
pub use relay::{RelayFailure, RelayReport, RelayState, StreamRelay};
pub use retrieval::{split_passages, RetrievalIndex, RetrievalOutcome};
pub use session::{MemorySession, SessionProvider, TurnContext};
