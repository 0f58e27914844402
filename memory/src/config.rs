//! Tunables for the memory engine.

use std::time::Duration;

/// What to do with text accumulated by a stream that fails mid-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialReplyPolicy {
    /// Forward an apology and persist nothing.
    #[default]
    Discard,
    /// Persist the accumulated text once (history + message record) if it is non-empty.
    Persist,
}

/// Engine configuration. `Default` gives the production values.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryConfig {
    /// Number of history entries read for each turn.
    pub history_window: usize,
    /// Retrieved passages per turn.
    pub retrieval_top_k: usize,
    /// Separator between lines of a persona seed transcript.
    pub seed_delimiter: String,
    /// Estimated-token budget for the assembled prompt.
    pub context_token_budget: usize,
    /// Bound on each history store call. Elapsing is a hard failure.
    pub store_timeout: Duration,
    /// Bound on embedding + vector search. Elapsing degrades to no context.
    pub retrieval_timeout: Duration,
    /// Overall bound on one streamed reply, including waits on the caller's channel.
    pub request_timeout: Duration,
    pub partial_reply_policy: PartialReplyPolicy,
    /// Capacity of the token channel handed to callers.
    pub relay_channel_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            history_window: 30,
            retrieval_top_k: 3,
            seed_delimiter: "\n\n".to_string(),
            context_token_budget: 6000,
            store_timeout: Duration::from_secs(5),
            retrieval_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(120),
            partial_reply_policy: PartialReplyPolicy::Discard,
            relay_channel_capacity: 32,
        }
    }
}
