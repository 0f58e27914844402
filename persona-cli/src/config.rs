//! Application configuration loaded from the environment.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use llm_client::EnvLlmConfig;
use memory::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
use memory::{MemoryConfig, PartialReplyPolicy};

/// Everything the CLI needs besides the LLM and embedding settings, which their own crates
/// load (`EnvLlmConfig`, `EnvEmbeddingConfig`).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Personas, categories and messages.
    pub database_url: String,
    /// History log and passage vectors.
    pub memory_database_url: String,
    pub log_file: String,
    /// Completion model; also the model part of every history key.
    pub model_name: String,
    pub memory: MemoryConfig,
    /// Requests per window per `{conversation}-{user}`; 0 disables limiting.
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
}

impl AppConfig {
    pub const DEFAULT_DATABASE_URL: &'static str = "./data/personas.db";
    pub const DEFAULT_MEMORY_DATABASE_URL: &'static str = "./data/memory.db";
    pub const DEFAULT_LOG_FILE: &'static str = "persona.log";

    pub fn from_env() -> Result<Self> {
        let defaults = MemoryConfig::default();
        let memory = MemoryConfig {
            history_window: parse_or("HISTORY_WINDOW", defaults.history_window)?,
            retrieval_top_k: parse_or("RETRIEVAL_TOP_K", defaults.retrieval_top_k)?,
            context_token_budget: parse_or("CONTEXT_TOKEN_BUDGET", defaults.context_token_budget)?,
            store_timeout: Duration::from_millis(parse_or(
                "STORE_TIMEOUT_MS",
                defaults.store_timeout.as_millis() as u64,
            )?),
            retrieval_timeout: Duration::from_millis(parse_or(
                "RETRIEVAL_TIMEOUT_MS",
                defaults.retrieval_timeout.as_millis() as u64,
            )?),
            request_timeout: Duration::from_secs(parse_or(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            partial_reply_policy: if parse_or("PERSIST_PARTIAL_REPLIES", false)? {
                PartialReplyPolicy::Persist
            } else {
                PartialReplyPolicy::Discard
            },
            ..defaults
        };

        Ok(Self {
            database_url: string_or("DATABASE_URL", Self::DEFAULT_DATABASE_URL),
            memory_database_url: string_or(
                "MEMORY_DATABASE_URL",
                Self::DEFAULT_MEMORY_DATABASE_URL,
            ),
            log_file: string_or("LOG_FILE", Self::DEFAULT_LOG_FILE),
            model_name: string_or("MODEL", EnvLlmConfig::DEFAULT_MODEL),
            memory,
            rate_limit_max_requests: parse_or(
                "RATE_LIMIT_MAX_REQUESTS",
                DEFAULT_MAX_REQUESTS,
            )?,
            rate_limit_window: Duration::from_secs(parse_or(
                "RATE_LIMIT_WINDOW_SECS",
                DEFAULT_WINDOW.as_secs(),
            )?),
        })
    }
}

fn string_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        _ => Ok(default),
    }
}
