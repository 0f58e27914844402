//! # Core Types
//!
//! ## MemoryRole
//!
//! Speaker of a history line. History lines are stored role-prefixed
//! (`"User: ..."`, `"Assistant: ..."`), see [`MemoryRole::prefixed`].
//!
//! ## HistoryEntry
//!
//! One member of a conversation's sorted log: a numeric score and the role-prefixed text.
//! Seed lines use synthetic scores `0, 1, 2, ...`; real turns use wall-clock milliseconds,
//! so seed lines always sort first.
//!
//! ## RetrievalDocument / IndexedPassage
//!
//! `IndexedPassage` is what gets written to a vector index; `RetrievalDocument` is what a
//! similarity search hands back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MemoryRole {
    User,
    Assistant,
    System,
}

impl MemoryRole {
    /// Role label as stored in history lines and message records.
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryRole::User => "User",
            MemoryRole::Assistant => "Assistant",
            MemoryRole::System => "System",
        }
    }

    /// Formats `text` as a history line, e.g. `"Assistant: Hello"`.
    pub fn prefixed(&self, text: &str) -> String {
        format!("{}: {}", self.as_str(), text)
    }
}

/// A single scored line in a conversation log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// Sort score: synthetic index for seed lines, epoch milliseconds for live turns.
    pub score: f64,
    /// Role-prefixed utterance.
    pub text: String,
}

impl HistoryEntry {
    pub fn new(score: f64, text: impl Into<String>) -> Self {
        Self {
            score,
            text: text.into(),
        }
    }
}

/// A passage returned by similarity search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievalDocument {
    pub text: String,
    /// Similarity to the query (cosine; higher is closer).
    pub score: f32,
    /// Scope the passage was tagged with at ingestion.
    pub scope_id: String,
}

/// A passage stored in a vector index together with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedPassage {
    pub id: Uuid,
    pub scope_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl IndexedPassage {
    /// Creates a passage with a generated UUID and the current timestamp.
    pub fn new(scope_id: impl Into<String>, text: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            scope_id: scope_id.into(),
            text: text.into(),
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// Cosine similarity of two vectors; 0.0 for empty, zero-norm or mismatched inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
