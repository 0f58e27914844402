//! Composite identity for conversation memory.
//!
//! A [`MemoryKey`] names one conversation log: the persona (or conversation) being talked to,
//! the user talking to it, and the model producing replies. Two keys that differ in any
//! field never share history or seeding state.
//!
//! ## Storage key format
//!
//! ```text
//! history:<len>:<conversation_id>:<len>:<user_id>:<len>:<model_name>
//! ```
//!
//! Every field is prefixed by its byte length, so field contents may contain `:` or `-`
//! freely and the encoding stays injective. [`MemoryKey::parse`] is the exact inverse.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const KEY_PREFIX: &str = "history:";

/// Composite identity `{conversation_id, user_id, model_name}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryKey {
    /// Conversation id; in single-persona mode this is the persona id.
    pub conversation_id: String,
    pub user_id: String,
    pub model_name: String,
}

/// Returned by [`MemoryKey::parse`] for strings not produced by [`MemoryKey::storage_key`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed memory key at byte {offset}: {reason}")]
pub struct KeyParseError {
    pub offset: usize,
    pub reason: &'static str,
}

impl MemoryKey {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            model_name: model_name.into(),
        }
    }

    /// True when no field is blank. Incomplete keys are rejected before touching a store.
    pub fn is_complete(&self) -> bool {
        !self.conversation_id.trim().is_empty()
            && !self.user_id.trim().is_empty()
            && !self.model_name.trim().is_empty()
    }

    /// Scope used to filter retrieval: only documents tagged with this id are searched.
    pub fn scope_id(&self) -> &str {
        &self.conversation_id
    }

    /// Serializes the key into the single string used by history backends.
    pub fn storage_key(&self) -> String {
        let mut out = String::with_capacity(
            KEY_PREFIX.len()
                + self.conversation_id.len()
                + self.user_id.len()
                + self.model_name.len()
                + 16,
        );
        out.push_str(KEY_PREFIX);
        for (i, field) in [&self.conversation_id, &self.user_id, &self.model_name]
            .into_iter()
            .enumerate()
        {
            if i > 0 {
                out.push(':');
            }
            out.push_str(&field.len().to_string());
            out.push(':');
            out.push_str(field);
        }
        out
    }

    /// Inverse of [`MemoryKey::storage_key`].
    pub fn parse(raw: &str) -> Result<Self, KeyParseError> {
        let rest = raw.strip_prefix(KEY_PREFIX).ok_or(KeyParseError {
            offset: 0,
            reason: "missing prefix",
        })?;
        let mut offset = KEY_PREFIX.len();
        let mut rest = rest;
        let mut fields: Vec<String> = Vec::with_capacity(3);

        for i in 0..3 {
            if i > 0 {
                rest = rest.strip_prefix(':').ok_or(KeyParseError {
                    offset,
                    reason: "expected field separator",
                })?;
                offset += 1;
            }
            let colon = rest.find(':').ok_or(KeyParseError {
                offset,
                reason: "missing length terminator",
            })?;
            let len: usize = rest[..colon].parse().map_err(|_| KeyParseError {
                offset,
                reason: "invalid field length",
            })?;
            offset += colon + 1;
            rest = &rest[colon + 1..];
            let field = rest.get(..len).ok_or(KeyParseError {
                offset,
                reason: "field shorter than declared length",
            })?;
            fields.push(field.to_string());
            offset += len;
            rest = &rest[len..];
        }

        if !rest.is_empty() {
            return Err(KeyParseError {
                offset,
                reason: "trailing bytes",
            });
        }

        let model_name = fields.pop().unwrap_or_default();
        let user_id = fields.pop().unwrap_or_default();
        let conversation_id = fields.pop().unwrap_or_default();
        Ok(Self {
            conversation_id,
            user_id,
            model_name,
        })
    }
}

impl fmt::Display for MemoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
