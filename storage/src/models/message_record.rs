//! Chat message record model.
//!
//! Maps to the `messages` table and is used by MessageRepository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageRecord {
    pub id: String,
    /// Persona id (a persona doubles as the conversation).
    pub conversation_id: String,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Input for `create_message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation_id: String,
    pub role: String,
    pub content: String,
    pub user_id: String,
}

impl NewMessage {
    pub fn user(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            role: ROLE_USER.to_string(),
            content: content.into(),
            user_id: user_id.into(),
        }
    }

    pub fn assistant(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: ROLE_ASSISTANT.to_string(),
            ..Self::user(conversation_id, user_id, content)
        }
    }

    /// Creates the record with a generated UUID and current timestamp.
    pub fn into_record(self) -> MessageRecord {
        MessageRecord {
            id: Uuid::new_v4().to_string(),
            conversation_id: self.conversation_id,
            role: self.role,
            content: self.content,
            user_id: self.user_id,
            created_at: Utc::now(),
        }
    }
}
