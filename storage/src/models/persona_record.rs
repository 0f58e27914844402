//! Persona record model.
//!
//! A persona is a configured chat character: display data (`src`, `name`, `description`),
//! static `instructions` sent as the system prompt, and a `seed` transcript used to seed
//! each new conversation's history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PersonaRecord {
    pub id: String,
    /// Owner; only the owner may update or delete.
    pub user_id: String,
    pub user_name: String,
    /// Avatar image URL.
    pub src: String,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub seed: String,
    pub category_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persona plus the number of stored messages, as shown in listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaListing {
    pub persona: PersonaRecord,
    pub message_count: i64,
}

/// Input for create/update. Every field is required.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewPersona {
    pub user_id: String,
    pub user_name: String,
    pub src: String,
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub seed: String,
    pub category_id: String,
}

impl NewPersona {
    /// Rejects blank identity or any blank content field.
    pub fn validate(&self) -> Result<(), StorageError> {
        let fields = [
            ("user_id", &self.user_id),
            ("user_name", &self.user_name),
            ("src", &self.src),
            ("name", &self.name),
            ("description", &self.description),
            ("instructions", &self.instructions),
            ("seed", &self.seed),
            ("category_id", &self.category_id),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StorageError::Invalid(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}
