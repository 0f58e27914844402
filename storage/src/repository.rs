//! The relational collaborator as seen by the chat core.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::message_repo::MessageRepository;
use crate::models::{MessageRecord, NewMessage, PersonaRecord};
use crate::persona_repo::PersonaRepository;
use crate::sqlite_pool::SqlitePoolManager;

/// Conversation lookup and message append.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Returns the persona acting as conversation `id`, if any.
    async fn find_conversation(&self, id: &str) -> Result<Option<PersonaRecord>, StorageError>;

    async fn create_message(&self, message: NewMessage) -> Result<MessageRecord, StorageError>;
}

/// [`ChatRepository`] over the SQLite persona and message repositories.
#[derive(Clone)]
pub struct SqliteChatRepository {
    personas: PersonaRepository,
    messages: MessageRepository,
}

impl SqliteChatRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self {
            personas: PersonaRepository::new(pool_manager.clone()),
            messages: MessageRepository::new(pool_manager),
        }
    }

    pub fn personas(&self) -> &PersonaRepository {
        &self.personas
    }

    pub fn messages(&self) -> &MessageRepository {
        &self.messages
    }
}

#[async_trait]
impl ChatRepository for SqliteChatRepository {
    async fn find_conversation(&self, id: &str) -> Result<Option<PersonaRecord>, StorageError> {
        self.personas.find_persona(id).await
    }

    async fn create_message(&self, message: NewMessage) -> Result<MessageRecord, StorageError> {
        self.messages.create_message(message).await
    }
}
