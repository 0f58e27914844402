//! Fakes shared by the unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use embedding::HashingEmbedding;
use memory_core::MemoryKey;
use memory_inmemory::{InMemoryHistoryBackend, InMemoryVectorIndex};
use storage::{ChatRepository, MessageRecord, NewMessage, PersonaRecord, StorageError, ROLE_ASSISTANT};
use tokio::sync::Mutex;

use crate::config::MemoryConfig;
use crate::session::MemorySession;

pub const MODEL: &str = "llama3-8b-8192";

/// Persona lookup from a fixed list; records every message it is asked to create.
#[derive(Default)]
pub struct RecordingRepository {
    personas: Vec<PersonaRecord>,
    messages: Mutex<Vec<MessageRecord>>,
    fail_writes: bool,
}

impl RecordingRepository {
    pub fn with_persona(persona: PersonaRecord) -> Self {
        Self {
            personas: vec![persona],
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub async fn messages(&self) -> Vec<MessageRecord> {
        self.messages.lock().await.clone()
    }

    pub async fn assistant_messages(&self) -> Vec<MessageRecord> {
        self.messages()
            .await
            .into_iter()
            .filter(|m| m.role == ROLE_ASSISTANT)
            .collect()
    }
}

#[async_trait]
impl ChatRepository for RecordingRepository {
    async fn find_conversation(&self, id: &str) -> Result<Option<PersonaRecord>, StorageError> {
        Ok(self.personas.iter().find(|p| p.id == id).cloned())
    }

    async fn create_message(&self, message: NewMessage) -> Result<MessageRecord, StorageError> {
        if self.fail_writes {
            return Err(StorageError::Database("database is locked".to_string()));
        }
        let record = message.into_record();
        self.messages.lock().await.push(record.clone());
        Ok(record)
    }
}

pub fn persona(id: &str, seed: &str) -> PersonaRecord {
    let now = Utc::now();
    PersonaRecord {
        id: id.to_string(),
        user_id: "owner".to_string(),
        user_name: "Owner".to_string(),
        src: "https://example.com/avatar.png".to_string(),
        name: "Ada".to_string(),
        description: "Mathematician".to_string(),
        instructions: "You are Ada Lovelace.".to_string(),
        seed: seed.to_string(),
        category_id: "cat-1".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn key(conversation: &str, user: &str) -> MemoryKey {
    MemoryKey::new(conversation, user, MODEL)
}

/// In-memory backends behind a session, returned so tests can inspect or break them.
pub struct Fixture {
    pub session: Arc<MemorySession>,
    pub history: InMemoryHistoryBackend,
    pub index: InMemoryVectorIndex,
    pub repository: Arc<RecordingRepository>,
}

pub fn fixture_with(repository: RecordingRepository, config: MemoryConfig) -> Fixture {
    let history = InMemoryHistoryBackend::new();
    let index = InMemoryVectorIndex::new();
    let repository = Arc::new(repository);
    let session = MemorySession::new(
        Arc::new(history.clone()),
        Arc::new(index.clone()),
        Arc::new(HashingEmbedding::default()),
        repository.clone(),
        config,
    );
    Fixture {
        session: Arc::new(session),
        history,
        index,
        repository,
    }
}

pub fn fixture() -> Fixture {
    fixture_with(RecordingRepository::default(), test_config())
}

pub fn test_config() -> MemoryConfig {
    MemoryConfig {
        store_timeout: Duration::from_secs(1),
        retrieval_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_secs(5),
        ..MemoryConfig::default()
    }
}
