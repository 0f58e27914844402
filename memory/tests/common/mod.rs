//! Shared fakes for the memory integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use embedding::HashingEmbedding;
use llm_client::{CompletionProvider, ScriptedProvider};
use memory::{ChatService, MemoryConfig, MemorySession, ModelSettings, SessionProvider};
use memory_core::{BackendError, IndexedPassage, RetrievalDocument, VectorIndex};
use memory_inmemory::{InMemoryHistoryBackend, InMemoryVectorIndex};
use storage::{
    ChatRepository, MessageRecord, NewMessage, PersonaRecord, StorageError, ROLE_ASSISTANT,
    ROLE_USER,
};
use tokio::sync::Mutex;

pub const MODEL: &str = "llama3-8b-8192";
pub const PERSONA_ID: &str = "persona-ada";
pub const SEED: &str = "User: Who are you?\n\nAda: A poet of numbers.";

/// Vector index that fails every call.
pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(&self, _passage: IndexedPassage) -> Result<(), BackendError> {
        Err(BackendError::Unavailable("vector index offline".to_string()))
    }

    async fn search(
        &self,
        _query_embedding: &[f32],
        _scope_id: &str,
        _limit: usize,
    ) -> Result<Vec<RetrievalDocument>, BackendError> {
        Err(BackendError::Unavailable("vector index offline".to_string()))
    }
}

/// Fixed persona list; records created messages.
#[derive(Default)]
pub struct RecordingRepository {
    personas: Vec<PersonaRecord>,
    messages: Mutex<Vec<MessageRecord>>,
}

impl RecordingRepository {
    pub fn with_persona(persona: PersonaRecord) -> Self {
        Self {
            personas: vec![persona],
            ..Self::default()
        }
    }

    pub async fn messages(&self) -> Vec<MessageRecord> {
        self.messages.lock().await.clone()
    }

    pub async fn messages_with_role(&self, role: &str) -> Vec<MessageRecord> {
        self.messages()
            .await
            .into_iter()
            .filter(|m| m.role == role)
            .collect()
    }

    pub async fn assistant_messages(&self) -> Vec<MessageRecord> {
        self.messages_with_role(ROLE_ASSISTANT).await
    }

    pub async fn user_messages(&self) -> Vec<MessageRecord> {
        self.messages_with_role(ROLE_USER).await
    }
}

#[async_trait]
impl ChatRepository for RecordingRepository {
    async fn find_conversation(&self, id: &str) -> Result<Option<PersonaRecord>, StorageError> {
        Ok(self.personas.iter().find(|p| p.id == id).cloned())
    }

    async fn create_message(&self, message: NewMessage) -> Result<MessageRecord, StorageError> {
        let record = message.into_record();
        self.messages.lock().await.push(record.clone());
        Ok(record)
    }
}

pub fn ada() -> PersonaRecord {
    let now = Utc::now();
    PersonaRecord {
        id: PERSONA_ID.to_string(),
        user_id: "owner".to_string(),
        user_name: "Owner".to_string(),
        src: "https://example.com/ada.png".to_string(),
        name: "Ada Lovelace".to_string(),
        description: "First programmer".to_string(),
        instructions: "You are Ada Lovelace. Answer in her voice.".to_string(),
        seed: SEED.to_string(),
        category_id: "cat-scientists".to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn config() -> MemoryConfig {
    MemoryConfig {
        store_timeout: Duration::from_secs(1),
        retrieval_timeout: Duration::from_secs(1),
        request_timeout: Duration::from_secs(5),
        ..MemoryConfig::default()
    }
}

pub fn model() -> ModelSettings {
    ModelSettings {
        model_name: MODEL.to_string(),
        temperature: 0.7,
        max_tokens: 256,
    }
}

/// A chat service over in-memory backends and the given vector index.
pub struct Harness {
    pub service: ChatService,
    pub session: Arc<MemorySession>,
    pub history: InMemoryHistoryBackend,
    pub repository: Arc<RecordingRepository>,
    pub provider: ScriptedProvider,
}

pub fn harness_with_index(provider: ScriptedProvider, index: Arc<dyn VectorIndex>) -> Harness {
    let history = InMemoryHistoryBackend::new();
    let repository = Arc::new(RecordingRepository::with_persona(ada()));
    let session = Arc::new(MemorySession::new(
        Arc::new(history.clone()),
        index,
        Arc::new(HashingEmbedding::default()),
        repository.clone(),
        config(),
    ));
    let sessions = {
        let session = session.clone();
        Arc::new(SessionProvider::new(move || {
            let session = session.clone();
            async move { Ok(clone_session(&session)) }
        }))
    };
    let completion: Arc<dyn CompletionProvider> = Arc::new(provider.clone());
    Harness {
        service: ChatService::new(sessions, completion, model()),
        session,
        history,
        repository,
        provider,
    }
}

pub fn harness(provider: ScriptedProvider) -> Harness {
    harness_with_index(provider, Arc::new(InMemoryVectorIndex::new()))
}

/// A second session over the same backends, so the harness can inspect what the service
/// wrote.
fn clone_session(session: &MemorySession) -> MemorySession {
    MemorySession::from_parts(
        session.history().clone(),
        session.retrieval().clone(),
        session.repository().clone(),
        session.config().clone(),
    )
}
