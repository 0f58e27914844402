//! Storage crate: relational persistence for personas, categories and chat messages.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – PersonaRecord, CategoryRecord, MessageRecord and their inputs
//! - [`repository`] – ChatRepository trait (what the chat core reads/writes)
//! - [`persona_repo`] – PersonaRepository (SQLite): categories and personas
//! - [`message_repo`] – MessageRepository (SQLite): chat transcript
//! - [`sqlite_pool`] – SqlitePoolManager, schema creation

mod error;
mod message_repo;
mod models;
mod persona_repo;
mod repository;
mod sqlite_pool;

#[cfg(test)]
mod message_repo_test;

pub use error::StorageError;
pub use message_repo::MessageRepository;
pub use models::{
    CategoryRecord, MessageRecord, NewMessage, NewPersona, PersonaListing, PersonaRecord,
    DEFAULT_CATEGORIES, ROLE_ASSISTANT, ROLE_USER,
};
pub use persona_repo::PersonaRepository;
pub use repository::{ChatRepository, SqliteChatRepository};
pub use sqlite_pool::SqlitePoolManager;
