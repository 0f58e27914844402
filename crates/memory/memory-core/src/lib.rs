//! # memory-core
//!
//! Core types and traits shared by the conversation memory crates.
//!
//! ## Modules
//!
//! - [`key`] - [`MemoryKey`], the composite identity scoping every history and retrieval call
//! - [`types`] - [`HistoryEntry`], [`MemoryRole`], [`RetrievalDocument`], [`IndexedPassage`]
//! - [`store`] - Backend traits: [`HistoryBackend`] (sorted-set log) and [`VectorIndex`]
//! - [`error`] - [`BackendError`], raised by backend implementations
//!
//! ## External Interactions
//!
//! Backends are implemented by `memory-inmemory` (tests, local dev) and `memory-sqlite`
//! (durable). The `memory` crate wraps them with its failure-domain policy.

pub mod error;
pub mod key;
pub mod store;
pub mod types;

pub use error::BackendError;
pub use key::{KeyParseError, MemoryKey};
pub use store::{HistoryBackend, VectorIndex};
pub use types::{cosine_similarity, HistoryEntry, IndexedPassage, MemoryRole, RetrievalDocument};
