//! # In-Memory Backends
//!
//! In-process implementations of the `memory-core` backend traits.
//!
//! - [`InMemoryHistoryBackend`] - sorted-set log per storage key
//! - [`InMemoryVectorIndex`] - brute-force cosine search with a mandatory scope filter
//!
//! **Advantages**:
//! - No I/O, deterministic ordering
//! - Outage simulation via `set_available(false)` for failure-path tests
//!
//! **Limitations**:
//! - Data is lost on restart
//! - Linear scans; not meant for large corpora
//!
//! ## Thread Safety
//!
//! Both backends use `Arc<RwLock<>>`; clones share the same data.

mod history;
mod vector;

pub use history::InMemoryHistoryBackend;
pub use vector::InMemoryVectorIndex;
