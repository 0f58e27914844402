//! # SQLite Backends
//!
//! Persistent implementations of the `memory-core` backend traits.
//!
//! - [`SqliteHistoryBackend`] - sorted-set log table, one row per entry
//! - [`SqliteVectorIndex`] - passages with embedding BLOBs and a scope column
//!
//! Both can share one pool (see [`connect`]).
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE history_entries (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     history_key TEXT NOT NULL,
//!     score REAL NOT NULL,
//!     member TEXT NOT NULL
//! );
//!
//! CREATE TABLE passages (
//!     id TEXT PRIMARY KEY,
//!     scope_id TEXT NOT NULL,
//!     content TEXT NOT NULL,
//!     embedding BLOB NOT NULL,
//!     created_at TEXT NOT NULL
//! );
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use memory_core::{HistoryBackend, HistoryEntry};
//! use memory_sqlite::{connect, SqliteHistoryBackend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = connect("memory.db").await?;
//! let history = SqliteHistoryBackend::from_pool(pool).await?;
//! history.append("history:1:a:1:b:1:c", HistoryEntry::new(1.0, "User: hi")).await?;
//! # Ok(())
//! # }
//! ```

mod history;
mod pool;
mod vector;

pub use history::SqliteHistoryBackend;
pub use pool::{connect, connect_in_memory};
pub use vector::SqliteVectorIndex;
