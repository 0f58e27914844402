//! Backend error type.
//!
//! Raised by [`crate::HistoryBackend`] and [`crate::VectorIndex`] implementations. Callers in
//! the `memory` crate convert it into their own component errors at the boundary.

use thiserror::Error;

/// Errors that can occur inside a storage backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The backend could not be reached or the operation failed in transit. Retryable.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The backend returned data that could not be decoded.
    #[error("corrupt backend data: {0}")]
    Corrupt(String),
}
