//! Utility functions for context assembly.

/// Estimates the token count for a text string.
///
/// Rough approximation: 1 token ≈ 4 bytes of English text, rounded up, minimum 1.
/// Good enough for budgeting; the provider enforces the real limit.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4).max(1)
}
