//! # Context Assembly
//!
//! [`ContextAssembler`] turns persona instructions, retrieved passages, the recent history
//! window and the new user input into a [`PromptPayload`] that fits the token budget.
//! Pure: no I/O, no clock.

mod assembler;
mod utils;

#[cfg(test)]
mod assembler_test;

pub use assembler::{ContextAssembler, PromptPayload};
pub use utils::estimate_tokens;
