//! # Prompt
//!
//! Formats an assembled persona turn into text and role-tagged messages for the model.
//!
//! ## Format
//!
//! - **System**: persona instructions, verbatim
//! - **Relevant reference (semantic)**: section title + retrieved passages, one per line
//! - **Conversation (recent)**: section title + history lines (`User: ...`, `Assistant: ...`)
//! - **User**: the new user input
//!
//! The reference section is always emitted (with an empty body when nothing was
//! retrieved) so the model sees a stable layout; the recent section is omitted when empty.
//!
//! ## Usage
//!
//! The `memory` crate's `ContextAssembler` calls [`format_context_block`] and
//! [`render_prompt`]; `llm-client` calls [`build_completion_messages`] before sending.

/// Role of a message, one-to-one with OpenAI Chat Completions API `role` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    /// System instruction (API `role: "system"`).
    System,
    /// User message (API `role: "user"`).
    User,
    /// Assistant message (API `role: "assistant"`).
    Assistant,
}

/// A single chat message, one-to-one with one element of OpenAI `messages` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Section title for semantically retrieved reference passages.
pub const SECTION_SEMANTIC: &str = "Relevant reference (semantic):";

/// Section title for the recent conversation window.
pub const SECTION_RECENT: &str = "Conversation (recent):";

/// Builds the delimited context block: reference passages first, then recent history.
///
/// Each item is written on its own line; items are never split or merged.
pub fn format_context_block<D, H, DI, HI>(documents: D, history: H) -> String
where
    D: IntoIterator<Item = DI>,
    DI: AsRef<str>,
    H: IntoIterator<Item = HI>,
    HI: AsRef<str>,
{
    let mut out = String::new();
    out.push_str(SECTION_SEMANTIC);
    out.push('\n');
    for doc in documents {
        out.push_str(doc.as_ref());
        out.push('\n');
    }

    let mut history = history.into_iter().peekable();
    if history.peek().is_some() {
        out.push('\n');
        out.push_str(SECTION_RECENT);
        out.push('\n');
        for line in history {
            out.push_str(line.as_ref());
            out.push('\n');
        }
    }
    out
}

/// Renders the whole prompt as one string, in order: instructions, context block, user input.
///
/// Used for token estimation and for logging a preview; providers receive
/// [`build_completion_messages`] instead.
pub fn render_prompt(system_instructions: &str, context_block: &str, user_message: &str) -> String {
    let mut out = String::with_capacity(
        system_instructions.len() + context_block.len() + user_message.len() + 4,
    );
    out.push_str(system_instructions);
    out.push_str("\n\n");
    out.push_str(context_block);
    out.push('\n');
    out.push_str(user_message);
    out
}

/// Builds the message list sent to the model.
///
/// # Order
///
/// System(instructions) → System(context block, if non-empty) → User(user_message).
/// Instructions are pushed even when empty so the first message is always the persona.
pub fn build_completion_messages(
    system_instructions: &str,
    context_block: &str,
    user_message: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(3);
    messages.push(ChatMessage::system(system_instructions));
    if !context_block.trim().is_empty() {
        messages.push(ChatMessage::system(context_block));
    }
    messages.push(ChatMessage::user(user_message));
    messages
}
