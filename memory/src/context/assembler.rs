//! Budgeted prompt assembly.

use memory_core::RetrievalDocument;
use tracing::{debug, warn};

use super::utils::estimate_tokens;

/// Assembled input for one completion call.
///
/// Parts, in prompt order: `instructions`, the context block (`documents` then `history`),
/// and `user_input`. Truncation only ever removes whole entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptPayload {
    pub instructions: String,
    /// Retrieved passages, most relevant first.
    pub documents: Vec<String>,
    /// Recent history lines, oldest first.
    pub history: Vec<String>,
    pub user_input: String,
    /// History lines dropped to fit the budget.
    pub dropped_history: usize,
    /// Passages dropped to fit the budget.
    pub dropped_documents: usize,
    pub estimated_tokens: usize,
    /// True when the payload is still over budget after dropping all history and passages.
    pub over_budget: bool,
}

impl PromptPayload {
    /// Delimited block of retrieved passages followed by recent history.
    pub fn context_block(&self) -> String {
        prompt::format_context_block(&self.documents, &self.history)
    }

    /// The whole prompt as one string.
    pub fn render(&self) -> String {
        prompt::render_prompt(&self.instructions, &self.context_block(), &self.user_input)
    }

    fn estimate(&self) -> usize {
        estimate_tokens(&self.render())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAssembler {
    token_budget: usize,
}

impl ContextAssembler {
    pub fn new(token_budget: usize) -> Self {
        Self { token_budget }
    }

    pub fn token_budget(&self) -> usize {
        self.token_budget
    }

    /// Builds the payload, dropping oldest history first, then lowest-ranked passages.
    /// Instructions and user input are never dropped or cut.
    pub fn assemble(
        &self,
        instructions: &str,
        documents: &[RetrievalDocument],
        history: &[String],
        user_input: &str,
    ) -> PromptPayload {
        let mut payload = PromptPayload {
            instructions: instructions.to_string(),
            documents: documents.iter().map(|d| d.text.clone()).collect(),
            history: history.to_vec(),
            user_input: user_input.to_string(),
            dropped_history: 0,
            dropped_documents: 0,
            estimated_tokens: 0,
            over_budget: false,
        };

        let mut tokens = payload.estimate();
        while tokens > self.token_budget && !payload.history.is_empty() {
            payload.history.remove(0);
            payload.dropped_history += 1;
            tokens = payload.estimate();
        }
        while tokens > self.token_budget && !payload.documents.is_empty() {
            payload.documents.pop();
            payload.dropped_documents += 1;
            tokens = payload.estimate();
        }

        payload.estimated_tokens = tokens;
        payload.over_budget = tokens > self.token_budget;
        if payload.over_budget {
            warn!(
                estimated_tokens = tokens,
                budget = self.token_budget,
                "context: instructions and input alone exceed the token budget"
            );
        }
        debug!(
            estimated_tokens = tokens,
            documents = payload.documents.len(),
            history = payload.history.len(),
            dropped_history = payload.dropped_history,
            dropped_documents = payload.dropped_documents,
            "context assembled"
        );
        payload
    }
}
