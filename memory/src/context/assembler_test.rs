//! Unit tests for `ContextAssembler`: part order and whole-entry truncation.

use memory_core::RetrievalDocument;
use prompt::{SECTION_RECENT, SECTION_SEMANTIC};

use super::*;

fn doc(text: &str, score: f32) -> RetrievalDocument {
    RetrievalDocument {
        text: text.to_string(),
        score,
        scope_id: "p".to_string(),
    }
}

fn lines(prefix: &str, n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{} {:02} {}", prefix, i, "x".repeat(36))).collect()
}

#[test]
fn test_parts_in_order() {
    let payload = ContextAssembler::new(10_000).assemble(
        "You are Albert Einstein.",
        &[doc("Einstein was born in Ulm.", 0.9)],
        &["User: hi".to_string(), "Assistant: hello".to_string()],
        "What is time?",
    );
    let rendered = payload.render();
    let positions: Vec<usize> = [
        "You are Albert Einstein.",
        SECTION_SEMANTIC,
        "Einstein was born in Ulm.",
        SECTION_RECENT,
        "User: hi",
        "Assistant: hello",
        "What is time?",
    ]
    .iter()
    .map(|needle| rendered.find(needle).unwrap())
    .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", rendered);
    assert!(!payload.over_budget);
    assert_eq!(payload.dropped_history, 0);
}

#[test]
fn test_no_hits_gives_empty_reference_block() {
    let payload = ContextAssembler::new(10_000).assemble("I", &[], &[], "Q");
    assert!(payload.documents.is_empty());
    assert!(payload.context_block().starts_with(SECTION_SEMANTIC));
}

#[test]
fn test_history_dropped_oldest_first_before_documents() {
    let history = lines("User: line", 20);
    let docs = vec![doc("doc one", 0.9), doc("doc two", 0.5)];
    let full = ContextAssembler::new(100_000).assemble("I", &docs, &history, "Q");
    // Room for everything except about five history lines.
    let budget = full.estimated_tokens - 50;

    let payload = ContextAssembler::new(budget).assemble("I", &docs, &history, "Q");
    assert!(payload.estimated_tokens <= budget);
    assert!(payload.dropped_history > 0);
    assert_eq!(payload.dropped_documents, 0);
    assert_eq!(payload.documents.len(), 2);
    // Survivors are the newest lines, still in order, each intact.
    assert_eq!(payload.history, history[payload.dropped_history..].to_vec());
}

#[test]
fn test_documents_dropped_lowest_rank_after_history() {
    let history = lines("User: line", 3);
    let docs = vec![
        doc(&format!("best {}", "d".repeat(200)), 0.9),
        doc(&format!("worst {}", "d".repeat(200)), 0.1),
    ];
    let instructions = "You are Einstein.";
    let best: Vec<String> = docs[..1].iter().map(|d| d.text.clone()).collect();
    let no_history: &[&str] = &[];
    let budget = crate::context::estimate_tokens(&prompt::render_prompt(
        instructions,
        &prompt::format_context_block(&best, no_history),
        "Q",
    ));

    let payload = ContextAssembler::new(budget).assemble(instructions, &docs, &history, "Q");
    assert_eq!(payload.dropped_history, 3);
    assert_eq!(payload.dropped_documents, 1);
    assert_eq!(payload.documents, vec![docs[0].text.clone()]);
    assert!(!payload.over_budget);
}

#[test]
fn test_instructions_never_truncated() {
    let instructions = "Stay in character. ".repeat(200);
    let payload = ContextAssembler::new(50).assemble(
        &instructions,
        &[doc("doc", 0.5)],
        &["User: hi".to_string()],
        "Q",
    );
    assert_eq!(payload.instructions, instructions);
    assert!(payload.history.is_empty());
    assert!(payload.documents.is_empty());
    assert!(payload.over_budget);
    assert!(payload.render().contains(&instructions));
}
