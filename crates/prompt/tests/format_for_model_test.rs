//! Unit tests for `prompt` formatting.
//!
//! Verifies section layout of the context block, prompt rendering order, and message roles.
//! External interactions: none (pure function tests).

use prompt::{
    build_completion_messages, format_context_block, render_prompt, ChatMessage, MessageRole,
    SECTION_RECENT, SECTION_SEMANTIC,
};

/// **Test: Reference passages come before recent history, each on its own line.**
#[test]
fn context_block_orders_reference_then_recent() {
    let block = format_context_block(
        &["Einstein was born in Ulm.", "He played the violin."],
        &["User: Hi", "Assistant: Hello"],
    );
    let semantic_at = block.find(SECTION_SEMANTIC).unwrap();
    let recent_at = block.find(SECTION_RECENT).unwrap();
    assert!(semantic_at < recent_at);
    assert!(block.contains("Einstein was born in Ulm.\nHe played the violin.\n"));
    assert!(block.contains("User: Hi\nAssistant: Hello\n"));
}

/// **Test: With no hits the reference section is present but empty.**
#[test]
fn context_block_keeps_empty_reference_section() {
    let block = format_context_block(&[] as &[&str], &["User: Hi"]);
    assert!(block.starts_with(&format!("{}\n\n{}", SECTION_SEMANTIC, SECTION_RECENT)));
}

/// **Test: With no history the recent section is omitted.**
#[test]
fn context_block_omits_empty_recent_section() {
    let block = format_context_block(&["doc"], &[] as &[&str]);
    assert!(!block.contains(SECTION_RECENT));
    assert_eq!(block, format!("{}\ndoc\n", SECTION_SEMANTIC));
}

/// **Test: format_context_block accepts Vec<String> and Vec<&str>.**
#[test]
fn context_block_accepts_owned_and_borrowed() {
    let docs: Vec<String> = vec!["A".into()];
    let history: Vec<&str> = vec!["B"];
    let block = format_context_block(&docs, &history);
    assert!(block.contains("A\n"));
    assert!(block.contains("B\n"));
}

/// **Test: render_prompt concatenates instructions, context, and user input in that order.**
#[test]
fn render_prompt_order() {
    let out = render_prompt("You are Einstein.", "CTX", "What is time?");
    let i = out.find("You are Einstein.").unwrap();
    let c = out.find("CTX").unwrap();
    let u = out.find("What is time?").unwrap();
    assert!(i < c && c < u);
}

/// **Test: Message list is System(instructions), System(context), User(question).**
#[test]
fn completion_messages_roles() {
    let msgs = build_completion_messages("You are Einstein.", "CTX", "What is time?");
    assert_eq!(
        msgs,
        vec![
            ChatMessage::system("You are Einstein."),
            ChatMessage::system("CTX"),
            ChatMessage::user("What is time?"),
        ]
    );
}

/// **Test: A blank context block is not sent as a message.**
#[test]
fn completion_messages_skip_blank_context() {
    let msgs = build_completion_messages("You are Einstein.", "  \n", "Hi");
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].role, MessageRole::System);
    assert_eq!(msgs[1].role, MessageRole::User);
}
