//! Unit tests for MemorySession (turn preparation and completion) and SessionProvider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use embedding::HashingEmbedding;
use memory_inmemory::{InMemoryHistoryBackend, InMemoryVectorIndex};

use crate::error::{ChatError, HistoryError, SeedOutcome};
use crate::session::{MemorySession, SessionProvider};
use crate::test_support::{fixture, key, test_config, RecordingRepository};

const SEED: &str = "User: Who are you?\n\nAda: I write programs for engines that do not exist yet.";

/// **Test: first turn seeds, records the user line and sees it in its own window.**
///
/// **Setup:** Empty in-memory history; persona seed of two lines.
///
/// **Action:** `prepare_turn` with the seed.
///
/// **Expected:** `Seeded { lines: 2 }`; window = seed lines then `"User: hello"`.
#[tokio::test]
async fn test_prepare_turn_seeds_then_writes_user_line() {
    let fx = fixture();
    let k = key("persona-1", "user_1");

    let turn = fx
        .session
        .prepare_turn(&k, "hello", Some(SEED))
        .await
        .unwrap();

    assert_eq!(turn.seed, Some(SeedOutcome::Seeded { lines: 2 }));
    assert_eq!(
        turn.recent_history,
        vec![
            "User: Who are you?",
            "Ada: I write programs for engines that do not exist yet.",
            "User: hello",
        ]
    );
    assert_eq!(turn.recent_history_text().lines().count(), 3);
    assert!(!turn.retrieval.is_degraded());
    assert_eq!(turn.retrieved_context(), "");
}

#[tokio::test]
async fn test_second_turn_does_not_reseed() {
    let fx = fixture();
    let k = key("persona-1", "user_1");

    fx.session.prepare_turn(&k, "one", Some(SEED)).await.unwrap();
    let turn = fx.session.prepare_turn(&k, "two", Some(SEED)).await.unwrap();

    assert_eq!(turn.seed, Some(SeedOutcome::AlreadyHadHistory));
    assert_eq!(fx.session.history().count(&k).await.unwrap(), 4);
    assert_eq!(turn.recent_history.last().map(String::as_str), Some("User: two"));
}

#[tokio::test]
async fn test_prepare_turn_without_seed() {
    let fx = fixture();
    let turn = fx
        .session
        .prepare_turn(&key("persona-1", "user_1"), "hi", None)
        .await
        .unwrap();
    assert_eq!(turn.seed, None);
    assert_eq!(turn.recent_history, vec!["User: hi"]);
}

/// **Test: two users of the same persona get separate histories and separate seeding.**
#[tokio::test]
async fn test_users_do_not_share_history() {
    let fx = fixture();
    let alice = key("persona-1", "alice");
    let bob = key("persona-1", "bob");

    fx.session.prepare_turn(&alice, "from alice", Some(SEED)).await.unwrap();
    let turn = fx.session.prepare_turn(&bob, "from bob", Some(SEED)).await.unwrap();

    assert_eq!(turn.seed, Some(SeedOutcome::Seeded { lines: 2 }));
    assert!(!turn.recent_history.iter().any(|l| l.contains("alice")));
}

/// **Test: retrieval outage degrades to empty context; the turn still succeeds.**
///
/// **Setup:** Vector index marked unavailable.
///
/// **Action:** `prepare_turn`.
///
/// **Expected:** `Ok`, retrieval degraded, `retrieved_context() == ""`, user line written.
#[tokio::test]
async fn test_retrieval_outage_degrades() {
    let fx = fixture();
    fx.index.set_available(false);
    let k = key("persona-1", "user_1");

    let turn = fx.session.prepare_turn(&k, "hello", None).await.unwrap();

    assert!(turn.retrieval.is_degraded());
    assert_eq!(turn.retrieved_context(), "");
    assert_eq!(turn.recent_history, vec!["User: hello"]);
}

#[tokio::test]
async fn test_retrieval_is_scoped_to_conversation() {
    let fx = fixture();
    fx.session
        .retrieval()
        .index_document(
            "persona-1",
            &["The Analytical Engine weaves algebraic patterns.".to_string()],
        )
        .await
        .unwrap();
    fx.session
        .retrieval()
        .index_document("persona-2", &["Relativity of simultaneity.".to_string()])
        .await
        .unwrap();

    let turn = fx
        .session
        .prepare_turn(&key("persona-1", "user_1"), "Tell me about the engine", None)
        .await
        .unwrap();

    assert_eq!(
        turn.retrieved_context(),
        "The Analytical Engine weaves algebraic patterns."
    );
}

/// **Test: history outage fails the turn instead of returning an empty window.**
#[tokio::test]
async fn test_history_outage_fails_turn() {
    let fx = fixture();
    fx.history.set_available(false);

    let err = fx
        .session
        .prepare_turn(&key("persona-1", "user_1"), "hello", Some(SEED))
        .await
        .unwrap_err();
    assert!(matches!(err, HistoryError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_complete_turn_writes_history_and_record() {
    let fx = fixture();
    let k = key("persona-1", "user_1");

    fx.session.complete_turn(&k, "Hello").await.unwrap();

    assert_eq!(
        fx.session.history().read_recent(&k, 30).await.unwrap(),
        vec!["Assistant: Hello"]
    );
    let assistant = fx.repository.assistant_messages().await;
    assert_eq!(assistant.len(), 1);
    assert_eq!(assistant[0].content, "Hello");
}

#[tokio::test]
async fn test_complete_turn_skips_blank_text() {
    let fx = fixture();
    let k = key("persona-1", "user_1");

    fx.session.complete_turn(&k, "  \n").await.unwrap();

    assert!(!fx.session.history().exists(&k).await.unwrap());
    assert!(fx.repository.messages().await.is_empty());
}

#[tokio::test]
async fn test_complete_turn_history_failure_creates_no_record() {
    let fx = fixture();
    fx.history.set_available(false);

    let err = fx
        .session
        .complete_turn(&key("persona-1", "user_1"), "Hello")
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::StoreUnavailable(_)));
    assert!(fx.repository.messages().await.is_empty());
}

fn build_session() -> MemorySession {
    MemorySession::new(
        Arc::new(InMemoryHistoryBackend::new()),
        Arc::new(InMemoryVectorIndex::new()),
        Arc::new(HashingEmbedding::default()),
        Arc::new(RecordingRepository::default()),
        test_config(),
    )
}

/// **Test: concurrent first callers share one build.**
///
/// **Setup:** Provider whose builder counts invocations and sleeps briefly.
///
/// **Action:** 16 concurrent `get()` calls.
///
/// **Expected:** Builder ran once; every caller got the same instance.
#[tokio::test]
async fn test_provider_builds_once_under_race() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = builds.clone();
    let provider = Arc::new(SessionProvider::new(move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(build_session())
        }
    }));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let provider = provider.clone();
        handles.push(tokio::spawn(async move { provider.get().await.unwrap() }));
    }
    let mut sessions = Vec::new();
    for handle in handles {
        sessions.push(handle.await.unwrap());
    }

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert!(sessions.iter().all(|s| Arc::ptr_eq(s, &sessions[0])));
    assert!(provider.is_initialized());
}

/// **Test: a failed build is not cached; the next caller retries.**
#[tokio::test]
async fn test_provider_failed_build_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let provider = SessionProvider::new(move || {
        let attempt = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if attempt == 0 {
                Err(anyhow::anyhow!("history store refused connection"))
            } else {
                Ok(build_session())
            }
        }
    });

    assert!(provider.get().await.is_err());
    assert!(!provider.is_initialized());

    assert!(provider.get().await.is_ok());
    assert!(provider.is_initialized());
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_ready_provider_skips_build() {
    let provider = SessionProvider::ready(build_session());
    assert!(provider.is_initialized());
    let a = provider.get().await.unwrap();
    let b = provider.get().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}
