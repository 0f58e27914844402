//! Unit tests for MessageRepository.
//!
//! Covers create_message, per-user transcript ordering and counting.

use crate::message_repo::MessageRepository;
use crate::models::{NewMessage, ROLE_ASSISTANT, ROLE_USER};
use crate::sqlite_pool::SqlitePoolManager;

async fn repo() -> MessageRepository {
    let pool = SqlitePoolManager::new("sqlite::memory:")
        .await
        .expect("Failed to create pool");
    MessageRepository::new(pool)
}

#[tokio::test]
async fn test_create_message_assigns_id_and_role() {
    let repo = repo().await;

    let record = repo
        .create_message(NewMessage::assistant("persona-1", "user_1", "Hello"))
        .await
        .expect("Failed to save message");

    assert!(!record.id.is_empty());
    assert_eq!(record.role, ROLE_ASSISTANT);
    assert_eq!(record.content, "Hello");
}

#[tokio::test]
async fn test_list_messages_oldest_first_per_user() {
    let repo = repo().await;

    repo.create_message(NewMessage::user("persona-1", "user_1", "first"))
        .await
        .unwrap();
    repo.create_message(NewMessage::assistant("persona-1", "user_1", "second"))
        .await
        .unwrap();
    repo.create_message(NewMessage::user("persona-1", "user_2", "other user"))
        .await
        .unwrap();
    repo.create_message(NewMessage::user("persona-2", "user_1", "other persona"))
        .await
        .unwrap();

    let messages = repo.list_messages("persona-1", "user_1").await.unwrap();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "second"]);
    assert_eq!(messages[0].role, ROLE_USER);
}

#[tokio::test]
async fn test_count_messages_across_users() {
    let repo = repo().await;
    for user in ["a", "b", "c"] {
        repo.create_message(NewMessage::user("persona-1", user, "hi"))
            .await
            .unwrap();
    }
    assert_eq!(repo.count_messages("persona-1").await.unwrap(), 3);
    assert_eq!(repo.count_messages("persona-9").await.unwrap(), 0);
}
