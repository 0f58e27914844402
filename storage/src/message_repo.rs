//! Message repository: the per-user chat transcript of each persona.
//!
//! External: SQLite via sqlx; callers use create_message/list_messages.

use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::{MessageRecord, NewMessage};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct MessageRepository {
    pool_manager: SqlitePoolManager,
}

impl MessageRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }

    pub async fn create_message(&self, message: NewMessage) -> Result<MessageRecord, StorageError> {
        let record = message.into_record();

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, user_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.conversation_id)
        .bind(&record.role)
        .bind(&record.content)
        .bind(&record.user_id)
        .bind(record.created_at)
        .execute(self.pool_manager.pool())
        .await?;

        debug!(
            message_id = %record.id,
            conversation_id = %record.conversation_id,
            role = %record.role,
            content_len = record.content.len(),
            "Saved message"
        );
        Ok(record)
    }

    /// Transcript of one user with one persona, oldest first.
    pub async fn list_messages(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Vec<MessageRecord>, StorageError> {
        let messages = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT id, conversation_id, role, content, user_id, created_at FROM messages
            WHERE conversation_id = ? AND user_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_all(self.pool_manager.pool())
        .await?;

        info!(
            "Retrieved {} messages for conversation {}",
            messages.len(),
            conversation_id
        );
        Ok(messages)
    }

    /// Number of messages stored for `conversation_id` across all users.
    pub async fn count_messages(&self, conversation_id: &str) -> Result<i64, StorageError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(self.pool_manager.pool())
            .await?;
        Ok(count.0)
    }
}
