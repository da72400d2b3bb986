//! Repository for message data access operations.

use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::entities::ChatMessage;
use crate::types::{DatabaseError, DatabaseResult};

/// Repository for message database operations
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new message and return its authoritative record.
    pub async fn create(
        &self,
        chat_id: &str,
        sender_id: &str,
        kind: &str,
        content: &str,
    ) -> DatabaseResult<ChatMessage> {
        let id = cuid2::create_id();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO messages (id, chat_id, sender_id, kind, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(chat_id)
        .bind(sender_id)
        .bind(kind)
        .bind(content)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(message_id = %id, chat_id, "message persisted");
        Ok(ChatMessage {
            id,
            chat_id: chat_id.to_string(),
            sender_id: sender_id.to_string(),
            kind: kind.to_string(),
            content: content.to_string(),
            created_at: now,
            edited_at: None,
            deleted_at: None,
            deleted_by: None,
        })
    }

    /// Find a message by id within a chat.
    pub async fn find_by_id(
        &self,
        chat_id: &str,
        message_id: &str,
    ) -> DatabaseResult<Option<ChatMessage>> {
        let row = sqlx::query(
            "SELECT id, chat_id, sender_id, kind, content, created_at, edited_at, deleted_at, deleted_by
             FROM messages WHERE id = ? AND chat_id = ?",
        )
        .bind(message_id)
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_message).transpose()
    }

    /// Messages of a chat in creation order, soft-deleted ones included.
    pub async fn list_by_chat(&self, chat_id: &str) -> DatabaseResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, sender_id, kind, content, created_at, edited_at, deleted_at, deleted_by
             FROM messages WHERE chat_id = ? ORDER BY created_at ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_message).collect()
    }

    /// Soft-delete a message.
    pub async fn soft_delete(
        &self,
        chat_id: &str,
        message_id: &str,
        deleted_by: &str,
    ) -> DatabaseResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE messages SET deleted_at = ?, deleted_by = ?
             WHERE id = ? AND chat_id = ? AND deleted_at IS NULL",
        )
        .bind(&now)
        .bind(deleted_by)
        .bind(message_id)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either unknown or already deleted; report which.
            return match self.find_by_id(chat_id, message_id).await? {
                Some(_) => Ok(()),
                None => Err(DatabaseError::not_found("message", message_id)),
            };
        }
        Ok(())
    }

    /// Replace a message's content, stamping the edit time.
    pub async fn update_content(
        &self,
        chat_id: &str,
        message_id: &str,
        content: &str,
    ) -> DatabaseResult<ChatMessage> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE messages SET content = ?, edited_at = ?
             WHERE id = ? AND chat_id = ? AND deleted_at IS NULL",
        )
        .bind(content)
        .bind(&now)
        .bind(message_id)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("message", message_id));
        }

        self.find_by_id(chat_id, message_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("message", message_id))
    }

    /// Record a reaction. Idempotent per (message, user, reaction).
    pub async fn add_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        reaction: &str,
    ) -> DatabaseResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT OR IGNORE INTO message_reactions (message_id, user_id, reaction, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(reaction)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a read receipt. Idempotent: re-reading is a no-op.
    pub async fn mark_read(&self, message_id: &str, user_id: &str) -> DatabaseResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at) VALUES (?, ?, ?)",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Mark every message in a chat read for one user, in a single
    /// statement. The reader's own messages are skipped.
    pub async fn mark_all_read(&self, chat_id: &str, user_id: &str) -> DatabaseResult<u64> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at)
             SELECT id, ?, ? FROM messages
             WHERE chat_id = ? AND sender_id != ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .bind(&now)
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Whether a message with this id exists at all.
    pub async fn exists(&self, message_id: &str) -> DatabaseResult<bool> {
        let row = sqlx::query("SELECT 1 FROM messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Read receipt count for a message.
    pub async fn read_count(&self, message_id: &str) -> DatabaseResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM message_reads WHERE message_id = ?")
            .bind(message_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("n")?)
    }

    fn row_to_message(row: sqlx::sqlite::SqliteRow) -> DatabaseResult<ChatMessage> {
        Ok(ChatMessage {
            id: row.try_get("id")?,
            chat_id: row.try_get("chat_id")?,
            sender_id: row.try_get("sender_id")?,
            kind: row.try_get("kind")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            edited_at: row.try_get("edited_at")?,
            deleted_at: row.try_get("deleted_at")?,
            deleted_by: row.try_get("deleted_by")?,
        })
    }
}
