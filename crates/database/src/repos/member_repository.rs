//! Repository for chat membership lookups.

use sqlx::{Row, SqlitePool};

use crate::entities::ChatMember;
use crate::types::{DatabaseError, DatabaseResult};

/// Repository for membership database operations
pub struct MemberRepository {
    pool: SqlitePool,
}

impl MemberRepository {
    /// Create a new member repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Add a member to a chat. Idempotent.
    pub async fn add(&self, chat_id: &str, user_id: &str) -> DatabaseResult<ChatMember> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT OR IGNORE INTO chat_members (chat_id, user_id, joined_at) VALUES (?, ?, ?)",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(ChatMember {
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            joined_at: now,
        })
    }

    /// Participant user ids of a chat.
    ///
    /// An unknown chat id is an error, so callers can distinguish "no such
    /// chat" from an empty membership.
    pub async fn participants_of(&self, chat_id: &str) -> DatabaseResult<Vec<String>> {
        let exists = sqlx::query("SELECT id FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DatabaseError::not_found("chat", chat_id));
        }

        let rows = sqlx::query("SELECT user_id FROM chat_members WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Ok(row.try_get("user_id")?))
            .collect()
    }

    /// Chat ids a user belongs to.
    pub async fn chats_of(&self, user_id: &str) -> DatabaseResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT chat_id FROM chat_members WHERE user_id = ? ORDER BY joined_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Ok(row.try_get("chat_id")?))
            .collect()
    }

    /// Whether a user is a participant of a chat.
    pub async fn is_member(&self, chat_id: &str, user_id: &str) -> DatabaseResult<bool> {
        let row = sqlx::query("SELECT 1 FROM chat_members WHERE chat_id = ? AND user_id = ?")
            .bind(chat_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
