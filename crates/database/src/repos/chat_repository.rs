//! Repository for chat data access operations.

use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::entities::{Chat, CreateChatRequest};
use crate::types::DatabaseResult;

/// Repository for chat database operations
pub struct ChatRepository {
    pool: SqlitePool,
}

impl ChatRepository {
    /// Create a new chat repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a chat together with its initial members
    pub async fn create(&self, request: &CreateChatRequest) -> DatabaseResult<Chat> {
        let id = cuid2::create_id();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO chats (id, title, created_at) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(&request.title)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        for user_id in &request.member_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO chat_members (chat_id, user_id, joined_at) VALUES (?, ?, ?)",
            )
            .bind(&id)
            .bind(user_id)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(chat_id = %id, members = request.member_ids.len(), "chat created");
        Ok(Chat {
            id,
            title: request.title.clone(),
            created_at: now,
        })
    }

    /// Find a chat by id
    pub async fn find_by_id(&self, chat_id: &str) -> DatabaseResult<Option<Chat>> {
        let row = sqlx::query("SELECT id, title, created_at FROM chats WHERE id = ?")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            Ok(Chat {
                id: row.try_get("id")?,
                title: row.try_get("title")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }
}
