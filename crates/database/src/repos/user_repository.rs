//! Repository for user data access operations.

use sqlx::{Row, SqlitePool};

use crate::entities::{CreateUserRequest, User};
use crate::types::{DatabaseError, DatabaseResult};

/// Repository for user database operations
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user
    pub async fn create(&self, request: &CreateUserRequest) -> DatabaseResult<User> {
        let id = cuid2::create_id();
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO users (id, username, display_name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.username)
        .bind(&request.display_name)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id,
            username: request.username.clone(),
            display_name: request.display_name.clone(),
            created_at: now,
        })
    }

    /// Find a user by id
    pub async fn find_by_id(&self, user_id: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, display_name, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(User {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                display_name: row.try_get("display_name")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    /// Find a user by username
    pub async fn find_by_username(&self, username: &str) -> DatabaseResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, display_name, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(User {
                id: row.try_get("id")?,
                username: row.try_get("username")?,
                display_name: row.try_get("display_name")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    /// Visible name for a user (display name, falling back to username)
    pub async fn visible_name(&self, user_id: &str) -> DatabaseResult<String> {
        let user = self
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("user", user_id))?;
        Ok(user.visible_name().to_string())
    }
}
