//! Repository for session tokens.

use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::entities::AuthSession;
use crate::types::{DatabaseError, DatabaseResult};

const TOKEN_LENGTH: usize = 48;

/// Repository for session database operations
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Create a new session repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Issue a new session token for a user.
    pub async fn create(&self, user_id: &str, ttl_seconds: u64) -> DatabaseResult<AuthSession> {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();

        let now = Utc::now();
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let expires_at = now + Duration::seconds(ttl);

        let session = AuthSession {
            token,
            user_id: user_id.to_string(),
            created_at: now.to_rfc3339(),
            expires_at: expires_at.to_rfc3339(),
        };

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(&session.created_at)
        .bind(&session.expires_at)
        .execute(&self.pool)
        .await?;

        debug!(user_id, "session issued");
        Ok(session)
    }

    /// Resolve a token to its session, rejecting unknown or expired ones.
    pub async fn validate(&self, token: &str) -> DatabaseResult<AuthSession> {
        let row = sqlx::query(
            "SELECT token, user_id, created_at, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(DatabaseError::InvalidSession);
        };

        let session = AuthSession {
            token: row.try_get("token")?,
            user_id: row.try_get("user_id")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
        };

        if session.is_expired() {
            return Err(DatabaseError::InvalidSession);
        }
        Ok(session)
    }

    /// Remove a session token (logout).
    pub async fn delete(&self, token: &str) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
