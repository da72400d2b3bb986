//! # Intercom Database Crate
//!
//! Sqlite persistence for the Intercom backend: connection management,
//! migrations, repositories, and the concrete implementations of the
//! realtime engine's collaborator traits (`MessageStore`,
//! `MembershipResolver`, `Authenticator`).

use sqlx::SqlitePool;

use intercom_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod store;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{
    ChatRepository, MemberRepository, MessageRepository, SessionRepository, UserRepository,
};

// Re-export entities
pub use entities::{
    chat::{Chat, ChatMember, CreateChatRequest},
    message::{ChatMessage, MessageReaction, MessageRead},
    session::AuthSession,
    user::{CreateUserRequest, User},
};

// Re-export collaborator adapters
pub use store::{SqliteMembership, SqliteStore};

// Re-export types
pub use types::{errors::DatabaseError, DatabaseResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_database() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let config = DatabaseConfig {
            url: db_url,
            max_connections: 1,
        };

        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_database_initialization() {
        let (_pool, _temp_dir) = create_test_database().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (pool, _temp_dir) = create_test_database().await;

        let result: (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(result.0);
    }
}
