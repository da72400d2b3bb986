//! Collaborator interfaces consumed by the engine.
//!
//! Persistence and chat membership live outside the core; the engine only
//! ever talks to them through these traits. Implementations must do their
//! own synchronization — the engine never holds one of its locks across a
//! call into a collaborator.

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

use crate::message::{MessageEnvelope, MessageRecord};

/// Errors surfaced by persistence and membership collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for collaborator calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Message persistence collaborator.
///
/// `mark_read` must be idempotent: marking the same message read twice by
/// the same user is not an error and records nothing new.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create_message(&self, envelope: &MessageEnvelope) -> StoreResult<MessageRecord>;

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &str,
        deleted_by: &str,
    ) -> StoreResult<()>;

    async fn update_message(
        &self,
        chat_id: &str,
        message_id: &str,
        editor_id: &str,
        content: &str,
    ) -> StoreResult<MessageRecord>;

    async fn add_reaction(
        &self,
        chat_id: &str,
        message_id: &str,
        user_id: &str,
        reaction: &str,
    ) -> StoreResult<()>;

    async fn mark_read(&self, message_id: &str, reader_id: &str) -> StoreResult<()>;

    async fn mark_all_read(&self, chat_id: &str, reader_id: &str) -> StoreResult<()>;
}

/// Chat membership collaborator.
#[async_trait]
pub trait MembershipResolver: Send + Sync {
    /// Participant user ids of a chat.
    async fn participants_of(&self, chat_id: &str) -> StoreResult<HashSet<String>>;

    /// Chat ids a user belongs to.
    async fn chats_of(&self, user_id: &str) -> StoreResult<Vec<String>>;

    /// Human-readable name used in typing events.
    async fn display_name(&self, user_id: &str) -> StoreResult<String>;
}

/// Errors surfaced by the session authenticator
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication rejected: {0}")]
    Rejected(String),

    #[error("authenticator unavailable: {0}")]
    Unavailable(String),
}

/// Session authentication collaborator.
///
/// Verification runs before any core logic; a connection without a verified
/// identity never reaches the registry.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve a session token to a user id, or reject.
    async fn verify(&self, token: &str) -> Result<String, AuthError>;

    /// Invalidate a session token (logout).
    async fn revoke(&self, token: &str) -> Result<(), AuthError>;
}
