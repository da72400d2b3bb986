//! Adapters implementing the realtime engine's collaborator traits on top
//! of the sqlite repositories.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::SqlitePool;

use intercom_realtime::{
    AuthError, Authenticator, MembershipResolver, MessageEnvelope, MessageKind, MessageRecord,
    MessageStore, StoreError, StoreResult,
};

use crate::entities::ChatMessage;
use crate::repos::{MemberRepository, MessageRepository, SessionRepository, UserRepository};
use crate::types::DatabaseError;

fn map_error(error: DatabaseError) -> StoreError {
    match error {
        DatabaseError::NotFound { entity, id } => StoreError::NotFound(format!("{entity} {id}")),
        other => StoreError::Unavailable(other.to_string()),
    }
}

fn to_record(message: ChatMessage) -> MessageRecord {
    MessageRecord {
        id: message.id,
        chat_id: message.chat_id,
        sender_id: message.sender_id,
        kind: MessageKind::from(message.kind.as_str()),
        content: message.content,
        created_at: message.created_at,
    }
}

/// Sqlite-backed message persistence.
pub struct SqliteStore {
    messages: MessageRepository,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            messages: MessageRepository::new(pool),
        }
    }
}

#[async_trait]
impl MessageStore for SqliteStore {
    async fn create_message(&self, envelope: &MessageEnvelope) -> StoreResult<MessageRecord> {
        let message = self
            .messages
            .create(
                &envelope.chat_id,
                &envelope.sender_id,
                envelope.kind.as_str(),
                &envelope.content,
            )
            .await
            .map_err(map_error)?;
        Ok(to_record(message))
    }

    async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &str,
        deleted_by: &str,
    ) -> StoreResult<()> {
        self.messages
            .soft_delete(chat_id, message_id, deleted_by)
            .await
            .map_err(map_error)
    }

    async fn update_message(
        &self,
        chat_id: &str,
        message_id: &str,
        _editor_id: &str,
        content: &str,
    ) -> StoreResult<MessageRecord> {
        let message = self
            .messages
            .update_content(chat_id, message_id, content)
            .await
            .map_err(map_error)?;
        Ok(to_record(message))
    }

    async fn add_reaction(
        &self,
        _chat_id: &str,
        message_id: &str,
        user_id: &str,
        reaction: &str,
    ) -> StoreResult<()> {
        if !self.messages.exists(message_id).await.map_err(map_error)? {
            return Err(StoreError::NotFound(format!("message {message_id}")));
        }
        self.messages
            .add_reaction(message_id, user_id, reaction)
            .await
            .map_err(map_error)
    }

    async fn mark_read(&self, message_id: &str, reader_id: &str) -> StoreResult<()> {
        if !self.messages.exists(message_id).await.map_err(map_error)? {
            return Err(StoreError::NotFound(format!("message {message_id}")));
        }
        self.messages
            .mark_read(message_id, reader_id)
            .await
            .map_err(map_error)
    }

    async fn mark_all_read(&self, chat_id: &str, reader_id: &str) -> StoreResult<()> {
        self.messages
            .mark_all_read(chat_id, reader_id)
            .await
            .map_err(map_error)?;
        Ok(())
    }
}

/// Sqlite-backed chat membership lookups.
pub struct SqliteMembership {
    members: MemberRepository,
    users: UserRepository,
}

impl SqliteMembership {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            members: MemberRepository::new(pool.clone()),
            users: UserRepository::new(pool),
        }
    }
}

#[async_trait]
impl MembershipResolver for SqliteMembership {
    async fn participants_of(&self, chat_id: &str) -> StoreResult<HashSet<String>> {
        let participants = self
            .members
            .participants_of(chat_id)
            .await
            .map_err(map_error)?;
        Ok(participants.into_iter().collect())
    }

    async fn chats_of(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.members.chats_of(user_id).await.map_err(map_error)
    }

    async fn display_name(&self, user_id: &str) -> StoreResult<String> {
        self.users.visible_name(user_id).await.map_err(map_error)
    }
}

#[async_trait]
impl Authenticator for SessionRepository {
    async fn verify(&self, token: &str) -> Result<String, AuthError> {
        match self.validate(token).await {
            Ok(session) => Ok(session.user_id),
            Err(DatabaseError::InvalidSession) => {
                Err(AuthError::Rejected("invalid or expired session".to_string()))
            }
            Err(error) => Err(AuthError::Unavailable(error.to_string())),
        }
    }

    async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        self.delete(token)
            .await
            .map_err(|error| AuthError::Unavailable(error.to_string()))
    }
}
