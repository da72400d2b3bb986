//! Message fan-out engine.
//!
//! Every operation follows the same shape: check the actor is a
//! participant, persist through the collaborator, resolve recipients, then
//! push to each recipient's live connections. A collaborator failure
//! aborts the operation before the first push — participants never observe
//! partial or failed state changes.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::{RealtimeError, RealtimeResult};
use crate::events::ServerEvent;
use crate::message::{MessageEnvelope, MessageRecord};
use crate::registry::ConnectionRegistry;
use crate::traits::{MembershipResolver, MessageStore};

pub struct FanoutEngine {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn MessageStore>,
    membership: Arc<dyn MembershipResolver>,
}

impl FanoutEngine {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn MessageStore>,
        membership: Arc<dyn MembershipResolver>,
    ) -> Self {
        Self {
            registry,
            store,
            membership,
        }
    }

    /// Persist a new message and push it to every participant except the
    /// sender. The sender reconciles its optimistic copy through the
    /// returned record (via the ack), never through the broadcast.
    pub async fn publish_new_message(
        &self,
        envelope: MessageEnvelope,
    ) -> RealtimeResult<MessageRecord> {
        let participants = self
            .participants_checked(&envelope.chat_id, &envelope.sender_id)
            .await?;

        let record = self.store.create_message(&envelope).await?;
        debug!(
            chat_id = %record.chat_id,
            message_id = %record.id,
            "message persisted, fanning out"
        );

        let event = ServerEvent::MessageNew {
            message: record.clone(),
        };
        self.push(&participants, Some(&envelope.sender_id), &event).await;
        Ok(record)
    }

    /// Soft-delete a message and notify every participant except the
    /// deleter. Any participant may delete for themselves.
    pub async fn publish_deletion(
        &self,
        chat_id: &str,
        message_id: &str,
        deleted_by: &str,
    ) -> RealtimeResult<()> {
        let participants = self.participants_checked(chat_id, deleted_by).await?;
        self.store.delete_message(chat_id, message_id, deleted_by).await?;

        let event = ServerEvent::MessageDeleted {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
            deleted_by: deleted_by.to_string(),
        };
        self.push(&participants, Some(deleted_by), &event).await;
        Ok(())
    }

    /// Persist an edit and push the updated record to every participant
    /// except the editor.
    pub async fn publish_edit(
        &self,
        chat_id: &str,
        message_id: &str,
        editor_id: &str,
        content: &str,
    ) -> RealtimeResult<MessageRecord> {
        let participants = self.participants_checked(chat_id, editor_id).await?;
        let record = self
            .store
            .update_message(chat_id, message_id, editor_id, content)
            .await?;

        let event = ServerEvent::MessageEdited {
            message: record.clone(),
        };
        self.push(&participants, Some(editor_id), &event).await;
        Ok(record)
    }

    /// Persist a reaction and notify every participant except the reactor.
    pub async fn publish_reaction(
        &self,
        chat_id: &str,
        message_id: &str,
        user_id: &str,
        reaction: &str,
    ) -> RealtimeResult<()> {
        let participants = self.participants_checked(chat_id, user_id).await?;
        self.store
            .add_reaction(chat_id, message_id, user_id, reaction)
            .await?;

        let event = ServerEvent::MessageReaction {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
            user_id: user_id.to_string(),
            reaction: reaction.to_string(),
        };
        self.push(&participants, Some(user_id), &event).await;
        Ok(())
    }

    /// Mark a message read and broadcast to ALL participants, reader
    /// included — the reader's other devices must learn the read state.
    pub async fn publish_read(
        &self,
        chat_id: &str,
        message_id: &str,
        reader_id: &str,
    ) -> RealtimeResult<()> {
        let participants = self.participants_checked(chat_id, reader_id).await?;
        self.store.mark_read(message_id, reader_id).await?;

        let event = ServerEvent::MessageRead {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
            reader_id: reader_id.to_string(),
        };
        self.push(&participants, None, &event).await;
        Ok(())
    }

    /// Mark the whole chat read in one store call and broadcast a single
    /// aggregate notice instead of one event per message.
    pub async fn publish_read_all(&self, chat_id: &str, reader_id: &str) -> RealtimeResult<()> {
        let participants = self.participants_checked(chat_id, reader_id).await?;
        self.store.mark_all_read(chat_id, reader_id).await?;

        let event = ServerEvent::ReadAll {
            chat_id: chat_id.to_string(),
            reader_id: reader_id.to_string(),
        };
        self.push(&participants, None, &event).await;
        Ok(())
    }

    /// Broadcast-only delivery signal; nothing is persisted.
    pub async fn publish_delivered(
        &self,
        chat_id: &str,
        message_id: &str,
        signaled_by: &str,
    ) -> RealtimeResult<()> {
        let participants = self.participants_checked(chat_id, signaled_by).await?;

        let event = ServerEvent::Delivered {
            chat_id: chat_id.to_string(),
            message_id: message_id.to_string(),
        };
        self.push(&participants, None, &event).await;
        Ok(())
    }

    /// Resolve the chat's participants and verify the actor is one of
    /// them. Runs before any persistence side effect.
    async fn participants_checked(
        &self,
        chat_id: &str,
        actor_id: &str,
    ) -> RealtimeResult<HashSet<String>> {
        let participants = self.membership.participants_of(chat_id).await?;
        if !participants.contains(actor_id) {
            return Err(RealtimeError::not_a_participant(actor_id, chat_id));
        }
        Ok(participants)
    }

    /// Push one event to every participant's live connections, minus the
    /// excluded identity. Offline participants are skipped silently.
    async fn push(
        &self,
        participants: &HashSet<String>,
        exclude: Option<&str>,
        event: &ServerEvent,
    ) {
        for participant in participants {
            if exclude.is_some_and(|excluded| excluded == participant) {
                continue;
            }
            self.registry.send_to_user(participant, event).await;
        }
    }
}
