//! The assembled real-time engine.
//!
//! One `RealtimeEngine` is shared by every connection handler. It owns the
//! connection registry and wires the presence tracker, typing coordinator
//! and fan-out engine to the injected collaborators.

use std::sync::Arc;

use crate::error::RealtimeResult;
use crate::events::PresenceStatus;
use crate::fanout::FanoutEngine;
use crate::message::{MessageEnvelope, MessageRecord};
use crate::presence::PresenceTracker;
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::traits::{MembershipResolver, MessageStore};
use crate::typing::TypingCoordinator;

pub struct RealtimeEngine {
    registry: Arc<ConnectionRegistry>,
    presence: PresenceTracker,
    typing: TypingCoordinator,
    fanout: FanoutEngine,
}

impl RealtimeEngine {
    pub fn new(store: Arc<dyn MessageStore>, membership: Arc<dyn MembershipResolver>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let presence = PresenceTracker::new(Arc::clone(&registry), Arc::clone(&membership));
        let typing = TypingCoordinator::new(Arc::clone(&registry), Arc::clone(&membership));
        let fanout = FanoutEngine::new(Arc::clone(&registry), store, membership);

        Self {
            registry,
            presence,
            typing,
            fanout,
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Register an authenticated connection; announces the online edge if
    /// this is the identity's first live connection.
    pub async fn connect(&self, handle: ConnectionHandle) {
        let user_id = handle.user_id().to_string();
        if self.registry.register(handle).await {
            self.presence.handle_online(&user_id).await;
        }
    }

    /// Remove a connection; announces the offline edge if it was the
    /// identity's last one.
    pub async fn disconnect(&self, connection_id: &str) {
        if let Some(disconnect) = self.registry.unregister(connection_id).await {
            if disconnect.went_offline {
                self.presence.handle_offline(&disconnect.user_id).await;
            }
        }
    }

    /// Forced offline: announce, then tear down every connection the
    /// identity owns.
    pub async fn logout(&self, user_id: &str) {
        self.presence.logout(user_id).await;
    }

    /// Synchronous status answer for the requesting connection.
    pub async fn query_status(&self, user_id: &str) -> PresenceStatus {
        self.presence.query_status(user_id).await
    }

    pub async fn is_online(&self, user_id: &str) -> bool {
        self.registry.is_online(user_id).await
    }

    pub async fn send_message(&self, envelope: MessageEnvelope) -> RealtimeResult<MessageRecord> {
        self.fanout.publish_new_message(envelope).await
    }

    pub async fn delete_message(
        &self,
        chat_id: &str,
        message_id: &str,
        deleted_by: &str,
    ) -> RealtimeResult<()> {
        self.fanout.publish_deletion(chat_id, message_id, deleted_by).await
    }

    pub async fn edit_message(
        &self,
        chat_id: &str,
        message_id: &str,
        editor_id: &str,
        content: &str,
    ) -> RealtimeResult<MessageRecord> {
        self.fanout
            .publish_edit(chat_id, message_id, editor_id, content)
            .await
    }

    pub async fn react(
        &self,
        chat_id: &str,
        message_id: &str,
        user_id: &str,
        reaction: &str,
    ) -> RealtimeResult<()> {
        self.fanout
            .publish_reaction(chat_id, message_id, user_id, reaction)
            .await
    }

    pub async fn mark_read(
        &self,
        chat_id: &str,
        message_id: &str,
        reader_id: &str,
    ) -> RealtimeResult<()> {
        self.fanout.publish_read(chat_id, message_id, reader_id).await
    }

    pub async fn mark_all_read(&self, chat_id: &str, reader_id: &str) -> RealtimeResult<()> {
        self.fanout.publish_read_all(chat_id, reader_id).await
    }

    pub async fn signal_delivered(
        &self,
        chat_id: &str,
        message_id: &str,
        signaled_by: &str,
    ) -> RealtimeResult<()> {
        self.fanout
            .publish_delivered(chat_id, message_id, signaled_by)
            .await
    }

    pub async fn typing_started(&self, user_id: &str, chat_id: &str) {
        self.typing.signal_typing(user_id, chat_id).await;
    }

    pub async fn typing_stopped(&self, user_id: &str, chat_id: &str) {
        self.typing.signal_stopped(user_id, chat_id).await;
    }
}
