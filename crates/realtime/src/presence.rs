//! Presence tracker: broadcasts online/offline transitions to chat
//! co-members.
//!
//! Presence is best-effort. A failed membership lookup drops the
//! transition with a warning; it never blocks connect or disconnect and
//! is never retried.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::events::{PresenceStatus, ServerEvent};
use crate::registry::ConnectionRegistry;
use crate::traits::{MembershipResolver, StoreResult};

pub struct PresenceTracker {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<dyn MembershipResolver>,
}

impl PresenceTracker {
    pub fn new(registry: Arc<ConnectionRegistry>, membership: Arc<dyn MembershipResolver>) -> Self {
        Self { registry, membership }
    }

    /// Announce the 0→1 edge for an identity.
    pub async fn handle_online(&self, user_id: &str) {
        self.announce(user_id, PresenceStatus::Online).await;
    }

    /// Announce the 1→0 edge for an identity.
    pub async fn handle_offline(&self, user_id: &str) {
        self.announce(user_id, PresenceStatus::Offline).await;
    }

    /// Explicit logout: stronger than a disconnect. Announces offline even
    /// if other connections nominally remain, then tears every one of the
    /// identity's connections down.
    pub async fn logout(&self, user_id: &str) {
        self.announce(user_id, PresenceStatus::Offline).await;
        let dropped = self.registry.remove_user(user_id).await;
        debug!(user_id, connections = dropped.len(), "logout teardown");
    }

    /// Current status, answered synchronously from registry state.
    pub async fn query_status(&self, user_id: &str) -> PresenceStatus {
        if self.registry.is_online(user_id).await {
            PresenceStatus::Online
        } else {
            PresenceStatus::Offline
        }
    }

    async fn announce(&self, user_id: &str, status: PresenceStatus) {
        let watchers = match self.co_participants(user_id).await {
            Ok(watchers) => watchers,
            Err(error) => {
                warn!(user_id, status = status.as_str(), %error, "dropping presence broadcast");
                return;
            }
        };

        let event = ServerEvent::StatusChanged {
            user_id: user_id.to_string(),
            status,
        };
        for watcher in &watchers {
            self.registry.send_to_user(watcher, &event).await;
        }
    }

    /// Union of co-participants across every chat the identity belongs to,
    /// excluding the identity itself.
    async fn co_participants(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        let chats = self.membership.chats_of(user_id).await?;
        let mut watchers = HashSet::new();
        for chat_id in &chats {
            watchers.extend(self.membership.participants_of(chat_id).await?);
        }
        watchers.remove(user_id);
        Ok(watchers)
    }
}
