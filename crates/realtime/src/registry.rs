//! Connection registry: the single source of truth for which identities
//! have live connections.
//!
//! One identity may own many simultaneous connections (multi-device). The
//! registry reports the 0→1 and 1→0 edges so the presence tracker can
//! broadcast transitions exactly once.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::events::ServerEvent;

/// Handle to one live connection: the identity it belongs to and the
/// sender half of its outbound channel.
///
/// The identity is set once, post-authentication, and never changes for
/// the life of the connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: String,
    user_id: String,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(
        connection_id: impl Into<String>,
        user_id: impl Into<String>,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        Self {
            connection_id: connection_id.into(),
            user_id: user_id.into(),
            sender,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Push an event to this connection, fire-and-forget.
    ///
    /// Returns `false` if the receiving side is gone; the caller never
    /// blocks waiting on the client.
    pub fn push(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Outcome of removing a connection from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disconnect {
    pub user_id: String,
    /// True when this was the identity's last connection (1→0 edge).
    pub went_offline: bool,
}

#[derive(Default)]
struct RegistryInner {
    /// user id → connection id → handle
    by_user: HashMap<String, HashMap<String, ConnectionHandle>>,
    /// connection id → owning user id
    owner: HashMap<String, String>,
}

/// Registry of live connections, shared by every connection handler.
///
/// All mutations go through the write lock; handles are cloned out before
/// any push so no lock is held while events are delivered.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection. Idempotent per connection id.
    ///
    /// Returns `true` when this is the identity's first live connection
    /// (the 0→1 presence edge).
    pub async fn register(&self, handle: ConnectionHandle) -> bool {
        let mut inner = self.inner.write().await;

        if inner.owner.contains_key(handle.connection_id()) {
            return false;
        }

        inner
            .owner
            .insert(handle.connection_id().to_string(), handle.user_id().to_string());

        let connections = inner
            .by_user
            .entry(handle.user_id().to_string())
            .or_default();
        let came_online = connections.is_empty();
        connections.insert(handle.connection_id().to_string(), handle);

        came_online
    }

    /// Remove exactly one connection.
    ///
    /// Returns the owning identity and whether it just went offline
    /// (the 1→0 edge), or `None` for an unknown connection id.
    pub async fn unregister(&self, connection_id: &str) -> Option<Disconnect> {
        let mut inner = self.inner.write().await;

        let user_id = inner.owner.remove(connection_id)?;
        let went_offline = match inner.by_user.get_mut(&user_id) {
            Some(connections) => {
                connections.remove(connection_id);
                connections.is_empty()
            }
            None => true,
        };
        if went_offline {
            inner.by_user.remove(&user_id);
        }

        Some(Disconnect { user_id, went_offline })
    }

    /// Drop every connection an identity owns (logout teardown).
    ///
    /// The handles are returned so the caller can observe them being
    /// dropped; dropping the last sender closes each connection's
    /// outbound channel.
    pub async fn remove_user(&self, user_id: &str) -> Vec<ConnectionHandle> {
        let mut inner = self.inner.write().await;

        let Some(connections) = inner.by_user.remove(user_id) else {
            return Vec::new();
        };
        for connection_id in connections.keys() {
            inner.owner.remove(connection_id);
        }

        debug!(user_id, count = connections.len(), "removed all connections for user");
        connections.into_values().collect()
    }

    /// Live connection handles for an identity; empty if offline.
    pub async fn connections_for(&self, user_id: &str) -> Vec<ConnectionHandle> {
        let inner = self.inner.read().await;
        inner
            .by_user
            .get(user_id)
            .map(|connections| connections.values().cloned().collect())
            .unwrap_or_default()
    }

    /// An identity is online iff it holds at least one live connection.
    pub async fn is_online(&self, user_id: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .by_user
            .get(user_id)
            .is_some_and(|connections| !connections.is_empty())
    }

    /// Push an event to every live connection of one identity.
    ///
    /// Returns the number of connections the event reached. Zero is not an
    /// error: fan-out to an offline participant is a no-op.
    pub async fn send_to_user(&self, user_id: &str, event: &ServerEvent) -> usize {
        let handles = self.connections_for(user_id).await;
        let mut delivered = 0;
        for handle in &handles {
            if handle.push(event.clone()) {
                delivered += 1;
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(connection_id: &str, user_id: &str) -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(connection_id, user_id, tx), rx)
    }

    #[tokio::test]
    async fn online_iff_at_least_one_connection() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.is_online("alice").await);

        let (c1, _rx1) = handle("c1", "alice");
        let (c2, _rx2) = handle("c2", "alice");

        assert!(registry.register(c1).await);
        assert!(registry.is_online("alice").await);

        // Second device: no new edge.
        assert!(!registry.register(c2).await);
        assert!(registry.is_online("alice").await);

        let first = registry.unregister("c1").await.unwrap();
        assert!(!first.went_offline);
        assert!(registry.is_online("alice").await);

        let last = registry.unregister("c2").await.unwrap();
        assert!(last.went_offline);
        assert_eq!(last.user_id, "alice");
        assert!(!registry.is_online("alice").await);
    }

    #[tokio::test]
    async fn register_is_idempotent_per_connection_id() {
        let registry = ConnectionRegistry::new();
        let (c1, _rx1) = handle("c1", "alice");
        let (dup, _rx2) = handle("c1", "alice");

        assert!(registry.register(c1).await);
        assert!(!registry.register(dup).await);
        assert_eq!(registry.connections_for("alice").await.len(), 1);
    }

    #[tokio::test]
    async fn unregister_unknown_connection_is_none() {
        let registry = ConnectionRegistry::new();
        assert!(registry.unregister("nope").await.is_none());
    }

    #[tokio::test]
    async fn send_to_user_reaches_every_device() {
        let registry = ConnectionRegistry::new();
        let (c1, mut rx1) = handle("c1", "alice");
        let (c2, mut rx2) = handle("c2", "alice");
        registry.register(c1).await;
        registry.register(c2).await;

        let delivered = registry.send_to_user("alice", &ServerEvent::Pong).await;
        assert_eq!(delivered, 2);
        assert!(matches!(rx1.try_recv(), Ok(ServerEvent::Pong)));
        assert!(matches!(rx2.try_recv(), Ok(ServerEvent::Pong)));

        assert_eq!(registry.send_to_user("nobody", &ServerEvent::Pong).await, 0);
    }

    #[tokio::test]
    async fn remove_user_drops_every_connection() {
        let registry = ConnectionRegistry::new();
        let (c1, _rx1) = handle("c1", "alice");
        let (c2, _rx2) = handle("c2", "alice");
        registry.register(c1).await;
        registry.register(c2).await;

        let dropped = registry.remove_user("alice").await;
        assert_eq!(dropped.len(), 2);
        assert!(!registry.is_online("alice").await);
        // Their ids are fully forgotten.
        assert!(registry.unregister("c1").await.is_none());
    }

    #[tokio::test]
    async fn concurrent_registers_keep_count_consistent() {
        use std::sync::Arc;

        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (h, _rx) = {
                    let (tx, rx) = mpsc::unbounded_channel();
                    (ConnectionHandle::new(format!("c{i}"), "alice", tx), rx)
                };
                registry.register(h).await
            }));
        }

        let mut edges = 0;
        for task in tasks {
            if task.await.unwrap() {
                edges += 1;
            }
        }
        assert_eq!(edges, 1);
        assert_eq!(registry.connections_for("alice").await.len(), 32);
    }
}
