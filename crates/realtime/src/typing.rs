//! Typing coordinator: per (identity, chat) debounced typing state with
//! timeout-based expiry.
//!
//! State machine per key: Idle → Typing → Idle. The start broadcast fires
//! only on the Idle→Typing edge; repeat signals refresh the expiry timer
//! without re-emitting. Stop is emitted exactly once, by whichever of the
//! explicit stop signal and the expiry timer comes first — the table entry
//! owns at most one live timer, and a generation counter makes a stale
//! timer that lost the race a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::events::ServerEvent;
use crate::registry::ConnectionRegistry;
use crate::traits::MembershipResolver;

/// Inactivity window after which a typing indicator expires. Fixed by
/// design, not configurable.
pub const TYPING_EXPIRY: Duration = Duration::from_secs(5);

type TypingKey = (String, String);

struct TypingEntry {
    generation: u64,
    timer: JoinHandle<()>,
}

struct TypingInner {
    registry: Arc<ConnectionRegistry>,
    membership: Arc<dyn MembershipResolver>,
    states: Mutex<HashMap<TypingKey, TypingEntry>>,
    next_generation: AtomicU64,
}

pub struct TypingCoordinator {
    inner: Arc<TypingInner>,
}

impl TypingCoordinator {
    pub fn new(registry: Arc<ConnectionRegistry>, membership: Arc<dyn MembershipResolver>) -> Self {
        Self {
            inner: Arc::new(TypingInner {
                registry,
                membership,
                states: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Handle a "typing" signal for (user, chat).
    ///
    /// First signal broadcasts `typing_start`; any further signal within
    /// the expiry window only cancels and replaces the pending timer.
    pub async fn signal_typing(&self, user_id: &str, chat_id: &str) {
        let key = (user_id.to_string(), chat_id.to_string());
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let timer = spawn_expiry(&self.inner, key.clone(), generation);

        let started = {
            let mut states = self.inner.states.lock().await;
            match states.insert(
                key,
                TypingEntry { generation, timer },
            ) {
                Some(previous) => {
                    previous.timer.abort();
                    false
                }
                None => true,
            }
        };

        if started {
            broadcast(&self.inner, user_id, chat_id, true).await;
        }
    }

    /// Handle an explicit "stop typing" signal.
    ///
    /// Cancels the pending timer before removal so the timeout path can
    /// never emit a second stop.
    pub async fn signal_stopped(&self, user_id: &str, chat_id: &str) {
        let key = (user_id.to_string(), chat_id.to_string());
        let removed = {
            let mut states = self.inner.states.lock().await;
            match states.remove(&key) {
                Some(entry) => {
                    entry.timer.abort();
                    true
                }
                None => false,
            }
        };

        if removed {
            broadcast(&self.inner, user_id, chat_id, false).await;
        }
    }

    /// Whether (user, chat) currently holds a live typing state.
    pub async fn is_typing(&self, user_id: &str, chat_id: &str) -> bool {
        let states = self.inner.states.lock().await;
        states.contains_key(&(user_id.to_string(), chat_id.to_string()))
    }
}

fn spawn_expiry(inner: &Arc<TypingInner>, key: TypingKey, generation: u64) -> JoinHandle<()> {
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        tokio::time::sleep(TYPING_EXPIRY).await;

        let expired = {
            let mut states = inner.states.lock().await;
            match states.get(&key) {
                Some(entry) if entry.generation == generation => {
                    states.remove(&key);
                    true
                }
                // Refreshed or explicitly stopped while we slept.
                _ => false,
            }
        };

        if expired {
            broadcast(&inner, &key.0, &key.1, false).await;
        }
    })
}

/// Fan "typing started/stopped" out to every other participant of the
/// chat. Best-effort: resolver failures are logged and swallowed.
async fn broadcast(inner: &Arc<TypingInner>, user_id: &str, chat_id: &str, started: bool) {
    let participants = match inner.membership.participants_of(chat_id).await {
        Ok(participants) => participants,
        Err(error) => {
            warn!(user_id, chat_id, %error, "dropping typing broadcast");
            return;
        }
    };
    let name = match inner.membership.display_name(user_id).await {
        Ok(name) => name,
        Err(error) => {
            warn!(user_id, %error, "typing broadcast without display name");
            user_id.to_string()
        }
    };

    let event = if started {
        ServerEvent::TypingStart {
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            name,
        }
    } else {
        ServerEvent::TypingStop {
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            name,
        }
    };

    for participant in &participants {
        if participant == user_id {
            continue;
        }
        inner.registry.send_to_user(participant, &event).await;
    }
}
