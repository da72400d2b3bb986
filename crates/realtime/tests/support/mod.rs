//! In-memory collaborator fakes shared by the integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use intercom_realtime::{
    ConnectionHandle, MembershipResolver, MessageEnvelope, MessageRecord, MessageStore,
    RealtimeEngine, ServerEvent, StoreError, StoreResult,
};

/// Message store backed by plain collections. Set `fail` to simulate an
/// unavailable collaborator.
#[derive(Default)]
pub struct InMemoryStore {
    pub messages: Mutex<Vec<MessageRecord>>,
    pub deleted: Mutex<Vec<(String, String)>>,
    pub reads: Mutex<HashSet<(String, String)>>,
    pub read_all_calls: Mutex<Vec<(String, String)>>,
    pub reactions: Mutex<Vec<(String, String, String)>>,
    pub fail: AtomicBool,
    next_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn create_message(&self, envelope: &MessageEnvelope) -> StoreResult<MessageRecord> {
        self.check_available()?;
        let id = format!("m{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let record = MessageRecord {
            id,
            chat_id: envelope.chat_id.clone(),
            sender_id: envelope.sender_id.clone(),
            kind: envelope.kind,
            content: envelope.content.clone(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        };
        self.messages.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn delete_message(
        &self,
        _chat_id: &str,
        message_id: &str,
        deleted_by: &str,
    ) -> StoreResult<()> {
        self.check_available()?;
        self.deleted
            .lock()
            .unwrap()
            .push((message_id.to_string(), deleted_by.to_string()));
        Ok(())
    }

    async fn update_message(
        &self,
        chat_id: &str,
        message_id: &str,
        _editor_id: &str,
        content: &str,
    ) -> StoreResult<MessageRecord> {
        self.check_available()?;
        let mut messages = self.messages.lock().unwrap();
        let record = messages
            .iter_mut()
            .find(|m| m.id == message_id && m.chat_id == chat_id)
            .ok_or_else(|| StoreError::NotFound(format!("message {message_id}")))?;
        record.content = content.to_string();
        Ok(record.clone())
    }

    async fn add_reaction(
        &self,
        _chat_id: &str,
        message_id: &str,
        user_id: &str,
        reaction: &str,
    ) -> StoreResult<()> {
        self.check_available()?;
        self.reactions.lock().unwrap().push((
            message_id.to_string(),
            user_id.to_string(),
            reaction.to_string(),
        ));
        Ok(())
    }

    async fn mark_read(&self, message_id: &str, reader_id: &str) -> StoreResult<()> {
        self.check_available()?;
        self.reads
            .lock()
            .unwrap()
            .insert((message_id.to_string(), reader_id.to_string()));
        Ok(())
    }

    async fn mark_all_read(&self, chat_id: &str, reader_id: &str) -> StoreResult<()> {
        self.check_available()?;
        self.read_all_calls
            .lock()
            .unwrap()
            .push((chat_id.to_string(), reader_id.to_string()));
        Ok(())
    }
}

/// Membership resolver with a fixed chat → participants table.
#[derive(Default)]
pub struct StaticMembership {
    chats: HashMap<String, HashSet<String>>,
    pub fail: AtomicBool,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chat(mut self, chat_id: &str, participants: &[&str]) -> Self {
        self.chats.insert(
            chat_id.to_string(),
            participants.iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MembershipResolver for StaticMembership {
    async fn participants_of(&self, chat_id: &str) -> StoreResult<HashSet<String>> {
        self.check_available()?;
        self.chats
            .get(chat_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("chat {chat_id}")))
    }

    async fn chats_of(&self, user_id: &str) -> StoreResult<Vec<String>> {
        self.check_available()?;
        Ok(self
            .chats
            .iter()
            .filter(|(_, participants)| participants.contains(user_id))
            .map(|(chat_id, _)| chat_id.clone())
            .collect())
    }

    async fn display_name(&self, user_id: &str) -> StoreResult<String> {
        self.check_available()?;
        Ok(user_id.to_uppercase())
    }
}

/// Attach a connection for `user_id` and return the receiving end of its
/// outbound channel.
pub async fn connect(
    engine: &RealtimeEngine,
    user_id: &str,
    connection_id: &str,
) -> mpsc::UnboundedReceiver<ServerEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    engine
        .connect(ConnectionHandle::new(connection_id, user_id, tx))
        .await;
    rx
}

/// Collect everything currently queued on a connection.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Count drained events of one type.
pub fn count(events: &[ServerEvent], type_name: &str) -> usize {
    events
        .iter()
        .filter(|event| event.event_type_name() == type_name)
        .count()
}

/// Let spawned tasks (expiry timers, broadcasts) run to completion under a
/// paused clock.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
}
