//! Typing coordinator timing tests, run against a paused clock.

mod support;

use std::sync::Arc;
use std::time::Duration;

use intercom_realtime::{RealtimeEngine, TYPING_EXPIRY};
use support::{connect, count, drain, settle, InMemoryStore, StaticMembership};

fn engine() -> Arc<RealtimeEngine> {
    let store = Arc::new(InMemoryStore::new());
    let membership = Arc::new(StaticMembership::new().with_chat("chat-1", &["alice", "bob"]));
    Arc::new(RealtimeEngine::new(store, membership))
}

#[tokio::test(start_paused = true)]
async fn repeated_start_broadcasts_once_and_expires_from_last_signal() {
    let engine = engine();
    let mut bob_rx = connect(&engine, "bob", "bob-1").await;
    drain(&mut bob_rx);

    engine.typing_started("alice", "chat-1").await;
    settle().await;

    // Refresh 3 seconds in: no second start broadcast.
    tokio::time::advance(Duration::from_secs(3)).await;
    engine.typing_started("alice", "chat-1").await;
    settle().await;

    let events = drain(&mut bob_rx);
    assert_eq!(count(&events, "typing_start"), 1);
    assert_eq!(count(&events, "typing_stop"), 0);

    // 4 seconds after the refresh (7s after the first signal): still typing.
    tokio::time::advance(Duration::from_secs(4)).await;
    settle().await;
    assert_eq!(drain(&mut bob_rx).len(), 0);

    // Past last-signal + expiry: exactly one stop.
    tokio::time::advance(Duration::from_millis(1100)).await;
    settle().await;
    let events = drain(&mut bob_rx);
    assert_eq!(count(&events, "typing_stop"), 1);
}

#[tokio::test(start_paused = true)]
async fn explicit_stop_cancels_pending_expiry() {
    let engine = engine();
    let mut bob_rx = connect(&engine, "bob", "bob-1").await;
    drain(&mut bob_rx);

    engine.typing_started("alice", "chat-1").await;
    engine.typing_stopped("alice", "chat-1").await;
    settle().await;

    let events = drain(&mut bob_rx);
    assert_eq!(count(&events, "typing_start"), 1);
    assert_eq!(count(&events, "typing_stop"), 1);

    // No delayed duplicate at the expiry mark.
    tokio::time::advance(TYPING_EXPIRY + Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(drain(&mut bob_rx).len(), 0);
}

#[tokio::test(start_paused = true)]
async fn start_after_stop_is_a_fresh_edge() {
    let engine = engine();
    let mut bob_rx = connect(&engine, "bob", "bob-1").await;
    drain(&mut bob_rx);

    engine.typing_started("alice", "chat-1").await;
    engine.typing_stopped("alice", "chat-1").await;
    engine.typing_started("alice", "chat-1").await;
    settle().await;

    let events = drain(&mut bob_rx);
    assert_eq!(count(&events, "typing_start"), 2);
    assert_eq!(count(&events, "typing_stop"), 1);
}

#[tokio::test(start_paused = true)]
async fn stop_without_start_is_a_noop() {
    let engine = engine();
    let mut bob_rx = connect(&engine, "bob", "bob-1").await;
    drain(&mut bob_rx);

    engine.typing_stopped("alice", "chat-1").await;
    settle().await;
    assert_eq!(drain(&mut bob_rx).len(), 0);
}

#[tokio::test(start_paused = true)]
async fn typing_state_survives_device_disconnect() {
    let engine = engine();
    let mut bob_rx = connect(&engine, "bob", "bob-1").await;
    let _alice_rx = connect(&engine, "alice", "alice-1").await;
    drain(&mut bob_rx);

    engine.typing_started("alice", "chat-1").await;
    settle().await;
    drain(&mut bob_rx);

    // Typing state belongs to the identity, not the connection: the expiry
    // still fires after the device drops.
    engine.disconnect("alice-1").await;
    drain(&mut bob_rx); // offline edge

    tokio::time::advance(TYPING_EXPIRY + Duration::from_secs(1)).await;
    settle().await;
    let events = drain(&mut bob_rx);
    assert_eq!(count(&events, "typing_stop"), 1);
}

#[tokio::test(start_paused = true)]
async fn typing_states_are_scoped_per_chat() {
    let store = Arc::new(InMemoryStore::new());
    let membership = Arc::new(
        StaticMembership::new()
            .with_chat("chat-1", &["alice", "bob"])
            .with_chat("chat-2", &["alice", "bob"]),
    );
    let engine = Arc::new(RealtimeEngine::new(store, membership));

    let mut bob_rx = connect(&engine, "bob", "bob-1").await;
    drain(&mut bob_rx);

    engine.typing_started("alice", "chat-1").await;
    engine.typing_started("alice", "chat-2").await;
    settle().await;

    let events = drain(&mut bob_rx);
    assert_eq!(count(&events, "typing_start"), 2);

    engine.typing_stopped("alice", "chat-1").await;
    settle().await;
    let events = drain(&mut bob_rx);
    assert_eq!(count(&events, "typing_stop"), 1);

    // chat-2 still expires on its own timer.
    tokio::time::advance(TYPING_EXPIRY + Duration::from_secs(1)).await;
    settle().await;
    let events = drain(&mut bob_rx);
    assert_eq!(count(&events, "typing_stop"), 1);
}
