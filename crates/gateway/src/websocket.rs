//! WebSocket endpoint: authentication, the per-connection loop, and
//! dispatch of client events into the realtime engine.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use intercom_realtime::{
    AuthError, ConnectionHandle, MessageEnvelope, RealtimeError, ServerEvent,
};

use crate::error::GatewayError;
use crate::protocol::ClientEvent;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct WebSocketQuery {
    token: Option<String>,
}

/// WebSocket connection handler. Authentication happens before the
/// upgrade; an unauthenticated request never reaches the engine.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<GatewayState>,
    Query(query): Query<WebSocketQuery>,
) -> Response {
    let Some(token) = query.token else {
        return GatewayError::AuthenticationFailed("missing token".to_string()).into_response();
    };

    let user_id = match state.auth.verify(&token).await {
        Ok(user_id) => user_id,
        Err(AuthError::Rejected(reason)) => {
            return GatewayError::AuthenticationFailed(reason).into_response();
        }
        Err(AuthError::Unavailable(reason)) => {
            return GatewayError::ServiceUnavailable(reason).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, token))
}

/// Run one authenticated connection until the client goes away.
async fn handle_socket(socket: WebSocket, state: GatewayState, user_id: String, token: String) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let connection_id = cuid2::create_id();
    let handle = ConnectionHandle::new(connection_id.clone(), user_id.clone(), tx.clone());
    state.engine.connect(handle).await;

    let _ = tx.send(ServerEvent::Hello {
        user_id: user_id.clone(),
        connection_id: connection_id.clone(),
    });
    debug!(user_id, connection_id, "websocket connected");

    // Writer task: drains the connection's outbound channel into the
    // socket, preserving per-connection event order.
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(text) => {
                    if ws_tx.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(error) => warn!(%error, "failed to serialise outbound event"),
            }
        }
    });

    // Reader loop: parse frames, dispatch into the engine.
    while let Some(frame) = ws_rx.next().await {
        let Ok(frame) = frame else { break };
        match frame {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    let teardown = dispatch(event, &state, &user_id, &token, &tx).await;
                    if teardown {
                        break;
                    }
                }
                Err(error) => {
                    let _ = tx.send(ServerEvent::Error {
                        error: "BAD_EVENT".to_string(),
                        message: format!("unparseable client event: {error}"),
                    });
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    state.engine.disconnect(&connection_id).await;
    writer.abort();
    debug!(user_id, connection_id, "websocket closed");
}

/// Handle one client event. Returns `true` when the connection should be
/// torn down (logout).
async fn dispatch(
    event: ClientEvent,
    state: &GatewayState,
    user_id: &str,
    token: &str,
    tx: &mpsc::UnboundedSender<ServerEvent>,
) -> bool {
    match event {
        ClientEvent::Ping => {
            let _ = tx.send(ServerEvent::Pong);
        }

        ClientEvent::SendMessage {
            chat_id,
            kind,
            content,
            correlation_id,
        } => {
            if let Err(error) = require(&[("chat_id", &chat_id), ("content", &content)]) {
                let _ = tx.send(ServerEvent::ack_failure(correlation_id, error.to_string()));
                return false;
            }

            let envelope = MessageEnvelope {
                chat_id,
                sender_id: user_id.to_string(),
                kind,
                content,
                client_id: correlation_id.clone(),
            };
            let ack = match state.engine.send_message(envelope).await {
                Ok(record) => ServerEvent::ack_success(correlation_id, Some(record.id)),
                Err(error) => ServerEvent::ack_failure(correlation_id, error.to_string()),
            };
            let _ = tx.send(ack);
        }

        ClientEvent::DeleteMessage { chat_id, message_id } => {
            let ack = match require(&[("chat_id", &chat_id), ("message_id", &message_id)]) {
                Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                Ok(()) => match state
                    .engine
                    .delete_message(&chat_id, &message_id, user_id)
                    .await
                {
                    Ok(()) => ServerEvent::ack_success(None, Some(message_id)),
                    Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                },
            };
            let _ = tx.send(ack);
        }

        ClientEvent::EditMessage {
            chat_id,
            message_id,
            content,
        } => {
            let ack = match require(&[
                ("chat_id", &chat_id),
                ("message_id", &message_id),
                ("content", &content),
            ]) {
                Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                Ok(()) => match state
                    .engine
                    .edit_message(&chat_id, &message_id, user_id, &content)
                    .await
                {
                    Ok(record) => ServerEvent::ack_success(None, Some(record.id)),
                    Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                },
            };
            let _ = tx.send(ack);
        }

        ClientEvent::React {
            chat_id,
            message_id,
            reaction,
        } => {
            let ack = match require(&[
                ("chat_id", &chat_id),
                ("message_id", &message_id),
                ("reaction", &reaction),
            ]) {
                Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                Ok(()) => match state
                    .engine
                    .react(&chat_id, &message_id, user_id, &reaction)
                    .await
                {
                    Ok(()) => ServerEvent::ack_success(None, Some(message_id)),
                    Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                },
            };
            let _ = tx.send(ack);
        }

        ClientEvent::MarkRead { chat_id, message_id } => {
            let ack = match require(&[("chat_id", &chat_id), ("message_id", &message_id)]) {
                Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                Ok(()) => match state.engine.mark_read(&chat_id, &message_id, user_id).await {
                    Ok(()) => ServerEvent::ack_success(None, Some(message_id)),
                    Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                },
            };
            let _ = tx.send(ack);
        }

        ClientEvent::MarkReadAll { chat_id } => {
            let ack = match require(&[("chat_id", &chat_id)]) {
                Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                Ok(()) => match state.engine.mark_all_read(&chat_id, user_id).await {
                    Ok(()) => ServerEvent::ack_success(None, None),
                    Err(error) => ServerEvent::ack_failure(None, error.to_string()),
                },
            };
            let _ = tx.send(ack);
        }

        ClientEvent::Delivered { chat_id, message_id } => {
            // Broadcast-only; failures are logged, not acked.
            if let Err(error) = state
                .engine
                .signal_delivered(&chat_id, &message_id, user_id)
                .await
            {
                debug!(user_id, chat_id, %error, "delivered signal dropped");
            }
        }

        ClientEvent::TypingStart { chat_id } => {
            if !chat_id.is_empty() {
                state.engine.typing_started(user_id, &chat_id).await;
            }
        }

        ClientEvent::TypingStop { chat_id } => {
            if !chat_id.is_empty() {
                state.engine.typing_stopped(user_id, &chat_id).await;
            }
        }

        ClientEvent::QueryStatus { user_id: target } => {
            let status = state.engine.query_status(&target).await;
            // Point-to-point: only the requesting connection hears this.
            let _ = tx.send(ServerEvent::StatusResponse {
                user_id: target,
                status,
            });
        }

        ClientEvent::Logout => {
            if let Err(error) = state.auth.revoke(token).await {
                warn!(user_id, %error, "failed to revoke session on logout");
            }
            state.engine.logout(user_id).await;
            return true;
        }
    }

    false
}

/// Reject operations with missing required fields before they reach the
/// engine.
fn require(fields: &[(&str, &str)]) -> Result<(), RealtimeError> {
    for (name, value) in fields {
        if value.is_empty() {
            return Err(RealtimeError::validation(format!("{name} is required")));
        }
    }
    Ok(())
}
