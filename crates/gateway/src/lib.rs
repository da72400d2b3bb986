//! # Intercom Gateway Crate
//!
//! Thin presentation layer in front of the realtime engine: a WebSocket
//! endpoint that authenticates connections, translates socket frames into
//! engine operations, and pushes the engine's outbound events back to
//! clients.

pub mod error;
pub mod health;
pub mod protocol;
pub mod state;
pub mod websocket;

// Re-export main types for convenience
pub use error::{GatewayError, GatewayResult};
pub use protocol::ClientEvent;
pub use state::GatewayState;

use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/ws", get(websocket::ws_handler))
        .route("/health", get(health::health_check))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(Any),
        )
        .with_state(state)
}
