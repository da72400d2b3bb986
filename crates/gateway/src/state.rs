//! Shared application state for the gateway

use std::sync::Arc;

use intercom_realtime::{Authenticator, RealtimeEngine};

/// Shared state handed to every connection handler
#[derive(Clone)]
pub struct GatewayState {
    /// The realtime engine, single authority for presence and fan-out
    pub engine: Arc<RealtimeEngine>,
    /// Session authenticator consulted before any upgrade
    pub auth: Arc<dyn Authenticator>,
}

impl GatewayState {
    pub fn new(engine: Arc<RealtimeEngine>, auth: Arc<dyn Authenticator>) -> Self {
        Self { engine, auth }
    }
}
