//! Session entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user_id: String,
    pub created_at: String,
    pub expires_at: String,
}

impl AuthSession {
    /// A session with an unparseable expiry is treated as expired.
    pub fn is_expired(&self) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires_at) => expires_at <= Utc::now(),
            Err(_) => true,
        }
    }
}
