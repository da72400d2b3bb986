//! Error types for the real-time engine.

use thiserror::Error;

use crate::traits::StoreError;

/// Result type alias for engine operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Main error type for the real-time engine
#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("validation error: {message}")]
    Validation { message: String },

    #[error("user {user_id} is not a participant of chat {chat_id}")]
    NotAParticipant { user_id: String, chat_id: String },

    #[error("collaborator unavailable: {message}")]
    CollaboratorUnavailable { message: String },

    #[error("not found: {what}")]
    NotFound { what: String },
}

impl RealtimeError {
    /// Create an unauthorized error
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized { reason: reason.into() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    /// Create a not-a-participant error
    pub fn not_a_participant(user_id: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::NotAParticipant {
            user_id: user_id.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Create a collaborator-unavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable { message: message.into() }
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }
}

impl From<StoreError> for RealtimeError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(what) => RealtimeError::NotFound { what },
            StoreError::Unavailable(message) => {
                RealtimeError::CollaboratorUnavailable { message }
            }
        }
    }
}
