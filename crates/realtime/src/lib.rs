//! # Intercom Realtime Crate
//!
//! The real-time messaging and presence coordination engine: maps users to
//! live connections, fans events out to the correct recipient set, tracks
//! typing state with timeout-based expiry, and keeps presence transitions
//! edge-triggered.
//!
//! Persistence and chat membership are collaborators behind the traits in
//! [`traits`]; the engine itself holds only in-memory state and is the
//! single authority for it.

pub mod engine;
pub mod error;
pub mod events;
pub mod fanout;
pub mod message;
pub mod presence;
pub mod registry;
pub mod traits;
pub mod typing;

// Re-export main types for convenience
pub use engine::RealtimeEngine;
pub use error::{RealtimeError, RealtimeResult};
pub use events::{PresenceStatus, ServerEvent};
pub use fanout::FanoutEngine;
pub use message::{MessageEnvelope, MessageKind, MessageRecord};
pub use presence::PresenceTracker;
pub use registry::{ConnectionHandle, ConnectionRegistry, Disconnect};
pub use traits::{
    AuthError, Authenticator, MembershipResolver, MessageStore, StoreError, StoreResult,
};
pub use typing::{TypingCoordinator, TYPING_EXPIRY};
