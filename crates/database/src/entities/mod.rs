//! Entity definitions for the database layer.

pub mod chat;
pub mod message;
pub mod session;
pub mod user;

pub use chat::{Chat, ChatMember, CreateChatRequest};
pub use message::{ChatMessage, MessageReaction, MessageRead};
pub use session::AuthSession;
pub use user::{CreateUserRequest, User};
