//! Shared types for the database layer.

pub mod errors;

pub use errors::{DatabaseError, DatabaseResult};
