//! Foundation module - Shared domain primitives.
//!
//! Contains the identifiers and error types that form the vocabulary
//! of the relay.

mod errors;
mod ids;

pub use errors::ValidationError;
pub use ids::{ConnectionId, SessionId, REDACTED_SESSION_LEN};
