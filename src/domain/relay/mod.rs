//! Relay domain - what flows between a chat session and the engine.

mod events;
mod replies;

pub use events::{EngineEvent, EngineInput, EventOutput};
pub use replies::FallbackReply;
