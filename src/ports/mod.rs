//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the relay and the outside world. Adapters implement these ports.
//!
//! - `ConnectionHandle` - One live client transport that can receive text
//! - `ResponseEngine` - External engine that turns a message into events

mod connection;
mod response_engine;

pub use connection::{ConnectionHandle, SendError};
pub use response_engine::{EngineError, EngineEventStream, ResponseEngine};
