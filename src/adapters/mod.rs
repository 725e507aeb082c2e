//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the relay to external systems:
//! - `engine` - Response engine clients (HTTP, scripted)
//! - `websocket` - Client connections and the session registry
//! - `http` - Router assembly and the health endpoint

pub mod engine;
pub mod http;
pub mod websocket;

pub use engine::{HttpEngineConfig, HttpGraphEngine, ScriptStep, ScriptedEngine};
pub use http::app_router;
pub use websocket::{ConnectionRegistry, Delivery, WebSocketState};
