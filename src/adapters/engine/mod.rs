//! Response engine adapters.
//!
//! - `HttpGraphEngine` - Remote graph-execution server over HTTP/SSE
//! - `ScriptedEngine` - Replays configured event streams (testing)

mod http_graph_engine;
mod scripted_engine;

pub use http_graph_engine::{HttpEngineConfig, HttpGraphEngine};
pub use scripted_engine::{ScriptStep, ScriptedEngine};
