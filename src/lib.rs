//! Chat Relay - WebSocket relay for a streaming response engine
//!
//! Accepts text messages over per-session WebSocket connections, runs each
//! through an external response engine, and sends back a single reply.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
