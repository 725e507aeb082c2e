//! WebSocket adapters for chat sessions.
//!
//! # Architecture
//!
//! ```text
//!  client ──text frame──▶ handler read loop ──spawn──▶ MessageDispatcher ──▶ ResponseEngine
//!     ▲                        │                              │
//!     │                   connect/release                    send
//!     │                        ▼                              ▼
//!     └──────────── ConnectionRegistry (session → connection) ◀┘
//! ```
//!
//! # Components
//!
//! - [`registry`] - Session → connection map with best-effort delivery
//! - [`handler`] - Axum WebSocket upgrade handler and read loop

pub mod handler;
pub mod registry;

pub use handler::{websocket_router, ws_handler, WebSocketConnection, WebSocketState};
pub use registry::{ConnectionRegistry, Delivery};
