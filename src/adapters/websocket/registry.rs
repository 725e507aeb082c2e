//! Per-session connection registry.
//!
//! Maps each session id to the one live connection currently serving it.
//! Delivery is best-effort: a write failure removes the session and is
//! never reported back to the caller as an error.
//!
//! # Concurrency
//!
//! The map lives behind an async `RwLock`. The lock is never held across a
//! transport write: `send` clones the handle out under a read lock, writes
//! without it, and on failure removes the entry only if it still belongs to
//! the same [`ConnectionId`]. A connection that replaced the failed one in
//! the meantime is left alone.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::foundation::{ConnectionId, SessionId};
use crate::ports::ConnectionHandle;

/// What happened to a single `send` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the client.
    Delivered,
    /// Message was empty or whitespace-only; nothing attempted.
    Blank,
    /// No connection registered for the session; nothing attempted.
    NotConnected,
    /// The write failed and the session was removed.
    Failed,
}

struct Registration {
    connection_id: ConnectionId,
    handle: Arc<dyn ConnectionHandle>,
}

/// Registry of live client connections keyed by session.
///
/// At most one connection is registered per session; a new `connect` for
/// the same session replaces the old one (last connect wins).
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<SessionId, Registration>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an accepted connection under `session_id`.
    ///
    /// The transport handshake has already completed by the time this is
    /// called. Any connection previously registered for the session is
    /// dropped from the registry.
    pub async fn connect(
        &self,
        handle: Arc<dyn ConnectionHandle>,
        session_id: &SessionId,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();
        let previous = self.connections.write().await.insert(
            session_id.clone(),
            Registration {
                connection_id,
                handle,
            },
        );

        if let Some(previous) = previous {
            tracing::debug!(
                session = %session_id.redacted(),
                replaced = %previous.connection_id,
                "Replacing existing connection for session"
            );
        }
        tracing::info!(
            session = %session_id.redacted(),
            connection_id = %connection_id,
            "Web client connected"
        );

        connection_id
    }

    /// Remove whatever connection is registered for `session_id`.
    ///
    /// Returns `false` if nothing was registered.
    pub async fn disconnect(&self, session_id: &SessionId) -> bool {
        let removed = self.connections.write().await.remove(session_id).is_some();
        tracing::info!(session = %session_id.redacted(), "Web client disconnected");
        removed
    }

    /// Remove the registration for `session_id` only if it is still
    /// `connection_id`.
    ///
    /// Used when a specific connection ends, so that it cannot evict a newer
    /// connection that took over the same session.
    pub async fn release(&self, session_id: &SessionId, connection_id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        let owned = connections
            .get(session_id)
            .is_some_and(|r| r.connection_id == connection_id);
        if owned {
            connections.remove(session_id);
            drop(connections);
            tracing::info!(
                session = %session_id.redacted(),
                connection_id = %connection_id,
                "Web client disconnected"
            );
        }
        owned
    }

    /// Best-effort delivery of `message` to `session_id`.
    ///
    /// Blank messages and unknown sessions are silently skipped. A failed
    /// write removes the session. Errors never reach the caller; the
    /// returned [`Delivery`] only describes which path was taken.
    pub async fn send(&self, message: &str, session_id: &SessionId) -> Delivery {
        if message.trim().is_empty() {
            return Delivery::Blank;
        }

        let (connection_id, handle) = {
            let connections = self.connections.read().await;
            match connections.get(session_id) {
                Some(r) => (r.connection_id, Arc::clone(&r.handle)),
                None => return Delivery::NotConnected,
            }
        };

        match handle.send_text(message).await {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                tracing::debug!(
                    session = %session_id.redacted(),
                    connection_id = %connection_id,
                    "Send failed, dropping connection: {}",
                    e
                );
                self.release(session_id, connection_id).await;
                Delivery::Failed
            }
        }
    }

    /// Whether a connection is registered for `session_id`.
    pub async fn is_connected(&self, session_id: &SessionId) -> bool {
        self.connections.read().await.contains_key(session_id)
    }

    /// Number of sessions with a registered connection.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}
