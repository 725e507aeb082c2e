//! ConnectionHandle port - one live duplex client connection.

use async_trait::async_trait;

/// Errors raised while writing to a client connection.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    /// The transport failed mid-write.
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Write side of a client connection.
///
/// The registry owns one handle per session and treats any `Err` from
/// [`send_text`](ConnectionHandle::send_text) as a dead connection.
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Write one text frame to the client.
    async fn send_text(&self, text: &str) -> Result<(), SendError>;
}
