//! WebSocket upgrade handler for chat sessions.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Validate the session id from the path
//! 2. Upgrade to WebSocket
//! 3. Register the connection under its session
//! 4. Dispatch each non-blank text frame to the engine without waiting
//! 5. Release the session when the client goes away

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;

use crate::application::MessageDispatcher;
use crate::domain::foundation::SessionId;
use crate::ports::{ConnectionHandle, ResponseEngine, SendError};

use super::registry::ConnectionRegistry;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    /// Dispatcher that relays messages and writes replies.
    pub dispatcher: MessageDispatcher,
}

impl WebSocketState {
    /// Create state around an existing dispatcher.
    pub fn new(dispatcher: MessageDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Create state with a fresh registry for the given engine.
    pub fn with_engine(engine: Arc<dyn ResponseEngine>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self::new(MessageDispatcher::new(engine, registry))
    }

    /// The registry shared by all connections.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        self.dispatcher.registry()
    }
}

/// Write half of an accepted WebSocket.
pub struct WebSocketConnection {
    sender: Mutex<SplitSink<WebSocket, Message>>,
}

impl WebSocketConnection {
    /// Wrap the write half of a split socket.
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

#[async_trait]
impl ConnectionHandle for WebSocketConnection {
    async fn send_text(&self, text: &str) -> Result<(), SendError> {
        self.sender
            .lock()
            .await
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| SendError::Transport(e.to_string()))
    }
}

/// Handle WebSocket upgrade requests for a chat session.
///
/// Route: `GET /ws/:session_id`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    State(state): State<WebSocketState>,
) -> Response {
    let session_id = match SessionId::new(session_id) {
        Ok(id) => id,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

/// Handle an established WebSocket connection.
///
/// Runs for the lifetime of the connection. Replies are written by
/// dispatched tasks through the registry, never by this loop.
async fn handle_socket(socket: WebSocket, session_id: SessionId, state: WebSocketState) {
    let (sender, mut receiver) = socket.split();

    let connection_id = state
        .registry()
        .connect(Arc::new(WebSocketConnection::new(sender)), &session_id)
        .await;

    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if text.trim().is_empty() {
                    continue;
                }
                state.dispatcher.dispatch(text, session_id.clone());
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!(
                    session = %session_id.redacted(),
                    "Received unsupported binary message"
                );
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Protocol pings are answered by the transport
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(session = %session_id.redacted(), "Client sent close frame");
                break;
            }
            Err(e) => {
                tracing::debug!(session = %session_id.redacted(), "Receive error: {}", e);
                break;
            }
        }
    }

    state.registry().release(&session_id, connection_id).await;
}

/// Create axum router for the WebSocket endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/ws/:session_id", get(ws_handler))
}
