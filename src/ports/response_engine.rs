//! ResponseEngine port - Interface for the external response generator.
//!
//! The engine is invoked once per inbound message and answers with a lazy,
//! finite stream of [`EngineEvent`]s. The relay only looks for the first
//! event carrying a final response; dropping the stream abandons the rest.
//!
//! # Example
//!
//! ```ignore
//! let mut events = engine.stream_events(EngineInput::new(text, &session_id)).await?;
//! while let Some(event) = events.next().await {
//!     if let Some(answer) = event?.into_final_response() {
//!         return Ok(Some(answer));
//!     }
//! }
//! ```

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

use crate::domain::relay::{EngineEvent, EngineInput};

/// Stream of decoded engine events.
pub type EngineEventStream = Pin<Box<dyn Stream<Item = Result<EngineEvent, EngineError>> + Send>>;

/// Port for the external event-producing engine.
#[async_trait]
pub trait ResponseEngine: Send + Sync {
    /// Start a streaming execution for one message.
    async fn stream_events(&self, input: EngineInput) -> Result<EngineEventStream, EngineError>;
}

/// Errors from invoking or consuming the engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Could not reach the engine or the stream broke.
    #[error("Network error: {0}")]
    Network(String),

    /// The engine did not answer in time.
    #[error("Engine timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The engine answered with a non-success status.
    #[error("Engine returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// An event could not be decoded.
    #[error("Malformed event: {0}")]
    Decode(String),

    /// The engine failed while producing events.
    #[error("Engine failure: {0}")]
    Failed(String),
}

impl EngineError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        EngineError::Network(message.into())
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        EngineError::Decode(message.into())
    }

    /// Creates a generic engine failure.
    pub fn failed(message: impl Into<String>) -> Self {
        EngineError::Failed(message.into())
    }
}
