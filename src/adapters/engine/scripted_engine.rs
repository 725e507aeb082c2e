//! Scripted engine for testing.
//!
//! Replays pre-configured event sequences instead of calling a real engine.
//!
//! # Features
//!
//! - Raw JSON events, decoded through the same path as real engine output
//! - Mid-stream failures and startup failures
//! - Simulated per-event latency
//! - Call and pull tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let engine = ScriptedEngine::new()
//!     .with_events(vec![json!({"data": {"output": {"final_response": "hi"}}})]);
//! ```

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::relay::{EngineEvent, EngineInput};
use crate::ports::{EngineError, EngineEventStream, ResponseEngine};

/// One item of a scripted event stream.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Yield this JSON value as an event.
    Event(Value),
    /// Yield an engine error.
    Fail(String),
    /// Panic while producing the next event.
    Panic(String),
}

#[derive(Debug, Clone)]
enum Script {
    Stream(Vec<ScriptStep>),
    StartupFailure(String),
}

/// Engine double that replays scripted runs, one per call.
///
/// Calls beyond the configured scripts get an empty stream.
#[derive(Debug, Clone, Default)]
pub struct ScriptedEngine {
    /// Scripts consumed in order, one per `stream_events` call.
    scripts: Arc<Mutex<VecDeque<Script>>>,
    /// Simulated latency before each event.
    delay: Duration,
    /// Inputs received, for verification.
    calls: Arc<Mutex<Vec<EngineInput>>>,
    /// Number of stream items consumed across all calls.
    pulled: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    /// Creates an engine with no scripts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a run that yields the given events and ends.
    pub fn with_events(self, events: Vec<Value>) -> Self {
        self.with_steps(events.into_iter().map(ScriptStep::Event).collect())
    }

    /// Adds a run built from arbitrary steps.
    pub fn with_steps(self, steps: Vec<ScriptStep>) -> Self {
        self.push(Script::Stream(steps));
        self
    }

    /// Adds a run that fails before producing a stream.
    pub fn with_startup_failure(self, message: impl Into<String>) -> Self {
        self.push(Script::StartupFailure(message.into()));
        self
    }

    /// Sets latency applied before every event.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Inputs received so far.
    pub fn calls(&self) -> Vec<EngineInput> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of stream items consumed so far.
    pub fn events_pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    fn push(&self, script: Script) {
        self.scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(script);
    }
}

#[async_trait]
impl ResponseEngine for ScriptedEngine {
    async fn stream_events(&self, input: EngineInput) -> Result<EngineEventStream, EngineError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(input);

        let script = self
            .scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(Script::Stream(Vec::new()));

        let steps = match script {
            Script::StartupFailure(message) => return Err(EngineError::failed(message)),
            Script::Stream(steps) => steps,
        };

        let delay = self.delay;
        let pulled = Arc::clone(&self.pulled);
        let stream = stream::iter(steps).then(move |step| {
            let pulled = Arc::clone(&pulled);
            async move {
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                pulled.fetch_add(1, Ordering::SeqCst);
                match step {
                    ScriptStep::Event(value) => serde_json::from_value::<EngineEvent>(value)
                        .map_err(|e| EngineError::decode(e.to_string())),
                    ScriptStep::Fail(message) => Err(EngineError::failed(message)),
                    ScriptStep::Panic(message) => panic!("{}", message),
                }
            }
        });

        Ok(Box::pin(stream))
    }
}
