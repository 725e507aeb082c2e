//! Message dispatcher.
//!
//! Turns one inbound chat message into exactly one outbound reply: the
//! engine's final response, or one of the two fixed fallback replies.
//! Engine failures (errors and panics alike) stop at this boundary; they are
//! logged here and never reach the connection loop.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tokio::task::JoinHandle;

use crate::adapters::websocket::{ConnectionRegistry, Delivery};
use crate::domain::foundation::SessionId;
use crate::domain::relay::{EngineInput, FallbackReply};
use crate::ports::{EngineError, ResponseEngine};

/// Which reply `process` sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The engine produced a final response and it was sent.
    Answered(Delivery),
    /// The event stream ended without a final response.
    NoAnswer(Delivery),
    /// The engine failed; the failure reply was sent.
    EngineFailed(Delivery),
}

impl DispatchOutcome {
    /// How the single reply was delivered.
    pub fn delivery(&self) -> Delivery {
        match *self {
            DispatchOutcome::Answered(d)
            | DispatchOutcome::NoAnswer(d)
            | DispatchOutcome::EngineFailed(d) => d,
        }
    }
}

/// Relays messages to the engine and replies through the registry.
#[derive(Clone)]
pub struct MessageDispatcher {
    engine: Arc<dyn ResponseEngine>,
    registry: Arc<ConnectionRegistry>,
}

impl MessageDispatcher {
    /// Creates a dispatcher over the given engine and registry.
    pub fn new(engine: Arc<dyn ResponseEngine>, registry: Arc<ConnectionRegistry>) -> Self {
        Self { engine, registry }
    }

    /// The registry replies are written to.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Process `raw_message` on its own task without waiting for it.
    ///
    /// Messages dispatched back to back on one session are not ordered:
    /// each reply is sent whenever its engine run finishes.
    pub fn dispatch(&self, raw_message: String, session_id: SessionId) -> JoinHandle<DispatchOutcome> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.process(&raw_message, &session_id).await })
    }

    /// Run the engine for one message and send exactly one reply.
    pub async fn process(&self, raw_message: &str, session_id: &SessionId) -> DispatchOutcome {
        let run = AssertUnwindSafe(self.find_final_response(raw_message, session_id))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(EngineError::failed(panic_message(&*panic))));

        match run {
            Ok(Some(answer)) => {
                DispatchOutcome::Answered(self.registry.send(&answer, session_id).await)
            }
            Ok(None) => {
                tracing::debug!(
                    session = %session_id.redacted(),
                    "Engine finished without a final response"
                );
                let reply = FallbackReply::NoAnswer.text();
                DispatchOutcome::NoAnswer(self.registry.send(reply, session_id).await)
            }
            Err(e) => {
                tracing::error!(
                    session = %session_id.redacted(),
                    error = %e,
                    "Graph error"
                );
                let reply = FallbackReply::EngineFailure.text();
                DispatchOutcome::EngineFailed(self.registry.send(reply, session_id).await)
            }
        }
    }

    /// Scan engine events until the first deliverable answer.
    ///
    /// Returning early drops the stream, so no further events are pulled.
    async fn find_final_response(
        &self,
        raw_message: &str,
        session_id: &SessionId,
    ) -> Result<Option<String>, EngineError> {
        let input = EngineInput::new(raw_message, session_id);
        let mut events = self.engine.stream_events(input).await?;

        while let Some(event) = events.next().await {
            let event = event?;
            if event.final_response().is_some() {
                tracing::debug!(
                    session = %session_id.redacted(),
                    kind = event.kind.as_deref().unwrap_or("-"),
                    node = event.name.as_deref().unwrap_or("-"),
                    "Final response found"
                );
                return Ok(event.into_final_response());
            }
        }

        Ok(None)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("engine panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("engine panicked: {}", s)
    } else {
        "engine panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::engine::{ScriptStep, ScriptedEngine};
    use crate::ports::{ConnectionHandle, SendError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingConnection {
        sent: Mutex<Vec<String>>,
    }

    impl RecordingConnection {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConnectionHandle for RecordingConnection {
        async fn send_text(&self, text: &str) -> Result<(), SendError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Fixture {
        engine: ScriptedEngine,
        connection: Arc<RecordingConnection>,
        dispatcher: MessageDispatcher,
        session: SessionId,
    }

    async fn fixture(engine: ScriptedEngine) -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let connection = Arc::new(RecordingConnection::default());
        let session = SessionId::new("session-under-test").unwrap();
        registry.connect(connection.clone(), &session).await;

        Fixture {
            dispatcher: MessageDispatcher::new(Arc::new(engine.clone()), registry),
            engine,
            connection,
            session,
        }
    }

    fn answer(text: &str) -> serde_json::Value {
        json!({"data": {"output": {"final_response": text}}})
    }

    #[tokio::test]
    async fn sends_final_response_once() {
        let f = fixture(ScriptedEngine::new().with_events(vec![answer("hello")])).await;

        let outcome = f.dispatcher.process("hi", &f.session).await;

        assert_eq!(outcome, DispatchOutcome::Answered(Delivery::Delivered));
        assert_eq!(f.connection.sent(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn answer_with_event_metadata_is_sent() {
        let f = fixture(ScriptedEngine::new().with_events(vec![json!({
            "event": "on_chain_end",
            "name": "responder",
            "data": {"output": {"final_response": "from the responder node"}}
        })]))
        .await;

        let outcome = f.dispatcher.process("hi", &f.session).await;

        assert_eq!(outcome, DispatchOutcome::Answered(Delivery::Delivered));
        assert_eq!(f.connection.sent(), vec!["from the responder node".to_string()]);
        assert_eq!(f.engine.events_pulled(), 1);
    }

    #[tokio::test]
    async fn forwards_message_and_session_to_engine() {
        let f = fixture(ScriptedEngine::new()).await;

        f.dispatcher.process("where is the shelter?", &f.session).await;

        let calls = f.engine.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].raw_message, "where is the shelter?");
        assert_eq!(calls[0].session_id, "session-under-test");
    }

    #[tokio::test]
    async fn skips_non_record_output_and_stops_at_answer() {
        let f = fixture(ScriptedEngine::new().with_events(vec![
            json!({"data": {"output": true}}),
            answer("hello"),
            answer("too late"),
            json!({"data": {"output": null}}),
        ]))
        .await;

        f.dispatcher.process("hi", &f.session).await;

        assert_eq!(f.connection.sent(), vec!["hello".to_string()]);
        assert_eq!(f.engine.events_pulled(), 2);
    }

    #[tokio::test]
    async fn record_without_answer_sends_no_answer_fallback() {
        let f = fixture(
            ScriptedEngine::new().with_events(vec![json!({"data": {"output": {"other_key": "x"}}})]),
        )
        .await;

        let outcome = f.dispatcher.process("hi", &f.session).await;

        assert_eq!(outcome, DispatchOutcome::NoAnswer(Delivery::Delivered));
        assert_eq!(
            f.connection.sent(),
            vec!["I'm having trouble responding right now. Please try again in a moment.".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_stream_sends_no_answer_fallback() {
        let f = fixture(ScriptedEngine::new().with_events(vec![])).await;

        let outcome = f.dispatcher.process("hi", &f.session).await;

        assert!(matches!(outcome, DispatchOutcome::NoAnswer(_)));
        assert_eq!(f.connection.sent(), vec![FallbackReply::NoAnswer.text().to_string()]);
    }

    #[tokio::test]
    async fn startup_failure_sends_error_fallback() {
        let f = fixture(ScriptedEngine::new().with_startup_failure("graph exploded")).await;

        let outcome = f.dispatcher.process("hi", &f.session).await;

        assert_eq!(outcome, DispatchOutcome::EngineFailed(Delivery::Delivered));
        assert_eq!(
            f.connection.sent(),
            vec!["Sorry, something went wrong. Please try again.".to_string()]
        );
    }

    #[tokio::test]
    async fn mid_stream_failure_sends_error_fallback() {
        let f = fixture(ScriptedEngine::new().with_steps(vec![
            ScriptStep::Event(json!({"data": {"output": "thinking"}})),
            ScriptStep::Fail("node crashed".to_string()),
            ScriptStep::Event(answer("never reached")),
        ]))
        .await;

        let outcome = f.dispatcher.process("hi", &f.session).await;

        assert!(matches!(outcome, DispatchOutcome::EngineFailed(_)));
        assert_eq!(
            f.connection.sent(),
            vec![FallbackReply::EngineFailure.text().to_string()]
        );
    }

    #[tokio::test]
    async fn undecodable_event_sends_error_fallback() {
        let f = fixture(ScriptedEngine::new().with_events(vec![json!("not a record")])).await;

        let outcome = f.dispatcher.process("hi", &f.session).await;

        assert!(matches!(outcome, DispatchOutcome::EngineFailed(_)));
        assert_eq!(f.connection.sent().len(), 1);
    }

    #[tokio::test]
    async fn engine_panic_sends_error_fallback() {
        let f = fixture(
            ScriptedEngine::new().with_steps(vec![ScriptStep::Panic("bad state".to_string())]),
        )
        .await;

        let outcome = f.dispatcher.process("hi", &f.session).await;

        assert!(matches!(outcome, DispatchOutcome::EngineFailed(_)));
        assert_eq!(
            f.connection.sent(),
            vec![FallbackReply::EngineFailure.text().to_string()]
        );
    }

    #[tokio::test]
    async fn reply_to_disconnected_session_is_dropped() {
        let f = fixture(ScriptedEngine::new().with_events(vec![answer("hello")])).await;
        f.dispatcher.registry().disconnect(&f.session).await;

        let outcome = f.dispatcher.process("hi", &f.session).await;

        assert_eq!(outcome, DispatchOutcome::Answered(Delivery::NotConnected));
        assert!(f.connection.sent().is_empty());
    }

    #[tokio::test]
    async fn dispatch_runs_detached() {
        let f = fixture(
            ScriptedEngine::new()
                .with_events(vec![answer("slow answer")])
                .with_delay(Duration::from_millis(20)),
        )
        .await;

        let handle = f.dispatcher.dispatch("hi".to_string(), f.session.clone());
        assert!(f.connection.sent().is_empty());

        let outcome = handle.await.unwrap();
        assert_eq!(outcome.delivery(), Delivery::Delivered);
        assert_eq!(f.connection.sent(), vec!["slow answer".to_string()]);
    }

    #[tokio::test]
    async fn disconnect_during_processing_drops_reply() {
        let f = fixture(
            ScriptedEngine::new()
                .with_events(vec![answer("late")])
                .with_delay(Duration::from_millis(50)),
        )
        .await;

        let handle = f.dispatcher.dispatch("hi".to_string(), f.session.clone());
        f.dispatcher.registry().disconnect(&f.session).await;

        let outcome = handle.await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Answered(Delivery::NotConnected));
        assert!(f.connection.sent().is_empty());
    }
}
