//! Engine input and event types.
//!
//! The engine's event schema is loosely typed: `data.output` may be absent,
//! a boolean, a string, null, a number, a list, or a record. Events are
//! decoded once, here, into an [`EventOutput`] so the dispatcher only ever
//! asks "is there a final answer?".

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::foundation::SessionId;

/// Input handed to the engine for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineInput {
    /// Message text exactly as received from the client.
    pub raw_message: String,
    /// Session the message arrived on.
    pub session_id: String,
}

impl EngineInput {
    /// Creates the input for one message.
    pub fn new(raw_message: impl Into<String>, session_id: &SessionId) -> Self {
        Self {
            raw_message: raw_message.into(),
            session_id: session_id.as_str().to_string(),
        }
    }
}

/// Classified `data.output` field of an engine event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventOutput {
    /// No `data` or no `output` field.
    #[default]
    Missing,
    /// A record. `final_response` is set only when the record carried a
    /// non-blank string under that key.
    Record { final_response: Option<String> },
    /// Any non-record value (boolean, string, null, number, list).
    Unrecognized,
}

impl EventOutput {
    fn classify(output: Option<&Value>) -> Self {
        match output {
            None => EventOutput::Missing,
            Some(Value::Object(record)) => EventOutput::Record {
                final_response: record
                    .get("final_response")
                    .and_then(Value::as_str)
                    .filter(|text| !text.trim().is_empty())
                    .map(str::to_string),
            },
            Some(_) => EventOutput::Unrecognized,
        }
    }
}

/// One event from the engine's stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawEngineEvent")]
pub struct EngineEvent {
    /// Event kind reported by the engine (e.g. `on_chain_end`), if any.
    pub kind: Option<String>,
    /// Name of the engine node that produced the event, if any.
    pub name: Option<String>,
    /// Classified output payload.
    pub output: EventOutput,
}

impl EngineEvent {
    /// The deliverable answer carried by this event, if any.
    pub fn final_response(&self) -> Option<&str> {
        match &self.output {
            EventOutput::Record { final_response } => final_response.as_deref(),
            _ => None,
        }
    }

    /// Consumes the event, returning its deliverable answer if any.
    pub fn into_final_response(self) -> Option<String> {
        match self.output {
            EventOutput::Record { final_response } => final_response,
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawEngineEvent {
    #[serde(default, rename = "event")]
    kind: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    data: Value,
}

impl From<RawEngineEvent> for EngineEvent {
    fn from(raw: RawEngineEvent) -> Self {
        Self {
            kind: raw.kind,
            name: raw.name,
            output: EventOutput::classify(raw.data.get("output")),
        }
    }
}
