//! Application handlers.

pub mod process_message;

pub use process_message::{DispatchOutcome, MessageDispatcher};
