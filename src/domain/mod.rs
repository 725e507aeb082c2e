//! Domain layer containing the relay's value types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, errors)
//! - `relay` - Engine input/event types and the fixed fallback replies

pub mod foundation;
pub mod relay;
