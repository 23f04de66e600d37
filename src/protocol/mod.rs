// src/protocol/mod.rs

//! supervisord eventlistener protocol.
//!
//! - [`header`] parses event headers and payloads into [`ListenerEvent`]s.
//! - [`listener`] drives the READY / event / RESULT exchange over stdin and
//!   stdout.

pub mod header;
pub mod listener;

pub use header::{EventHeader, ListenerEvent, MAX_PAYLOAD_LEN, StateChange, parse_tokens};
pub use listener::{EventListener, Incoming};
