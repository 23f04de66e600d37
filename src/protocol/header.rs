// src/protocol/header.rs

//! Event header and payload parsing.
//!
//! A supervisord event looks like this on the listener's stdin:
//!
//! ```text
//! ver:3.0 server:supervisor serial:21 pool:listener poolserial:10 eventname:PROCESS_STATE_RUNNING len:54
//! processname:cat groupname:cat from_state:STARTING pid:2766
//! ```
//!
//! The first line is the header; `len` bytes of payload follow it.

use std::collections::BTreeMap;

use crate::errors::{Result, StartupError};
use crate::group::ProcessId;
use crate::types::ProcessState;

const PROCESS_STATE_PREFIX: &str = "PROCESS_STATE_";

/// Upper bound for `len`. supervisord payloads are a few hundred bytes.
pub const MAX_PAYLOAD_LEN: usize = 1024 * 1024;

/// Split a line of space-separated `key:value` tokens.
///
/// Tokens without a `:` are ignored.
pub fn parse_tokens(line: &str) -> BTreeMap<String, String> {
    line.split_whitespace()
        .filter_map(|tok| tok.split_once(':'))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The header line of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventHeader {
    pub eventname: String,
    /// Payload length in bytes.
    pub len: usize,
    /// Every token, including `eventname` and `len`.
    pub fields: BTreeMap<String, String>,
}

impl EventHeader {
    pub fn parse(line: &str) -> Result<Self> {
        let fields = parse_tokens(line.trim());

        let eventname = fields
            .get("eventname")
            .cloned()
            .ok_or_else(|| StartupError::protocol(format!("header without eventname: '{}'", line.trim())))?;

        let len = fields
            .get("len")
            .ok_or_else(|| StartupError::protocol(format!("header without len: '{}'", line.trim())))?
            .parse::<usize>()
            .map_err(|e| StartupError::protocol(format!("invalid len in header: {e}")))?;
        if len > MAX_PAYLOAD_LEN {
            return Err(StartupError::protocol(format!(
                "payload length {len} exceeds {MAX_PAYLOAD_LEN} bytes"
            )));
        }

        Ok(Self {
            eventname,
            len,
            fields,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// A process state transition reported by supervisord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub process: ProcessId,
    pub from: Option<ProcessState>,
    pub to: ProcessState,
}

/// An event as far as the listener cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    ProcessState(StateChange),
    /// Anything else (TICK_*, SUPERVISOR_STATE_CHANGE_*, ...): acknowledged
    /// and ignored.
    Other { eventname: String },
}

impl ListenerEvent {
    /// Interpret a header plus its payload.
    pub fn from_parts(header: &EventHeader, payload: &str) -> Result<Self> {
        let Some(state) = header.eventname.strip_prefix(PROCESS_STATE_PREFIX) else {
            return Ok(ListenerEvent::Other {
                eventname: header.eventname.clone(),
            });
        };

        let to: ProcessState = state.parse().map_err(StartupError::Protocol)?;

        let first_line = payload.lines().next().unwrap_or_default();
        let fields = parse_tokens(first_line);

        let name = fields.get("processname").ok_or_else(|| {
            StartupError::protocol(format!(
                "{} payload without processname: '{first_line}'",
                header.eventname
            ))
        })?;
        let group = fields.get("groupname").unwrap_or(name);

        let from = match fields.get("from_state") {
            Some(s) => Some(s.parse::<ProcessState>().map_err(StartupError::Protocol)?),
            None => None,
        };

        Ok(ListenerEvent::ProcessState(StateChange {
            process: ProcessId::new(group, name),
            from,
            to,
        }))
    }
}
