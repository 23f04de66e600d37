// src/group.rs

//! Process group expansion.
//!
//! A `[program:x]` section can stand for several supervisord processes
//! (`numprocs` > 1) and can live inside a `[group:g]`. This module turns a
//! declaration into the concrete process identifiers that show up in events,
//! picks the start call for the service, and folds member states into one
//! aggregate state.

use std::collections::HashSet;
use std::fmt;

use crate::config::expand::{self, Expansions};
use crate::config::model::ServiceDeclaration;
use crate::errors::{Result, StartupError};
use crate::types::ProcessState;

/// A supervisord process, identified the way events name it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId {
    pub group: String,
    pub name: String,
}

impl ProcessId {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// What to pass to supervisord to start a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StartTarget {
    /// `supervisor.startProcess(name)`; `name` is `program` or `group:process`.
    Process(String),
    /// `supervisor.startProcessGroup(group)`: every member in one call.
    Group(String),
}

impl StartTarget {
    pub fn name(&self) -> &str {
        match self {
            StartTarget::Process(name) | StartTarget::Group(name) => name,
        }
    }
}

impl fmt::Display for StartTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartTarget::Process(name) => f.write_str(name),
            StartTarget::Group(group) => write!(f, "{group}:*"),
        }
    }
}

/// Concrete member processes of a declaration.
///
/// Without `process_name` the program has a single process named after the
/// program. With a template, it is expanded once per `process_num` in
/// `numprocs_start .. numprocs_start + numprocs`.
pub fn expand_members(decl: &ServiceDeclaration) -> Result<Vec<ProcessId>> {
    if decl.numprocs == 0 {
        return Err(StartupError::config(format!(
            "program '{}': numprocs must be at least 1",
            decl.name
        )));
    }

    let Some(template) = decl.process_name.as_deref() else {
        if decl.numprocs > 1 {
            return Err(StartupError::config(format!(
                "program '{}': numprocs = {} requires a process_name containing %(process_num)",
                decl.name, decl.numprocs
            )));
        }
        return Ok(vec![ProcessId::new(&decl.group, &decl.name)]);
    };

    let mut vars = Expansions::new();
    vars.insert("program_name".to_string(), decl.name.clone());
    vars.insert("group_name".to_string(), decl.group.clone());
    vars.insert("numprocs".to_string(), decl.numprocs.to_string());

    let first = decl.numprocs_start;
    let end = first.checked_add(decl.numprocs).ok_or_else(|| {
        StartupError::config(format!(
            "program '{}': numprocs_start = {} plus numprocs = {} is out of range",
            decl.name, first, decl.numprocs
        ))
    })?;
    let mut seen = HashSet::new();
    let mut members = Vec::new();

    for process_num in first..end {
        vars.insert("process_num".to_string(), process_num.to_string());
        let name = expand::expand(template, &vars).map_err(|e| {
            StartupError::config(format!("program '{}': process_name: {e}", decl.name))
        })?;

        if !seen.insert(name.clone()) {
            return Err(StartupError::config(format!(
                "program '{}': process_name '{}' expands to duplicate name '{}'",
                decl.name, template, name
            )));
        }
        members.push(ProcessId::new(&decl.group, name));
    }

    Ok(members)
}

/// The start call for a service with the given members.
///
/// One member is started by name (`program`, or `group:process` when the
/// group or process name differs from the program name). Several members are
/// started with a single group-level call.
pub fn start_target(decl: &ServiceDeclaration, members: &[ProcessId]) -> StartTarget {
    match members {
        [single] if single.group == decl.name && single.name == decl.name => {
            StartTarget::Process(decl.name.clone())
        }
        [single] => StartTarget::Process(single.to_string()),
        _ => StartTarget::Group(decl.group.clone()),
    }
}

/// Fold member states into the state of the whole service.
///
/// - any member FATAL: FATAL (fail fast)
/// - every member observed in the same state S: S
/// - otherwise (mixed, not yet observed, or no members): `None`
pub fn aggregate_state<I>(states: I) -> Option<ProcessState>
where
    I: IntoIterator<Item = Option<ProcessState>>,
{
    let mut common: Option<ProcessState> = None;
    let mut uniform = true;
    let mut any = false;

    for state in states {
        any = true;
        match state {
            Some(ProcessState::Fatal) => return Some(ProcessState::Fatal),
            Some(s) => match common {
                None if uniform => common = Some(s),
                Some(c) if c != s => uniform = false,
                _ => {}
            },
            None => uniform = false,
        }
    }

    if any && uniform { common } else { None }
}
