// src/config/model.rs

use std::fmt;
use std::path::PathBuf;

use crate::registry::ServiceGraph;

/// supervisord's priority for programs that do not set one.
pub const DEFAULT_PRIORITY: i64 = 999;

/// One `[program:x]` section, reduced to the options dependent startup cares
/// about.
///
/// ```ini
/// [program:slurmd]
/// command = /usr/sbin/slurmd -D
/// autostart = false
/// priority = 10
/// dependent_startup = true
/// dependent_startup_wait_for = consul:running munge:running,starting
/// dependent_startup_inherit_priority = true
/// ```
///
/// Values are already `%(...)s`-expanded, except `process_name`, which keeps
/// `%(process_num)d` for the group expander.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDeclaration {
    /// Program name (the part after `program:`).
    pub name: String,

    /// Group from a `[group:g] programs = ...` section, or the program name.
    pub group: String,

    /// Number of process instances (`numprocs`, default 1).
    pub numprocs: u32,

    /// First `process_num` (`numprocs_start`, default 0).
    pub numprocs_start: u32,

    /// `process_name` template, if set.
    pub process_name: Option<String>,

    /// Raw `dependent_startup_wait_for` tokens, e.g. `["consul:running"]`.
    pub wait_for: Vec<String>,

    /// Explicit `priority`, if set.
    pub priority: Option<i64>,

    /// `dependent_startup_inherit_priority`.
    pub inherit_priority: bool,

    /// `dependent_startup`: whether this listener starts the program.
    pub dependent_startup: bool,

    /// `autostart`; `None` when not set explicitly (supervisord defaults to true).
    pub autostart: Option<bool>,
}

impl ServiceDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            group: name.clone(),
            name,
            numprocs: 1,
            numprocs_start: 0,
            process_name: None,
            wait_for: Vec::new(),
            priority: None,
            inherit_priority: false,
            dependent_startup: false,
            autostart: None,
        }
    }

    /// Effective `autostart` value.
    pub fn autostart(&self) -> bool {
        self.autostart.unwrap_or(true)
    }

    /// Priority used for ordering when none is inherited.
    pub fn priority_or_default(&self) -> i64 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// One `parent[:state[,state...]]` token from `dependent_startup_wait_for`.
///
/// This is purely syntactic; state names are validated by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitForToken {
    pub parent: String,
    /// `None` when the token has no `:states` part (meaning RUNNING).
    pub states: Option<Vec<String>>,
}

impl WaitForToken {
    pub fn parse(token: &str) -> Self {
        match token.split_once(':') {
            Some((parent, states)) => Self {
                parent: parent.trim().to_string(),
                states: Some(
                    states
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                ),
            },
            None => Self {
                parent: token.trim().to_string(),
                states: None,
            },
        }
    }

    /// Split a whole `dependent_startup_wait_for` value into tokens.
    pub fn split_all(value: &str) -> Vec<String> {
        value.split_whitespace().map(str::to_string).collect()
    }
}

impl fmt::Display for WaitForToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.states {
            Some(states) => write!(f, "{}:{}", self.parent, states.join(",")),
            None => f.write_str(&self.parent),
        }
    }
}

/// Declarations as read from disk, before semantic validation.
#[derive(Debug, Clone, Default)]
pub struct RawStartupConfig {
    /// Every config file that was read, main file first.
    pub files: Vec<PathBuf>,
    /// `[program:x]` sections in declaration order.
    pub declarations: Vec<ServiceDeclaration>,
}

/// A validated configuration: the declarations plus the dependency graph
/// built from them.
///
/// Constructed through `TryFrom<RawStartupConfig>` (see `validate.rs`), so
/// holding one means graph construction already succeeded.
#[derive(Debug, Clone)]
pub struct StartupConfig {
    files: Vec<PathBuf>,
    declarations: Vec<ServiceDeclaration>,
    graph: ServiceGraph,
}

impl StartupConfig {
    pub(crate) fn new_unchecked(
        files: Vec<PathBuf>,
        declarations: Vec<ServiceDeclaration>,
        graph: ServiceGraph,
    ) -> Self {
        Self {
            files,
            declarations,
            graph,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn declarations(&self) -> &[ServiceDeclaration] {
        &self.declarations
    }

    pub fn graph(&self) -> &ServiceGraph {
        &self.graph
    }

    pub fn into_graph(self) -> ServiceGraph {
        self.graph
    }
}
