// src/engine/mod.rs

//! Startup engine.
//!
//! The readiness logic is pure (see [`crate::evaluator`]); the async shell
//! that reads events and issues start calls is implemented in [`runtime`].

pub mod runtime;

pub use runtime::StartupRuntime;

/// Runtime options for the async shell.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// If true, stop listening as soon as every managed service is
    /// dispatched or blocked. If false, keep acknowledging events until the
    /// source closes (`--keep-listening`).
    pub exit_when_complete: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            exit_when_complete: true,
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunOutcome {
    /// Every managed service was dispatched or blocked.
    #[default]
    Completed,
    /// The event source closed while services were still pending.
    SourceClosed,
}

impl RunOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::SourceClosed => 1,
        }
    }
}

/// What happened to each managed service during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    /// In declaration order.
    pub dispatched: Vec<String>,
    pub blocked: Vec<String>,
    /// Still pending when the run ended.
    pub unresolved: Vec<String>,
    /// Dispatched, but the start call failed.
    pub failed: Vec<String>,
}
