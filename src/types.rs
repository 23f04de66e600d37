use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;

/// Process state as reported by supervisord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProcessState {
    Stopped,
    Starting,
    Running,
    Backoff,
    Stopping,
    Exited,
    Fatal,
    Unknown,
}

impl ProcessState {
    pub const ALL: [ProcessState; 8] = [
        ProcessState::Stopped,
        ProcessState::Starting,
        ProcessState::Running,
        ProcessState::Backoff,
        ProcessState::Stopping,
        ProcessState::Exited,
        ProcessState::Fatal,
        ProcessState::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Stopped => "STOPPED",
            ProcessState::Starting => "STARTING",
            ProcessState::Running => "RUNNING",
            ProcessState::Backoff => "BACKOFF",
            ProcessState::Stopping => "STOPPING",
            ProcessState::Exited => "EXITED",
            ProcessState::Fatal => "FATAL",
            ProcessState::Unknown => "UNKNOWN",
        }
    }

    /// States a dependency may wait on in `dependent_startup_wait_for`.
    ///
    /// STOPPED and UNKNOWN are excluded: every process starts out STOPPED,
    /// so waiting on it would be satisfied before anything happened.
    pub fn is_valid_wait_state(self) -> bool {
        !matches!(self, ProcessState::Stopped | ProcessState::Unknown)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        ProcessState::ALL
            .into_iter()
            .find(|state| state.as_str() == upper)
            .ok_or_else(|| format!("invalid process state: {s}"))
    }
}

/// What to do when a program section has a dependent-startup config error.
///
/// - `Exit`: fail the run with a configuration error (default).
/// - `Skip` / `Ignore`: log a warning and drop the offending setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ErrorAction {
    #[default]
    Exit,
    Skip,
    Ignore,
}

impl ErrorAction {
    pub fn is_lenient(self) -> bool {
        !matches!(self, ErrorAction::Exit)
    }
}

impl FromStr for ErrorAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exit" => Ok(ErrorAction::Exit),
            "skip" => Ok(ErrorAction::Skip),
            "ignore" => Ok(ErrorAction::Ignore),
            other => Err(format!(
                "invalid error action: {other} (expected \"exit\", \"skip\" or \"ignore\")"
            )),
        }
    }
}
