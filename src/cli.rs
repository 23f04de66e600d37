// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::types::ErrorAction;

/// Command-line arguments for `supervisord-dependent-startup`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "supervisord-dependent-startup",
    version,
    about = "supervisord event listener that starts programs once their dependencies are up.",
    long_about = None
)]
pub struct CliArgs {
    /// Full path to the supervisord config file.
    ///
    /// If omitted, the file is searched for like supervisord does.
    #[arg(short = 'c', long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// File name looked for when searching for the config.
    #[arg(long, value_name = "NAME", default_value = "supervisord.conf")]
    pub config_filename: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `DEPENDENT_STARTUP_LOG` or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Log to this file instead of stderr.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// What to do about invalid dependent-startup settings.
    #[arg(long, value_enum, value_name = "ACTION", default_value_t = ErrorAction::Exit)]
    pub error_action: ErrorAction,

    /// Treat every config warning as an error (same as `--error-action exit`).
    #[arg(long, hide = true)]
    pub fail_on_warning: bool,

    /// supervisord XML-RPC endpoint, e.g. `unix:///var/run/supervisor.sock`.
    ///
    /// Defaults to `SUPERVISOR_SERVER_URL`, which supervisord sets for its
    /// event listeners.
    #[arg(long, value_name = "URL")]
    pub server_url: Option<String>,

    /// Extra attempts for a failed start call.
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub start_retries: u32,

    /// Keep acknowledging events after every service is resolved instead of
    /// exiting.
    #[arg(long)]
    pub keep_listening: bool,

    /// Parse and validate the config, print the startup plan, and exit
    /// without connecting to supervisord.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// The error action after `--fail-on-warning` is applied.
    pub fn effective_error_action(&self) -> ErrorAction {
        if self.fail_on_warning {
            ErrorAction::Exit
        } else {
            self.error_action
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
