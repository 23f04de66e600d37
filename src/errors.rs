// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StartupError {
    /// Malformed declaration, unknown parent, bad state token, etc.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// A malformed event record from supervisord.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The start call for a service failed or was rejected.
    #[error("Failed to start '{target}': {source}")]
    Dispatch {
        target: String,
        #[source]
        source: Box<StartupError>,
    },

    /// XML-RPC fault returned by supervisord.
    #[error("<Fault {code}: '{message}'>")]
    Rpc { code: i64, message: String },

    #[error("RPC transport error: {0}")]
    Transport(String),

    #[error("Unable to find a config file")]
    ConfigNotFound,

    #[error("Config path {0:?} does not exist")]
    ConfigMissing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StartupError {
    pub fn config(msg: impl Into<String>) -> Self {
        StartupError::Config(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        StartupError::Protocol(msg.into())
    }

    /// Process exit status for this error.
    ///
    /// 2: the given config path does not exist, 4: no config file found by
    /// searching, 3: anything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::ConfigMissing(_) => 2,
            StartupError::ConfigNotFound => 4,
            _ => 3,
        }
    }

    /// Whether this error must abort the run before any event is handled.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StartupError::Config(_) | StartupError::DependencyCycle(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StartupError>;
