// src/config/mod.rs

//! Configuration loading and validation.
//!
//! Responsibilities:
//! - Read supervisord INI files, following `[include]` (`ini.rs`, `loader.rs`).
//! - Expand `%(name)s` references (`expand.rs`).
//! - Define the program declaration model (`model.rs`).
//! - Apply the error-action policy and build the graph (`validate.rs`).

pub mod expand;
pub mod ini;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, resolve_config_path};
pub use model::{
    DEFAULT_PRIORITY, RawStartupConfig, ServiceDeclaration, StartupConfig, WaitForToken,
};
pub use validate::apply_error_action;
