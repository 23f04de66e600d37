// src/dispatch/mod.rs

//! One-shot dispatch of eligible services.
//!
//! - [`coordinator`] enforces at-most-once dispatch and optional retries.
//! - [`starter`] provides the `ProcessStarter` trait the coordinator calls.

pub mod coordinator;
pub mod starter;

pub use coordinator::{DispatchCoordinator, DispatchOutcome};
pub use starter::ProcessStarter;
