// src/evaluator/mod.rs

//! Readiness evaluation driven by process state events.
//!
//! - [`evaluator`] holds the state machine.
//! - [`step`] defines the per-event result type.

#[allow(clippy::module_inception)]
pub mod evaluator;
pub mod step;

pub use evaluator::ReadinessEvaluator;
pub use step::{BlockedService, EvaluationStep, ReadyService};
