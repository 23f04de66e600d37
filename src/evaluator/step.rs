// src/evaluator/step.rs

//! Result type of one evaluator step.

use crate::group::StartTarget;
use crate::registry::ServiceId;

/// A service whose dependencies are all satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyService {
    pub id: ServiceId,
    pub name: String,
    pub target: StartTarget,
    /// Effective priority the batch was ordered by.
    pub priority: i64,
}

/// A service that was marked blocked in this step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedService {
    pub id: ServiceId,
    pub name: String,
    /// The parent that made it unsatisfiable (FATAL, or itself blocked).
    pub cause: String,
}

/// Structured result of handling one event (or the initial flush).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationStep {
    /// Services to hand to the dispatch coordinator, in dispatch order.
    pub eligible: Vec<ReadyService>,
    /// Services newly marked blocked in this step.
    pub newly_blocked: Vec<BlockedService>,
    /// Whether every managed service is resolved after this step.
    pub run_complete: bool,
}

impl EvaluationStep {
    pub fn eligible_names(&self) -> Vec<&str> {
        self.eligible.iter().map(|r| r.name.as_str()).collect()
    }

    pub fn blocked_names(&self) -> Vec<&str> {
        self.newly_blocked.iter().map(|b| b.name.as_str()).collect()
    }
}
