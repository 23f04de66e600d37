// src/registry/service.rs

//! Service nodes and dependency edges.

use std::collections::BTreeSet;
use std::fmt;

use crate::group::{ProcessId, StartTarget};
use crate::types::ProcessState;

/// Index of a service in its [`ServiceGraph`](crate::registry::ServiceGraph),
/// equal to its declaration order.
pub type ServiceId = usize;

/// "Wait until `parent` is in one of `allowed`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    pub parent: String,
    pub parent_id: ServiceId,
    /// Never empty.
    pub allowed: BTreeSet<ProcessState>,
}

impl DependencyEdge {
    /// Whether the parent's aggregate state satisfies this edge.
    pub fn is_satisfied_by(&self, aggregate: Option<ProcessState>) -> bool {
        aggregate.is_some_and(|s| self.allowed.contains(&s))
    }

    pub fn allows(&self, state: ProcessState) -> bool {
        self.allowed.contains(&state)
    }
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let states: Vec<&str> = self.allowed.iter().map(|s| s.as_str()).collect();
        write!(f, "{}:{}", self.parent, states.join(","))
    }
}

/// Terminal marker of a managed service for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    /// Not started yet, still waiting on its parents.
    #[default]
    Pending,
    /// The start call has been issued (whether or not it succeeded).
    Dispatched,
    /// A parent can never reach an allowed state.
    Blocked,
}

impl Resolution {
    pub fn is_resolved(self) -> bool {
        !matches!(self, Resolution::Pending)
    }
}

/// A program known to the listener.
///
/// Services with `managed == false` are not started by the listener but are
/// tracked so others can wait on them.
#[derive(Debug, Clone)]
pub struct Service {
    pub(crate) id: ServiceId,
    pub(crate) name: String,
    pub(crate) group: String,
    pub(crate) members: Vec<ProcessId>,
    pub(crate) edges: Vec<DependencyEdge>,
    pub(crate) priority: i64,
    pub(crate) effective_priority: i64,
    pub(crate) inherit_priority: bool,
    pub(crate) managed: bool,
    pub(crate) start_target: StartTarget,
    pub(crate) resolution: Resolution,
}

impl Service {
    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn members(&self) -> &[ProcessId] {
        &self.members
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Declared (or default) priority.
    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// Priority used to order services that become eligible together.
    pub fn effective_priority(&self) -> i64 {
        self.effective_priority
    }

    pub fn inherits_priority(&self) -> bool {
        self.inherit_priority
    }

    /// Whether the listener starts this service (`dependent_startup = true`).
    pub fn is_managed(&self) -> bool {
        self.managed
    }

    pub fn start_target(&self) -> &StartTarget {
        &self.start_target
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_dispatched(&self) -> bool {
        self.resolution == Resolution::Dispatched
    }

    pub fn is_blocked(&self) -> bool {
        self.resolution == Resolution::Blocked
    }

    /// Managed and neither dispatched nor blocked.
    pub fn is_pending(&self) -> bool {
        self.managed && self.resolution == Resolution::Pending
    }

    /// Set `Dispatched`. Returns `false` (and changes nothing) if the service
    /// was already resolved.
    pub(crate) fn mark_dispatched(&mut self) -> bool {
        self.resolve(Resolution::Dispatched)
    }

    /// Set `Blocked`. Returns `false` (and changes nothing) if the service was
    /// already resolved.
    pub(crate) fn mark_blocked(&mut self) -> bool {
        self.resolve(Resolution::Blocked)
    }

    fn resolve(&mut self, to: Resolution) -> bool {
        if !self.managed || self.resolution.is_resolved() {
            return false;
        }
        self.resolution = to;
        true
    }
}
