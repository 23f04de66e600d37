// src/evaluator/evaluator.rs

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info, trace, warn};

use crate::evaluator::step::{BlockedService, EvaluationStep, ReadyService};
use crate::group::{self, ProcessId};
use crate::registry::{Service, ServiceGraph, ServiceId};
use crate::types::ProcessState;

/// Readiness state machine.
///
/// Owns the [`ServiceGraph`] plus the last observed state of every tracked
/// process. Each call to [`on_event`](Self::on_event) is handled completely
/// (state update, blocking cascade, eligibility scan) before returning.
///
/// The evaluator never marks a service dispatched itself; that is the
/// dispatch coordinator's job. Eligible services keep being reported until
/// they are resolved, which is harmless because dispatch is one-shot.
#[derive(Debug)]
pub struct ReadinessEvaluator {
    graph: ServiceGraph,
    states: HashMap<ProcessId, ProcessState>,
}

impl ReadinessEvaluator {
    pub fn new(graph: ServiceGraph) -> Self {
        Self {
            graph,
            states: HashMap::new(),
        }
    }

    pub fn graph(&self) -> &ServiceGraph {
        &self.graph
    }

    pub fn service(&self, id: ServiceId) -> Option<&Service> {
        self.graph.service(id)
    }

    /// Mutable handle for the dispatch coordinator.
    pub fn service_mut(&mut self, id: ServiceId) -> Option<&mut Service> {
        self.graph.service_mut(id)
    }

    /// Last observed state of a process.
    pub fn process_state(&self, process: &ProcessId) -> Option<ProcessState> {
        self.states.get(process).copied()
    }

    /// Aggregate state of a service over its members.
    pub fn aggregate_of(&self, id: ServiceId) -> Option<ProcessState> {
        let service = self.graph.service(id)?;
        group::aggregate_state(service.members().iter().map(|m| self.process_state(m)))
    }

    /// Whether every managed service is dispatched or blocked.
    pub fn is_complete(&self) -> bool {
        self.graph.managed().all(|s| !s.is_pending())
    }

    /// Managed services still waiting.
    pub fn pending(&self) -> impl Iterator<Item = &Service> {
        self.graph.services().filter(|s| s.is_pending())
    }

    /// Services eligible before any event arrives (those without
    /// dependencies, or whose edges are otherwise satisfied).
    pub fn initial_step(&mut self) -> EvaluationStep {
        let eligible = self.collect_eligible();
        debug!(
            eligible = ?eligible.iter().map(|r| &r.name).collect::<Vec<_>>(),
            "initial eligible services"
        );
        EvaluationStep {
            eligible,
            newly_blocked: Vec::new(),
            run_complete: self.is_complete(),
        }
    }

    /// Handle one state change of one process.
    ///
    /// `from` is only used for logging; readiness is recomputed from the
    /// current state of every member.
    pub fn on_event(
        &mut self,
        process: &ProcessId,
        from: Option<ProcessState>,
        to: ProcessState,
    ) -> EvaluationStep {
        let Some(owner) = self.graph.owner_of(process) else {
            trace!(process = %process, state = %to, "state change of untracked process; ignoring");
            return self.empty_step();
        };

        let previous = self.states.insert(process.clone(), to);
        debug!(
            process = %process,
            from = ?from.or(previous),
            state = %to,
            "process state changed"
        );

        if self.is_complete() {
            trace!(process = %process, "all services resolved; event only recorded");
            return self.empty_step();
        }

        let aggregate = self.aggregate_of(owner);
        let newly_blocked = match aggregate {
            Some(ProcessState::Fatal) => self.block_dependents_of(owner),
            _ => Vec::new(),
        };

        let eligible = self.collect_eligible();
        let run_complete = self.is_complete();

        if run_complete {
            info!("every dependent service is dispatched or blocked");
        }

        EvaluationStep {
            eligible,
            newly_blocked,
            run_complete,
        }
    }

    fn empty_step(&self) -> EvaluationStep {
        EvaluationStep {
            run_complete: self.is_complete(),
            ..EvaluationStep::default()
        }
    }

    /// Block every pending dependent of a FATAL service whose edge does not
    /// accept FATAL, then everything pending below them.
    fn block_dependents_of(&mut self, fatal: ServiceId) -> Vec<BlockedService> {
        let fatal_name = self.graph.service(fatal).map(|s| s.name().to_string());
        let Some(fatal_name) = fatal_name else {
            return Vec::new();
        };

        let mut queue: VecDeque<(ServiceId, String)> = VecDeque::new();
        for &dep in self.graph.dependents_of(fatal) {
            let accepts_fatal = self.graph.service(dep).is_some_and(|s| {
                s.edges()
                    .iter()
                    .any(|e| e.parent_id == fatal && e.allows(ProcessState::Fatal))
            });
            if !accepts_fatal {
                queue.push_back((dep, fatal_name.clone()));
            }
        }

        let mut blocked = Vec::new();
        while let Some((id, cause)) = queue.pop_front() {
            let Some(service) = self.graph.service_mut(id) else {
                continue;
            };
            if !service.mark_blocked() {
                continue;
            }

            let name = service.name().to_string();
            warn!(
                service = %name,
                parent = %cause,
                "dependency can no longer be satisfied; service will not be started"
            );

            for &dep in self.graph.dependents_of(id) {
                queue.push_back((dep, name.clone()));
            }
            blocked.push(BlockedService { id, name, cause });
        }

        blocked
    }

    /// Pending services whose edges are all satisfied, ordered by effective
    /// priority and then declaration order.
    fn collect_eligible(&self) -> Vec<ReadyService> {
        let mut ready: Vec<ReadyService> = self
            .pending()
            .filter(|s| {
                s.edges()
                    .iter()
                    .all(|e| e.is_satisfied_by(self.aggregate_of(e.parent_id)))
            })
            .map(|s| ReadyService {
                id: s.id(),
                name: s.name().to_string(),
                target: s.start_target().clone(),
                priority: s.effective_priority(),
            })
            .collect();

        ready.sort_by_key(|r| (r.priority, r.id));
        ready
    }
}
