// src/registry/graph.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::{ServiceDeclaration, WaitForToken};
use crate::errors::{Result, StartupError};
use crate::group::{self, ProcessId};
use crate::registry::service::{DependencyEdge, Resolution, Service, ServiceId};
use crate::types::ProcessState;

/// The dependency graph over all declared programs.
///
/// Built once from the declarations; afterwards only the per-service
/// [`Resolution`] changes.
#[derive(Debug, Clone)]
pub struct ServiceGraph {
    /// Indexed by [`ServiceId`] (declaration order).
    services: Vec<Service>,
    by_name: HashMap<String, ServiceId>,
    by_process: HashMap<ProcessId, ServiceId>,
    /// Direct dependents of each service.
    dependents: Vec<Vec<ServiceId>>,
    /// A topological order: parents before dependents.
    topo_order: Vec<ServiceId>,
}

impl ServiceGraph {
    /// Build and validate the graph.
    ///
    /// Fails with [`StartupError::Config`] for duplicate programs, unknown or
    /// empty parents, self-dependencies, empty or invalid state sets and
    /// member-name clashes, and with [`StartupError::DependencyCycle`] when
    /// the dependencies form a cycle.
    ///
    /// Only services with `dependent_startup = true` get edges; the
    /// `dependent_startup_wait_for` of any other program is ignored.
    pub fn build(decls: &[ServiceDeclaration]) -> Result<Self> {
        let by_name = index_names(decls)?;

        let mut services = Vec::with_capacity(decls.len());
        for (id, decl) in decls.iter().enumerate() {
            let members = group::expand_members(decl)?;
            check_group_startable(decl, &members, decls)?;

            let edges = if decl.dependent_startup {
                parse_edges(decl, &by_name)?
            } else {
                if !decl.wait_for.is_empty() {
                    debug!(
                        service = %decl.name,
                        "dependent_startup is off; ignoring dependent_startup_wait_for"
                    );
                }
                Vec::new()
            };

            services.push(Service {
                id,
                name: decl.name.clone(),
                group: decl.group.clone(),
                start_target: group::start_target(decl, &members),
                members,
                edges,
                priority: decl.priority_or_default(),
                effective_priority: decl.priority_or_default(),
                inherit_priority: decl.inherit_priority,
                managed: decl.dependent_startup,
                resolution: Resolution::Pending,
            });
        }

        let by_process = index_processes(&services)?;
        let topo_order = topological_order(&services)?;

        let mut dependents = vec![Vec::new(); services.len()];
        for service in &services {
            for edge in &service.edges {
                dependents[edge.parent_id].push(service.id);
            }
        }

        let mut graph = Self {
            services,
            by_name,
            by_process,
            dependents,
            topo_order,
        };
        graph.resolve_priorities();
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// All services in declaration order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.iter()
    }

    /// Services the listener starts.
    pub fn managed(&self) -> impl Iterator<Item = &Service> {
        self.services.iter().filter(|s| s.managed)
    }

    pub fn service(&self, id: ServiceId) -> Option<&Service> {
        self.services.get(id)
    }

    pub(crate) fn service_mut(&mut self, id: ServiceId) -> Option<&mut Service> {
        self.services.get_mut(id)
    }

    pub fn id_of(&self, name: &str) -> Option<ServiceId> {
        self.by_name.get(name).copied()
    }

    pub fn service_by_name(&self, name: &str) -> Option<&Service> {
        self.id_of(name).and_then(|id| self.service(id))
    }

    /// The service a process belongs to, if it is tracked at all.
    pub fn owner_of(&self, process: &ProcessId) -> Option<ServiceId> {
        self.by_process.get(process).copied()
    }

    /// Services with an edge on `id`.
    pub fn dependents_of(&self, id: ServiceId) -> &[ServiceId] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The graph in dependency levels.
    ///
    /// Level 0 holds services without dependencies; every other service sits
    /// one level below its deepest parent. Each level is sorted by effective
    /// priority, then declaration order, like the live dispatch order.
    pub fn startup_order(&self) -> Vec<Vec<ServiceId>> {
        let mut level = vec![0usize; self.services.len()];
        for &id in &self.topo_order {
            level[id] = self.services[id]
                .edges
                .iter()
                .map(|e| level[e.parent_id] + 1)
                .max()
                .unwrap_or(0);
        }

        let depth = level.iter().copied().max().map_or(0, |m| m + 1);
        let mut levels: Vec<Vec<ServiceId>> = vec![Vec::new(); depth];
        for (id, &l) in level.iter().enumerate() {
            levels[l].push(id);
        }
        for ids in &mut levels {
            ids.sort_by_key(|&id| (self.services[id].effective_priority, id));
        }
        levels
    }

    /// Walk the topological order so each parent's effective priority is
    /// known before its dependents inherit it.
    fn resolve_priorities(&mut self) {
        for idx in 0..self.topo_order.len() {
            let id = self.topo_order[idx];
            let service = &self.services[id];
            if !service.inherit_priority || service.edges.is_empty() {
                continue;
            }

            let inherited = service
                .edges
                .iter()
                .map(|e| self.services[e.parent_id].effective_priority)
                .min()
                .unwrap_or(service.priority);

            debug!(
                service = %service.name,
                own = service.priority,
                inherited,
                "inheriting priority from parents"
            );
            self.services[id].effective_priority = inherited;
        }
    }
}

fn index_names(decls: &[ServiceDeclaration]) -> Result<HashMap<String, ServiceId>> {
    let mut by_name = HashMap::with_capacity(decls.len());
    for (id, decl) in decls.iter().enumerate() {
        if by_name.insert(decl.name.clone(), id).is_some() {
            return Err(StartupError::config(format!(
                "program '{}' is declared more than once",
                decl.name
            )));
        }
    }
    Ok(by_name)
}

fn index_processes(services: &[Service]) -> Result<HashMap<ProcessId, ServiceId>> {
    let mut by_process = HashMap::new();
    for service in services {
        for member in &service.members {
            if let Some(other) = by_process.insert(member.clone(), service.id) {
                return Err(StartupError::config(format!(
                    "process '{}' of program '{}' clashes with program '{}'",
                    member, service.name, services[other].name
                )));
            }
        }
    }
    Ok(by_process)
}

/// A multi-process program inside a `[group:]` shared with other programs
/// would need `startProcessGroup`, which would start its siblings too.
fn check_group_startable(
    decl: &ServiceDeclaration,
    members: &[ProcessId],
    decls: &[ServiceDeclaration],
) -> Result<()> {
    if !decl.dependent_startup || members.len() < 2 {
        return Ok(());
    }
    if let Some(sibling) = decls
        .iter()
        .find(|d| d.name != decl.name && d.group == decl.group)
    {
        return Err(StartupError::config(format!(
            "program '{}' has {} processes and shares group '{}' with program '{}'; \
             it cannot be started without its siblings",
            decl.name,
            members.len(),
            decl.group,
            sibling.name
        )));
    }
    Ok(())
}

fn parse_edges(
    decl: &ServiceDeclaration,
    by_name: &HashMap<String, ServiceId>,
) -> Result<Vec<DependencyEdge>> {
    let mut edges: Vec<DependencyEdge> = Vec::new();

    for raw in &decl.wait_for {
        let token = WaitForToken::parse(raw);
        let err = |msg: String| {
            StartupError::config(format!(
                "program '{}': dependent_startup_wait_for '{}': {}",
                decl.name, raw, msg
            ))
        };

        if token.parent.is_empty() {
            return Err(err("missing program name".to_string()));
        }
        if token.parent == decl.name {
            return Err(err("a program cannot wait for itself".to_string()));
        }
        let parent_id = *by_name
            .get(&token.parent)
            .ok_or_else(|| err(format!("unknown program '{}'", token.parent)))?;

        let allowed = match &token.states {
            None => BTreeSet::from([ProcessState::Running]),
            Some(states) => parse_states(states).map_err(err)?,
        };

        let edge = DependencyEdge {
            parent: token.parent,
            parent_id,
            allowed,
        };
        // Last mention of a parent wins.
        match edges.iter_mut().find(|e| e.parent_id == parent_id) {
            Some(existing) => *existing = edge,
            None => edges.push(edge),
        }
    }

    Ok(edges)
}

fn parse_states(states: &[String]) -> std::result::Result<BTreeSet<ProcessState>, String> {
    if states.is_empty() {
        return Err("empty state list".to_string());
    }

    states
        .iter()
        .map(|s| {
            let state: ProcessState = s.parse()?;
            if state.is_valid_wait_state() {
                Ok(state)
            } else {
                Err(format!("cannot wait for state {state}"))
            }
        })
        .collect()
}

fn topological_order(services: &[Service]) -> Result<Vec<ServiceId>> {
    // Edge direction: parent -> dependent.
    let mut graph: DiGraphMap<ServiceId, ()> = DiGraphMap::new();
    for service in services {
        graph.add_node(service.id);
    }
    for service in services {
        for edge in &service.edges {
            graph.add_edge(edge.parent_id, service.id, ());
        }
    }

    toposort(&graph, None).map_err(|cycle| {
        let node = cycle.node_id();
        StartupError::DependencyCycle(format!(
            "dependent_startup_wait_for of program '{}' is part of a cycle",
            services[node].name
        ))
    })
}
