#![allow(dead_code)]

use dependent_startup::config::{RawStartupConfig, ServiceDeclaration, StartupConfig};
use dependent_startup::errors::Result;
use dependent_startup::registry::ServiceGraph;

/// Builder for `ServiceDeclaration`.
///
/// `new` gives a managed program (`dependent_startup = true`,
/// `autostart = false`); `unmanaged` a plain supervisord program.
pub struct ServiceDeclarationBuilder {
    decl: ServiceDeclaration,
}

impl ServiceDeclarationBuilder {
    pub fn new(name: &str) -> Self {
        let mut decl = ServiceDeclaration::new(name);
        decl.dependent_startup = true;
        decl.autostart = Some(false);
        Self { decl }
    }

    pub fn unmanaged(name: &str) -> Self {
        Self {
            decl: ServiceDeclaration::new(name),
        }
    }

    /// Add one `dependent_startup_wait_for` token, e.g. `"consul:running"`.
    pub fn wait_for(mut self, token: &str) -> Self {
        self.decl.wait_for.push(token.to_string());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.decl.priority = Some(priority);
        self
    }

    pub fn inherit_priority(mut self) -> Self {
        self.decl.inherit_priority = true;
        self
    }

    pub fn group(mut self, group: &str) -> Self {
        self.decl.group = group.to_string();
        self
    }

    /// `numprocs` with the usual `%(program_name)s_%(process_num)d` names.
    pub fn numprocs(mut self, n: u32) -> Self {
        self.decl.numprocs = n;
        self.decl.process_name = Some("%(program_name)s_%(process_num)d".to_string());
        self
    }

    pub fn numprocs_start(mut self, start: u32) -> Self {
        self.decl.numprocs_start = start;
        self
    }

    pub fn process_name(mut self, template: &str) -> Self {
        self.decl.process_name = Some(template.to_string());
        self
    }

    pub fn autostart(mut self, autostart: Option<bool>) -> Self {
        self.decl.autostart = autostart;
        self
    }

    pub fn build(self) -> ServiceDeclaration {
        self.decl
    }
}

/// Builder for a list of declarations (in declaration order).
#[derive(Default)]
pub struct DeclarationsBuilder {
    decls: Vec<ServiceDeclaration>,
}

impl DeclarationsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, decl: ServiceDeclarationBuilder) -> Self {
        self.decls.push(decl.build());
        self
    }

    pub fn declarations(self) -> Vec<ServiceDeclaration> {
        self.decls
    }

    pub fn try_build_graph(self) -> Result<ServiceGraph> {
        ServiceGraph::build(&self.decls)
    }

    pub fn build_graph(self) -> ServiceGraph {
        self.try_build_graph()
            .expect("Failed to build valid graph from builder")
    }

    pub fn build_config(self) -> StartupConfig {
        StartupConfig::try_from(RawStartupConfig {
            files: Vec::new(),
            declarations: self.decls,
        })
        .expect("Failed to build valid config from builder")
    }
}

/// The four-program chain used throughout the tests:
/// `ping`, `sleep` (after `ping` EXITED), `ping2` (after `sleep` RUNNING),
/// `ping3` (after `ping2` EXITED).
pub fn reference_topology() -> DeclarationsBuilder {
    DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::new("ping"))
        .with(ServiceDeclarationBuilder::new("sleep").wait_for("ping:exited"))
        .with(ServiceDeclarationBuilder::new("ping2").wait_for("sleep:running"))
        .with(ServiceDeclarationBuilder::new("ping3").wait_for("ping2:exited"))
}
