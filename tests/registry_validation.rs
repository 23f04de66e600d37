// tests/registry_validation.rs

use std::collections::BTreeSet;

use dependent_startup::errors::StartupError;
use dependent_startup::types::ProcessState;
use dependent_startup_test_utils::builders::{DeclarationsBuilder, ServiceDeclarationBuilder};

fn config_error(builder: DeclarationsBuilder) -> String {
    match builder.try_build_graph() {
        Err(StartupError::Config(msg)) => msg,
        Err(e) => panic!("Expected Config error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_parent_is_rejected() {
    let msg = config_error(
        DeclarationsBuilder::new()
            .with(ServiceDeclarationBuilder::new("slurmd").wait_for("consul:running")),
    );
    assert!(msg.contains("slurmd"));
    assert!(msg.contains("unknown program 'consul'"));
}

#[test]
fn self_dependency_is_rejected() {
    let msg = config_error(
        DeclarationsBuilder::new().with(ServiceDeclarationBuilder::new("a").wait_for("a:running")),
    );
    assert!(msg.contains("cannot wait for itself"));
}

#[test]
fn empty_state_list_is_rejected() {
    let msg = config_error(
        DeclarationsBuilder::new()
            .with(ServiceDeclarationBuilder::new("a"))
            .with(ServiceDeclarationBuilder::new("b").wait_for("a:")),
    );
    assert!(msg.contains("empty state list"));
}

#[test]
fn invalid_and_unwaitable_states_are_rejected() {
    for token in ["a:bogus", "a:stopped", "a:unknown", "a:running,nope"] {
        let msg = config_error(
            DeclarationsBuilder::new()
                .with(ServiceDeclarationBuilder::new("a"))
                .with(ServiceDeclarationBuilder::new("b").wait_for(token)),
        );
        assert!(msg.contains(token), "message for {token}: {msg}");
    }
}

#[test]
fn missing_parent_name_is_rejected() {
    let msg = config_error(
        DeclarationsBuilder::new().with(ServiceDeclarationBuilder::new("b").wait_for(":running")),
    );
    assert!(msg.contains("missing program name"));
}

#[test]
fn cycle_is_rejected_with_dependency_cycle_error() {
    let result = DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::new("a").wait_for("c"))
        .with(ServiceDeclarationBuilder::new("b").wait_for("a"))
        .with(ServiceDeclarationBuilder::new("c").wait_for("b"))
        .try_build_graph();

    match result {
        Err(StartupError::DependencyCycle(msg)) => {
            assert!(msg.contains("cycle"));
            assert!(msg.contains('a') || msg.contains('b') || msg.contains('c'));
        }
        Err(e) => panic!("Expected DependencyCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn duplicate_program_is_rejected() {
    let msg = config_error(
        DeclarationsBuilder::new()
            .with(ServiceDeclarationBuilder::new("a"))
            .with(ServiceDeclarationBuilder::unmanaged("a")),
    );
    assert!(msg.contains("more than once"));
}

#[test]
fn multi_process_program_in_shared_group_is_rejected() {
    let msg = config_error(
        DeclarationsBuilder::new()
            .with(ServiceDeclarationBuilder::new("workers").group("app").numprocs(2))
            .with(ServiceDeclarationBuilder::unmanaged("web").group("app")),
    );
    assert!(msg.contains("shares group 'app'"));
}

#[test]
fn clashing_process_names_are_rejected() {
    let msg = config_error(
        DeclarationsBuilder::new()
            .with(ServiceDeclarationBuilder::unmanaged("a").group("g").process_name("x"))
            .with(ServiceDeclarationBuilder::unmanaged("b").group("g").process_name("x")),
    );
    assert!(msg.contains("clashes"));
}

#[test]
fn token_without_states_means_running() {
    let graph = DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::new("a"))
        .with(ServiceDeclarationBuilder::new("b").wait_for("a"))
        .build_graph();

    let edge = &graph.service_by_name("b").unwrap().edges()[0];
    assert_eq!(edge.parent, "a");
    assert_eq!(edge.allowed, BTreeSet::from([ProcessState::Running]));
}

#[test]
fn states_are_case_insensitive() {
    let graph = DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::new("a"))
        .with(ServiceDeclarationBuilder::new("b").wait_for("a:Running,STARTING,backoff"))
        .build_graph();

    let edge = &graph.service_by_name("b").unwrap().edges()[0];
    assert_eq!(
        edge.allowed,
        BTreeSet::from([
            ProcessState::Starting,
            ProcessState::Running,
            ProcessState::Backoff
        ])
    );
}

#[test]
fn repeated_parent_last_token_wins() {
    let graph = DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::new("a"))
        .with(
            ServiceDeclarationBuilder::new("b")
                .wait_for("a:running")
                .wait_for("a:exited"),
        )
        .build_graph();

    let edges = graph.service_by_name("b").unwrap().edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].allowed, BTreeSet::from([ProcessState::Exited]));
}

#[test]
fn unmanaged_wait_for_is_ignored() {
    let graph = DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::unmanaged("a").wait_for("nonexistent:running"))
        .build_graph();

    let a = graph.service_by_name("a").unwrap();
    assert!(!a.is_managed());
    assert!(a.edges().is_empty());
}

#[test]
fn dependents_and_processes_are_indexed() {
    let graph = DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::unmanaged("db"))
        .with(ServiceDeclarationBuilder::new("api").wait_for("db"))
        .with(ServiceDeclarationBuilder::new("worker").numprocs(2).wait_for("db"))
        .build_graph();

    let db = graph.id_of("db").unwrap();
    let names: Vec<&str> = graph
        .dependents_of(db)
        .iter()
        .map(|&id| graph.service(id).unwrap().name())
        .collect();
    assert_eq!(names, vec!["api", "worker"]);

    let worker_1 = dependent_startup::group::ProcessId::new("worker", "worker_1");
    assert_eq!(graph.owner_of(&worker_1), graph.id_of("worker"));
    assert_eq!(graph.managed().count(), 2);
}
