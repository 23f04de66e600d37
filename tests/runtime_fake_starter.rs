// tests/runtime_fake_starter.rs

use std::error::Error;

use tokio::io::sink;

use dependent_startup::dispatch::DispatchCoordinator;
use dependent_startup::engine::{RunOutcome, RuntimeOptions, StartupRuntime};
use dependent_startup::evaluator::ReadinessEvaluator;
use dependent_startup::group::StartTarget;
use dependent_startup::protocol::EventListener;
use dependent_startup::registry::ServiceGraph;
use dependent_startup_test_utils::builders::{
    DeclarationsBuilder, ServiceDeclarationBuilder, reference_topology,
};
use dependent_startup_test_utils::events::EventScript;
use dependent_startup_test_utils::fake_starter::{FakeStarter, started_names};
use dependent_startup_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn runtime(
    graph: ServiceGraph,
    starter: FakeStarter,
    script: EventScript,
    options: RuntimeOptions,
) -> StartupRuntime<FakeStarter, std::io::Cursor<Vec<u8>>, tokio::io::Sink> {
    StartupRuntime::new(
        ReadinessEvaluator::new(graph),
        DispatchCoordinator::new(starter),
        EventListener::new(script.into_reader(), sink()),
        options,
    )
}

#[tokio::test]
async fn runtime_runs_reference_topology_to_completion() -> TestResult {
    init_tracing();

    let starter = FakeStarter::new();
    let log = starter.log();
    let script = EventScript::new()
        .state("ping", "running")
        .state("ping", "exited")
        .state("sleep", "running")
        .state("ping2", "running")
        .state("ping2", "exited")
        // Never read: the run is complete after the previous event.
        .state("sleep", "running");

    let summary = with_timeout(
        runtime(
            reference_topology().build_graph(),
            starter,
            script,
            RuntimeOptions::default(),
        )
        .run(),
    )
    .await?;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.outcome.exit_code(), 0);
    assert_eq!(started_names(&log), vec!["ping", "sleep", "ping2", "ping3"]);
    assert_eq!(summary.dispatched, vec!["ping", "sleep", "ping2", "ping3"]);
    assert!(summary.blocked.is_empty());
    assert!(summary.unresolved.is_empty());
    Ok(())
}

#[tokio::test]
async fn runtime_reports_source_closed_with_pending_services() -> TestResult {
    init_tracing();

    let starter = FakeStarter::new();
    let log = starter.log();
    let script = EventScript::new().state("ping", "running");

    let summary = with_timeout(
        runtime(
            reference_topology().build_graph(),
            starter,
            script,
            RuntimeOptions::default(),
        )
        .run(),
    )
    .await?;

    assert_eq!(summary.outcome, RunOutcome::SourceClosed);
    assert_eq!(summary.outcome.exit_code(), 1);
    assert_eq!(started_names(&log), vec!["ping"]);
    assert_eq!(summary.unresolved, vec!["sleep", "ping2", "ping3"]);
    Ok(())
}

#[tokio::test]
async fn runtime_skips_malformed_and_foreign_events() -> TestResult {
    init_tracing();

    let starter = FakeStarter::new();
    let log = starter.log();
    let script = EventScript::new()
        .raw("this is not a header\n")
        .tick()
        .state("ping", "exited")
        .raw("ver:3.0 eventname:PROCESS_STATE_RUNNING len:abc\n")
        .state("sleep", "running")
        .state("ping2", "exited");

    let summary = with_timeout(
        runtime(
            reference_topology().build_graph(),
            starter,
            script,
            RuntimeOptions::default(),
        )
        .run(),
    )
    .await?;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(started_names(&log), vec!["ping", "sleep", "ping2", "ping3"]);
    Ok(())
}

#[tokio::test]
async fn runtime_exits_without_listening_when_nothing_is_managed() -> TestResult {
    init_tracing();

    let graph = DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::unmanaged("consul"))
        .build_graph();
    let starter = FakeStarter::new();
    let log = starter.log();

    let summary = with_timeout(
        runtime(graph, starter, EventScript::new(), RuntimeOptions::default()).run(),
    )
    .await?;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert!(started_names(&log).is_empty());
    Ok(())
}

#[tokio::test]
async fn keep_listening_consumes_events_until_source_closes() -> TestResult {
    init_tracing();

    let graph = DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::new("consul"))
        .with(ServiceDeclarationBuilder::new("slurmd").wait_for("consul:running"))
        .build_graph();
    let starter = FakeStarter::new();
    let log = starter.log();
    let script = EventScript::new()
        .state("consul", "running")
        .state("consul", "exited")
        .state("consul", "running")
        .state("slurmd", "running");

    let summary = with_timeout(
        runtime(
            graph,
            starter,
            script,
            RuntimeOptions {
                exit_when_complete: false,
            },
        )
        .run(),
    )
    .await?;

    // Closing after everything resolved still counts as completed.
    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(started_names(&log), vec!["consul", "slurmd"]);
    Ok(())
}

#[tokio::test]
async fn runtime_starts_group_with_one_call() -> TestResult {
    init_tracing();

    let graph = DeclarationsBuilder::new()
        .with(ServiceDeclarationBuilder::new("db"))
        .with(
            ServiceDeclarationBuilder::new("workers")
                .numprocs(2)
                .wait_for("db:running"),
        )
        .build_graph();
    let starter = FakeStarter::new();
    let log = starter.log();
    let script = EventScript::new().state("db", "running");

    let summary = with_timeout(
        runtime(graph, starter, script, RuntimeOptions::default()).run(),
    )
    .await?;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    let calls = log.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            StartTarget::Process("db".to_string()),
            StartTarget::Group("workers".to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn failed_start_keeps_service_dispatched() -> TestResult {
    init_tracing();

    let starter = FakeStarter::new().failing("sleep");
    let log = starter.log();
    let script = EventScript::new()
        .state("ping", "exited")
        .state("sleep", "fatal")
        .state("sleep", "running")
        .state("ping2", "exited");

    let summary = with_timeout(
        runtime(
            reference_topology().build_graph(),
            starter,
            script,
            RuntimeOptions::default(),
        )
        .run(),
    )
    .await?;

    // `sleep` failed to start, was not retried, and its FATAL blocked the
    // rest of the chain.
    assert_eq!(started_names(&log), vec!["ping", "sleep"]);
    assert_eq!(summary.failed, vec!["sleep"]);
    assert_eq!(summary.dispatched, vec!["ping", "sleep"]);
    assert_eq!(summary.blocked, vec!["ping2", "ping3"]);
    assert_eq!(summary.outcome, RunOutcome::Completed);
    Ok(())
}

#[tokio::test]
async fn runtime_survives_non_utf8_header() -> TestResult {
    init_tracing();

    let starter = FakeStarter::new();
    let log = starter.log();
    let script = EventScript::new()
        .raw_bytes(b"ver:3.0 \xff\xfe eventname:TICK_5 len:0\n")
        .state("ping", "exited")
        .state("sleep", "running")
        .state("ping2", "exited");

    let summary = with_timeout(
        runtime(
            reference_topology().build_graph(),
            starter,
            script,
            RuntimeOptions::default(),
        )
        .run(),
    )
    .await?;

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(started_names(&log), vec!["ping", "sleep", "ping2", "ping3"]);
    Ok(())
}

#[tokio::test]
async fn runtime_survives_oversized_len_header() -> TestResult {
    init_tracing();

    let starter = FakeStarter::new();
    let log = starter.log();
    let script = EventScript::new()
        .raw("ver:3.0 eventname:PROCESS_STATE_RUNNING len:18446744073709551615\n")
        .state("ping", "exited");

    let summary = with_timeout(
        runtime(
            reference_topology().build_graph(),
            starter,
            script,
            RuntimeOptions::default(),
        )
        .run(),
    )
    .await?;

    assert_eq!(summary.outcome, RunOutcome::SourceClosed);
    assert_eq!(started_names(&log), vec!["ping", "sleep"]);
    Ok(())
}
