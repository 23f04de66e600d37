// src/lib.rs

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod group;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod rpc;
pub mod types;

use tokio::io::BufReader;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::model::StartupConfig;
use crate::config::{load_and_validate, resolve_config_path};
use crate::dispatch::DispatchCoordinator;
use crate::engine::{RunSummary, RuntimeOptions, StartupRuntime};
use crate::errors::{Result, StartupError};
use crate::evaluator::ReadinessEvaluator;
use crate::protocol::EventListener;
use crate::registry::{Service, ServiceGraph};
use crate::rpc::{ServerUrl, SupervisorClient};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config discovery, loading and validation
/// - the supervisord XML-RPC client
/// - evaluator / coordinator / runtime
/// - the eventlistener protocol on stdin/stdout
pub async fn run(args: CliArgs) -> Result<RunSummary> {
    let config_path = resolve_config_path(args.config.as_deref(), &args.config_filename)?;
    let cfg = load_and_validate(&config_path, args.effective_error_action())?;
    log_services(cfg.graph());

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(RunSummary::default());
    }

    let url = match &args.server_url {
        Some(url) => url.parse::<ServerUrl>()?,
        None => ServerUrl::from_env()?,
    };
    let client = SupervisorClient::new(url);
    let api_version = client.api_version().await.map_err(|e| {
        StartupError::Transport(format!(
            "failed to connect to supervisord at {}: {e}",
            client.url()
        ))
    })?;
    info!(%api_version, url = %client.url(), "connected to supervisord");

    let evaluator = ReadinessEvaluator::new(cfg.into_graph());
    let coordinator = DispatchCoordinator::new(client).with_start_retries(args.start_retries);
    let listener = EventListener::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
    let options = RuntimeOptions {
        exit_when_complete: !args.keep_listening,
    };

    let summary = StartupRuntime::new(evaluator, coordinator, listener, options)
        .run()
        .await?;

    info!(
        outcome = ?summary.outcome,
        dispatched = summary.dispatched.len(),
        blocked = summary.blocked.len(),
        failed = summary.failed.len(),
        "dependent startup finished"
    );
    Ok(summary)
}

fn wait_for_list(service: &Service) -> String {
    service
        .edges()
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn priority_label(service: &Service) -> String {
    if service.effective_priority() != service.priority() {
        format!(
            "{} (inherited, own {})",
            service.effective_priority(),
            service.priority()
        )
    } else {
        service.effective_priority().to_string()
    }
}

/// Log the service table at startup.
fn log_services(graph: &ServiceGraph) {
    for service in graph.services() {
        let members: Vec<String> = service.members().iter().map(|m| m.to_string()).collect();
        info!(
            service = %service.name(),
            managed = service.is_managed(),
            members = ?members,
            wait_for = %wait_for_list(service),
            priority = %priority_label(service),
            "service"
        );
    }
}

/// Print the config files and the startup plan in dependency levels.
fn print_dry_run(cfg: &StartupConfig) {
    let graph = cfg.graph();

    println!("supervisord-dependent-startup dry-run");
    for file in cfg.files() {
        println!("  config: {}", file.display());
    }
    println!();

    println!(
        "services ({}, {} managed):",
        graph.len(),
        graph.managed().count()
    );
    for (level, ids) in graph.startup_order().iter().enumerate() {
        println!("  level {level}:");
        for service in ids.iter().filter_map(|&id| graph.service(id)) {
            let managed = if service.is_managed() {
                format!("start {}", service.start_target())
            } else {
                "not managed".to_string()
            };
            println!(
                "    - {} [{}] priority {}",
                service.name(),
                managed,
                priority_label(service)
            );
            if !service.edges().is_empty() {
                println!("        wait for: {}", wait_for_list(service));
            }
        }
    }

    debug!("dry-run complete (nothing started)");
}
