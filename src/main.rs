// src/main.rs

use std::process::ExitCode;

use dependent_startup::{cli, logging, run};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level, args.log_file.as_deref()) {
        eprintln!("supervisord-dependent-startup error: failed to set up logging: {err}");
        return ExitCode::from(3);
    }

    match run(args).await {
        Ok(summary) => ExitCode::from(summary.outcome.exit_code()),
        Err(err) => {
            tracing::error!(error = %err, "dependent startup aborted");
            eprintln!("supervisord-dependent-startup error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
