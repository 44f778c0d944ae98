use clap::Parser;
use spark_spot_check::cli::{Args, Command};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match args.command {
        Command::Check(check) => {
            let config = check.into_config();
            match spark_spot_check::run_with_shutdown(config).await {
                Ok(_) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!(error = %e, "Spot check failed");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides `--log-level`.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
