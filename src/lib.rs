//! # spark-spot-check
//!
//! Spot-check harness for SPARK retrieval rounds.
//!
//! A round is a list of retrieval tasks, each pairing a content identifier with the storage
//! provider that is supposed to serve it. A spot check samples tasks from a round and, for each
//! draw:
//!
//! 1. resolves the provider's libp2p peer id on chain (`Filecoin.StateMinerInfo`),
//! 2. looks up that peer's advertisement of the content in IPNI,
//! 3. retrieves the content from the advertised address,
//!
//! and records either retrieval statistics or the reason the check failed. The results are
//! written as a JSON report.
//!
//! ## Quick Start
//!
//! ```no_run
//! use spark_spot_check::{Config, run_with_shutdown};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.check.checks = Some(5);
//!
//!     let summary = run_with_shutdown(config).await?;
//!     println!("{} of {} checks succeeded", summary.succeeded, summary.total);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Filecoin address parsing
pub mod address;
/// Chain-state queries
pub mod chain;
/// Command-line interface
pub mod cli;
/// Configuration types
pub mod config;
/// Content identifiers
pub mod content_id;
/// Error types
pub mod error;
/// Single-peer content fetch
pub mod fetcher;
/// Content-routing index queries
pub mod ipni;
/// Multiaddr to URL conversion
pub mod multiaddr;
/// JSON report output
pub mod report;
/// Provider peer resolution
pub mod resolver;
/// Retrieval engines
pub mod retrieval;
/// Retry logic with exponential backoff
pub mod retry;
/// Round retrieval from the SPARK API
pub mod round;
/// Concurrent check runner
pub mod runner;
/// Core types
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, RoundSelector};
pub use error::{CheckError, Error, Result};
pub use fetcher::ContentFetcher;
pub use report::ReportSink;
pub use resolver::ProviderResolver;
pub use round::RoundSource;
pub use runner::CheckRunner;
pub use types::{CheckResult, DagScope, ReportSummary, RetrievalTask, Round, SampleSize};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run one spot check end to end and write its report.
///
/// Fetches the configured round (with retries), samples and checks tasks, and writes the
/// report to `config.output`. Only a failed round fetch or report write is an error; failed
/// checks are part of the report. When `cancel` fires after the round was fetched, the
/// checks completed so far are still written.
pub async fn run(config: Config, cancel: CancellationToken) -> Result<ReportSummary> {
    config.validate()?;

    let round_source = RoundSource::new(&config.endpoints.round_api, config.timeouts.round)?;
    let round = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        round = retry::with_retry(&config.retry, || round_source.fetch_round(&config.round)) => round?,
    };

    let round = match &config.check.miner_filter {
        Some(miner) => {
            let filtered = round.filter_miner(miner);
            tracing::info!(
                miner_id = %miner,
                tasks = filtered.retrieval_tasks.len(),
                "Filtered round to a single miner"
            );
            filtered
        }
        None => round,
    };

    let chain = chain::LotusClient::new(
        &config.endpoints.rpc_url,
        config.endpoints.rpc_token.clone(),
        config.timeouts.chain,
    )?;
    let index = ipni::IpniClient::new(&config.endpoints.ipni_url, config.timeouts.index)?;
    let retriever = retrieval::HttpRetriever::new(
        config.timeouts.fetch,
        config.timeouts.inactivity,
        config.check.max_car_size,
    )?;

    let resolver = ProviderResolver::new(Arc::new(chain), Arc::new(index));
    let fetcher = ContentFetcher::new(Arc::new(retriever), config.check.fetch_scope());
    let runner = CheckRunner::new(resolver, fetcher, config.check.max_concurrent_checks)
        .with_seed(config.check.seed);

    let results = runner
        .run(Arc::new(round), config.check.sample_size(), cancel)
        .await;

    ReportSink::new(&config.output).write(&results).await?;

    let summary = ReportSummary::from_results(&results);
    tracing::info!(
        total = summary.total,
        succeeded = summary.succeeded,
        no_provider = summary.no_provider,
        failed = summary.failed,
        "Spot check complete"
    );
    Ok(summary)
}

/// Run a spot check, cancelling it gracefully on a termination signal.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn run_with_shutdown(config: Config) -> Result<ReportSummary> {
    let cancel = CancellationToken::new();

    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            tracing::warn!("Shutdown requested, cancelling in-flight checks");
            cancel.cancel();
        })
    };

    let result = run(config, cancel).await;
    watcher.abort();
    result
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
