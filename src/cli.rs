//! Command-line interface

use crate::config::{
    Config, DEFAULT_IPNI_URL, DEFAULT_MERIDIAN_ADDRESS, DEFAULT_ROUND_API, DEFAULT_RPC_URL,
    MAX_CONCURRENT_CHECKS, RoundSelector,
};
use crate::types::{DagScope, EntityRange};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level arguments
#[derive(Parser, Debug)]
#[command(name = "spark-spot-check")]
#[command(version)]
#[command(about = "Spot-check SPARK retrieval tasks against storage providers", long_about = None)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Log filter, e.g. "info" or "spark_spot_check=debug" (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sample tasks from a round and try to retrieve them
    Check(CheckArgs),
}

/// Arguments of the `check` subcommand
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Report destination
    #[arg(short, long, default_value = "results.json")]
    pub output: PathBuf,

    /// Number of checks to run, -1 checks every task in the round
    #[arg(
        short,
        long,
        default_value_t = 10,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i64).range(-1..)
    )]
    pub checks: i64,

    /// Round number, -1 selects the current round
    #[arg(short, long, default_value_t = -1, allow_negative_numbers = true)]
    pub round: i64,

    /// Meridian contract the round number belongs to
    #[arg(short, long, default_value = DEFAULT_MERIDIAN_ADDRESS)]
    pub meridian_address: String,

    /// DAG scope: all, block or entity (anything else falls back to block)
    #[arg(long, default_value = "all")]
    pub dag_scope: String,

    /// First byte of the entity range (entity scope only)
    #[arg(long, default_value_t = 0)]
    pub range_start: u64,

    /// Last byte of the entity range (entity scope only, open-ended when unset)
    #[arg(long)]
    pub range_end: Option<u64>,

    /// Only check tasks for this miner
    #[arg(long)]
    pub miner: Option<String>,

    /// SPARK API base URL
    #[arg(long, default_value = DEFAULT_ROUND_API)]
    pub api: String,

    /// Filecoin JSON-RPC endpoint
    #[arg(long, default_value = DEFAULT_RPC_URL)]
    pub rpc: String,

    /// Bearer token for the RPC endpoint
    #[arg(long, env = "SPARK_RPC_TOKEN", hide_env_values = true)]
    pub rpc_token: Option<String>,

    /// IPNI endpoint
    #[arg(short, long, default_value = DEFAULT_IPNI_URL)]
    pub ipni: String,

    /// Maximum number of checks in flight
    #[arg(
        long,
        default_value_t = 16,
        value_parser = clap::value_parser!(u64).range(1..=MAX_CONCURRENT_CHECKS as u64)
    )]
    pub concurrency: u64,

    /// Retrieval timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,

    /// Seed for task sampling
    #[arg(long)]
    pub seed: Option<u64>,
}

impl CheckArgs {
    /// Build the run configuration.
    pub fn into_config(self) -> Config {
        let mut config = Config {
            round: RoundSelector::from_round_number(self.round, self.meridian_address),
            output: self.output,
            ..Default::default()
        };

        config.endpoints.round_api = self.api;
        config.endpoints.rpc_url = self.rpc;
        config.endpoints.rpc_token = self.rpc_token;
        config.endpoints.ipni_url = self.ipni;

        config.check.checks = match self.checks {
            -1 => None,
            n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
        };
        config.check.dag_scope = DagScope::parse_lenient(&self.dag_scope);
        config.check.entity_range = Some(EntityRange {
            start: self.range_start,
            end: self.range_end,
        });
        config.check.miner_filter = self.miner;
        config.check.max_concurrent_checks =
            usize::try_from(self.concurrency).unwrap_or(MAX_CONCURRENT_CHECKS);
        config.check.seed = self.seed;

        let timeout = Duration::from_secs(self.timeout);
        config.timeouts.fetch = timeout;
        config.timeouts.inactivity = timeout;

        config
    }
}
