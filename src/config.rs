//! Configuration types for spark-spot-check

use crate::error::{Error, Result};
use crate::types::{DagScope, EntityRange, FetchScope, SampleSize};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default SPARK API base URL
pub const DEFAULT_ROUND_API: &str = "https://api.filspark.com";
/// Default Meridian contract used to address rounds by number
pub const DEFAULT_MERIDIAN_ADDRESS: &str = "0x8460766edc62b525fc1fa4d628fc79229dc73031";
/// Default Filecoin JSON-RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://api.node.glif.io/rpc/v1";
/// Default IPNI endpoint
pub const DEFAULT_IPNI_URL: &str = "https://cid.contact";
/// Upper bound on checks in flight
pub const MAX_CONCURRENT_CHECKS: usize = 1024;

/// Which round to fetch from the SPARK API
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundSelector {
    /// The round currently in progress
    #[default]
    Current,
    /// A specific round of a Meridian contract
    Meridian {
        /// Contract address
        contract: String,
        /// Round number
        round: u64,
    },
}

impl RoundSelector {
    /// Build a selector from the CLI convention where a negative round means "current".
    pub fn from_round_number(round: i64, contract: impl Into<String>) -> Self {
        match u64::try_from(round) {
            Ok(round) => RoundSelector::Meridian {
                contract: contract.into(),
                round,
            },
            Err(_) => RoundSelector::Current,
        }
    }
}

/// External service endpoints
///
/// Each component only receives the endpoint it talks to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// SPARK round API base URL (default: "https://api.filspark.com")
    #[serde(default = "default_round_api")]
    pub round_api: String,

    /// Filecoin JSON-RPC endpoint (default: "https://api.node.glif.io/rpc/v1")
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Optional bearer token for the RPC endpoint
    #[serde(default)]
    pub rpc_token: Option<String>,

    /// IPNI endpoint (default: "https://cid.contact")
    #[serde(default = "default_ipni_url")]
    pub ipni_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            round_api: default_round_api(),
            rpc_url: default_rpc_url(),
            rpc_token: None,
            ipni_url: default_ipni_url(),
        }
    }
}

/// What to check and how many checks to run at once
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Number of checks to run; `None` checks every task in the round (default: 10)
    #[serde(default = "default_checks")]
    pub checks: Option<usize>,

    /// DAG scope of each retrieval (default: all)
    #[serde(default)]
    pub dag_scope: DagScope,

    /// Entity byte range, used when `dag_scope` is entity
    #[serde(default)]
    pub entity_range: Option<EntityRange>,

    /// Only check tasks of this miner
    #[serde(default)]
    pub miner_filter: Option<String>,

    /// Maximum number of checks in flight, 1 to [`MAX_CONCURRENT_CHECKS`] (default: 16)
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,

    /// Seed for task sampling; entropy-seeded when `None`
    #[serde(default)]
    pub seed: Option<u64>,

    /// Abort a retrieval once the CAR grows past this many bytes (default: 200 MiB)
    #[serde(default = "default_max_car_size")]
    pub max_car_size: u64,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            checks: default_checks(),
            dag_scope: DagScope::default(),
            entity_range: None,
            miner_filter: None,
            max_concurrent_checks: default_max_concurrent_checks(),
            seed: None,
            max_car_size: default_max_car_size(),
        }
    }
}

impl CheckConfig {
    /// Sample size as understood by the runner
    pub fn sample_size(&self) -> SampleSize {
        match self.checks {
            Some(n) => SampleSize::Count(n),
            None => SampleSize::All,
        }
    }

    /// Retrieval scope; the byte range is only forwarded for entity scope
    pub fn fetch_scope(&self) -> FetchScope {
        FetchScope {
            dag_scope: self.dag_scope,
            entity_range: match self.dag_scope {
                DagScope::Entity => Some(self.entity_range.unwrap_or_default()),
                _ => None,
            },
        }
    }
}

/// Timeouts for every external call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Round API request (default: 10 seconds)
    #[serde(default = "default_round_timeout", with = "duration_serde")]
    pub round: Duration,

    /// Chain RPC call (default: 30 seconds)
    #[serde(default = "default_chain_timeout", with = "duration_serde")]
    pub chain: Duration,

    /// IPNI query (default: 30 seconds)
    #[serde(default = "default_index_timeout", with = "duration_serde")]
    pub index: Duration,

    /// Whole retrieval (default: 60 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub fetch: Duration,

    /// Maximum gap between received chunks of a retrieval (default: 60 seconds)
    #[serde(default = "default_fetch_timeout", with = "duration_serde")]
    pub inactivity: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            round: default_round_timeout(),
            chain: default_chain_timeout(),
            index: default_index_timeout(),
            fetch: default_fetch_timeout(),
            inactivity: default_fetch_timeout(),
        }
    }
}

/// Retry configuration for the round fetch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 10 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for a spot-check run
///
/// Built once at startup (usually from command-line arguments) and handed to the
/// components piece by piece:
/// - [`endpoints`](EndpointConfig) : round API, chain RPC and IPNI URLs
/// - [`check`](CheckConfig) : sampling, scope and concurrency
/// - [`timeouts`](TimeoutConfig) : per-call time limits
/// - [`retry`](RetryConfig) : retry policy for the round fetch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Round to check
    #[serde(default)]
    pub round: RoundSelector,

    /// Report destination (default: "results.json")
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// External endpoints
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Check behavior
    #[serde(default)]
    pub check: CheckConfig,

    /// Per-call timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Round fetch retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            round: RoundSelector::default(),
            output: default_output(),
            endpoints: EndpointConfig::default(),
            check: CheckConfig::default(),
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CONCURRENT_CHECKS).contains(&self.check.max_concurrent_checks) {
            return Err(Error::Config {
                message: format!(
                    "max_concurrent_checks must be between 1 and {MAX_CONCURRENT_CHECKS}, got {}",
                    self.check.max_concurrent_checks
                ),
                key: Some("max_concurrent_checks".to_string()),
            });
        }

        if let Some(EntityRange {
            start,
            end: Some(end),
        }) = self.check.entity_range
        {
            if end < start {
                return Err(Error::Config {
                    message: format!("entity range end {end} is before start {start}"),
                    key: Some("entity_range".to_string()),
                });
            }
        }

        for (key, value) in [
            ("round_api", &self.endpoints.round_api),
            ("rpc_url", &self.endpoints.rpc_url),
            ("ipni_url", &self.endpoints.ipni_url),
        ] {
            if let Err(e) = url::Url::parse(value) {
                return Err(Error::Config {
                    message: format!("invalid URL {value:?}: {e}"),
                    key: Some(key.to_string()),
                });
            }
        }

        Ok(())
    }
}

fn default_round_api() -> String {
    DEFAULT_ROUND_API.to_string()
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_ipni_url() -> String {
    DEFAULT_IPNI_URL.to_string()
}

fn default_output() -> PathBuf {
    PathBuf::from("results.json")
}

fn default_checks() -> Option<usize> {
    Some(10)
}

fn default_max_concurrent_checks() -> usize {
    16
}

fn default_max_car_size() -> u64 {
    200 * 1024 * 1024
}

fn default_round_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_chain_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_index_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_fetch_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_cli_defaults() {
        let config = Config::default();
        assert_eq!(config.round, RoundSelector::Current);
        assert_eq!(config.output, PathBuf::from("results.json"));
        assert_eq!(config.check.sample_size(), SampleSize::Count(10));
        assert_eq!(config.check.dag_scope, DagScope::All);
        assert_eq!(config.endpoints.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(config.endpoints.ipni_url, DEFAULT_IPNI_URL);
        config.validate().unwrap();
    }

    #[test]
    fn negative_round_selects_current() {
        assert_eq!(
            RoundSelector::from_round_number(-1, "0xABC"),
            RoundSelector::Current
        );
        assert_eq!(
            RoundSelector::from_round_number(5, "0xABC"),
            RoundSelector::Meridian {
                contract: "0xABC".into(),
                round: 5
            }
        );
    }

    #[test]
    fn validate_rejects_out_of_range_concurrency() {
        for value in [0, MAX_CONCURRENT_CHECKS + 1, usize::MAX] {
            let mut config = Config::default();
            config.check.max_concurrent_checks = value;

            let err = config.validate().unwrap_err();
            assert!(matches!(
                err,
                Error::Config { key: Some(ref k), .. } if k == "max_concurrent_checks"
            ));
        }

        let mut config = Config::default();
        config.check.max_concurrent_checks = MAX_CONCURRENT_CHECKS;
        config.validate().unwrap();
    }

    #[test]
    fn default_output_is_results_json() {
        let config = Config::default();
        assert_eq!(config.output, default_output());

        let parsed: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.output, config.output);
    }

    #[test]
    fn validate_rejects_inverted_entity_range() {
        let mut config = Config::default();
        config.check.entity_range = Some(EntityRange {
            start: 100,
            end: Some(10),
        });

        assert!(config.validate().is_err());
    }

    #[test]
    fn entity_range_only_forwarded_for_entity_scope() {
        let mut check = CheckConfig {
            entity_range: Some(EntityRange {
                start: 0,
                end: Some(200),
            }),
            ..Default::default()
        };
        assert_eq!(check.fetch_scope().entity_range, None);

        check.dag_scope = DagScope::Entity;
        assert_eq!(
            check.fetch_scope().entity_range,
            Some(EntityRange {
                start: 0,
                end: Some(200)
            })
        );
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let json = r#"{
            "round": {"meridian": {"contract": "0xABC", "round": 7}},
            "check": {"checks": null, "dag_scope": "block"},
            "timeouts": {"fetch": 5}
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.check.sample_size(), SampleSize::All);
        assert_eq!(config.check.dag_scope, DagScope::Block);
        assert_eq!(config.timeouts.fetch, Duration::from_secs(5));
        assert_eq!(config.timeouts.chain, Duration::from_secs(30));
        assert_eq!(config.check.max_concurrent_checks, 16);
    }
}
