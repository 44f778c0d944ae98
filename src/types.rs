//! Core types for spark-spot-check

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A batch of retrieval tasks issued for one SPARK measurement round
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    /// Round identifier
    pub round_id: String,
    /// Chain epoch at which the round started
    pub start_epoch: String,
    /// Maximum number of tasks a single checker node may perform in this round
    pub max_tasks_per_node: i64,
    /// Tasks to sample from
    pub retrieval_tasks: Vec<RetrievalTask>,
}

impl Round {
    /// Keep only the tasks assigned to `miner_id`.
    pub fn filter_miner(mut self, miner_id: &str) -> Self {
        self.retrieval_tasks.retain(|t| t.miner_id == miner_id);
        self
    }
}

/// A single provider/content pairing to check
///
/// Both identifiers are kept as raw strings; they are validated when a check uses them so
/// that one malformed task only fails its own check.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalTask {
    /// Content identifier (CID)
    pub cid: String,
    /// Storage provider address, e.g. `f01000`
    pub miner_id: String,
    /// Clients that made the deals (informational)
    #[serde(default)]
    pub clients: Vec<String>,
}

impl fmt::Display for RetrievalTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.cid, self.miner_id)
    }
}

/// How many tasks to sample from a round
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleSize {
    /// One check per task in the round
    All,
    /// A fixed number of checks, drawn with replacement
    Count(usize),
}

impl SampleSize {
    /// Resolve against the number of tasks in a round.
    pub fn resolve(self, task_count: usize) -> usize {
        match self {
            SampleSize::All => task_count,
            SampleSize::Count(n) => n,
        }
    }
}

impl Default for SampleSize {
    fn default() -> Self {
        SampleSize::Count(10)
    }
}

/// How much of the content DAG a retrieval should traverse
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DagScope {
    /// The whole DAG
    #[default]
    All,
    /// The root block only
    Block,
    /// A bounded sub-entity (optionally restricted to a byte range)
    Entity,
}

impl DagScope {
    /// Parse a user-supplied scope string.
    ///
    /// Unrecognized values fall back to [`DagScope::Block`], the narrowest scope.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            tracing::warn!(scope = %s, "unknown DAG scope, falling back to block");
            DagScope::Block
        })
    }

    /// Query-string value for this scope
    pub fn as_str(&self) -> &'static str {
        match self {
            DagScope::All => "all",
            DagScope::Block => "block",
            DagScope::Entity => "entity",
        }
    }
}

impl FromStr for DagScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DagScope::All),
            "block" => Ok(DagScope::Block),
            "entity" => Ok(DagScope::Entity),
            other => Err(format!("unknown DAG scope {other:?}")),
        }
    }
}

impl fmt::Display for DagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte range requested for an entity-scoped retrieval
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRange {
    /// First byte (inclusive)
    pub start: u64,
    /// Last byte (inclusive); open-ended when `None`
    pub end: Option<u64>,
}

impl fmt::Display for EntityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "{}:{}", self.start, end),
            None => write!(f, "{}:*", self.start),
        }
    }
}

/// How much to retrieve: DAG scope plus optional entity byte range
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchScope {
    /// DAG traversal scope
    pub dag_scope: DagScope,
    /// Byte range, only used with [`DagScope::Entity`]
    pub entity_range: Option<EntityRange>,
}

/// A provider's peer as advertised to the content-routing index
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPeer {
    /// libp2p peer id
    pub peer_id: String,
    /// Candidate multiaddrs
    pub addrs: Vec<String>,
}

/// Statistics of a successful retrieval
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalStats {
    /// Root CID that was retrieved
    pub root_cid: String,
    /// Peer id of the provider
    pub provider_id: String,
    /// Multiaddr the content was fetched from
    pub provider_address: String,
    /// Protocol used for the retrieval
    pub protocol: String,
    /// DAG scope requested
    pub dag_scope: DagScope,
    /// HTTP status code of the retrieval response
    pub status_code: u16,
    /// Bytes received
    pub byte_length: u64,
    /// Time until the first byte arrived, in milliseconds
    pub time_to_first_byte_ms: u64,
    /// Total duration, in milliseconds
    pub duration_ms: u64,
    /// Average bandwidth in bytes per second
    pub average_bandwidth: u64,
    /// Multihash-encoded sha2-256 of the CAR bytes (hex)
    pub car_checksum: String,
    /// The CAR outgrew the size limit and was truncated
    pub car_too_large: bool,
    /// When the retrieval started
    pub start_time: DateTime<Utc>,
}

/// Outcome of one sampled check
///
/// Exactly one of `stats` or `error` is set. Build results with [`CheckResult::success`] or
/// [`CheckResult::failure`] to keep it that way.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CheckResult {
    /// The task that was checked
    pub task: RetrievalTask,
    /// Retrieval statistics, present on success
    pub stats: Option<RetrievalStats>,
    /// Error description, present on failure
    pub error: Option<String>,
    /// Machine-readable failure code, present on failure
    #[serde(skip)]
    error_code: Option<&'static str>,
}

impl CheckResult {
    /// A successful check
    pub fn success(task: RetrievalTask, stats: RetrievalStats) -> Self {
        Self {
            task,
            stats: Some(stats),
            error: None,
            error_code: None,
        }
    }

    /// A failed check
    pub fn failure(task: RetrievalTask, error: &crate::error::CheckError) -> Self {
        Self {
            task,
            stats: None,
            error: Some(error.to_string()),
            error_code: Some(error.error_code()),
        }
    }

    /// Whether the retrieval succeeded
    pub fn is_success(&self) -> bool {
        self.stats.is_some()
    }

    /// Machine-readable failure code, if this check failed in this run
    pub fn error_code(&self) -> Option<&'static str> {
        self.error_code
    }
}

/// Aggregate counts over a report
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReportSummary {
    /// Number of checks performed
    pub total: usize,
    /// Checks that retrieved the content
    pub succeeded: usize,
    /// Checks where the provider did not advertise the content
    pub no_provider: usize,
    /// All other failures
    pub failed: usize,
}

impl ReportSummary {
    /// Summarize a set of results.
    pub fn from_results(results: &[CheckResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Default::default()
        };
        for result in results {
            if result.is_success() {
                summary.succeeded += 1;
            } else if result.error_code() == Some("no_provider") {
                summary.no_provider += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }
}
