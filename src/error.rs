//! Error types for spark-spot-check
//!
//! Errors fall into two groups:
//! - Run-fatal errors ([`Error`]) that abort the whole check run and reach the process boundary
//!   (round retrieval, report writing, configuration).
//! - Per-check errors ([`CheckError`]) that are contained inside a single attempt and end up as
//!   text in that attempt's [`CheckResult`](crate::types::CheckResult).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for spark-spot-check operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for spark-spot-check
///
/// Only failures that make the whole run meaningless are represented here.
/// Failures of individual checks are reported as data, see [`CheckError`].
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_checks")
        key: Option<String>,
    },

    /// Fetching the round definition failed
    #[error("round error: {0}")]
    Round(#[from] RoundError),

    /// Writing the report failed
    #[error("report error: {0}")]
    Report(#[from] ReportError),

    /// Failed to build an HTTP client for one of the collaborators
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Run was cancelled before it could start
    #[error("run cancelled")]
    Cancelled,
}

/// Errors raised while fetching a round from the SPARK API
#[derive(Debug, Error)]
pub enum RoundError {
    /// Transport-level failure (DNS, connect, timeout, reading the body)
    #[error("failed to fetch round from {url}: {source}")]
    Network {
        /// The round URL that was requested
        url: String,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status
    #[error("round API {url} returned HTTP {status}")]
    Status {
        /// The round URL that was requested
        url: String,
        /// The HTTP status code returned
        status: u16,
    },

    /// The response body is not a valid round document
    #[error("failed to decode round from {url}: {source}")]
    Decode {
        /// The round URL that was requested
        url: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised while writing the report
#[derive(Debug, Error)]
pub enum ReportError {
    /// Could not create or write the destination file
    #[error("failed to write report to {path}: {source}")]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The report could not be serialized
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors raised while parsing a Filecoin address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Address string is empty or too short
    #[error("address {0:?} is too short")]
    TooShort(String),

    /// Unknown network prefix (expected `f` or `t`)
    #[error("unknown network prefix {0:?}")]
    UnknownNetwork(char),

    /// Unknown address protocol (expected 0-4)
    #[error("unknown address protocol {0:?}")]
    UnknownProtocol(char),

    /// ID address payload is not a valid actor id
    #[error("invalid actor id {0:?}")]
    InvalidId(String),

    /// Payload is not valid lowercase base32
    #[error("invalid base32 payload {0:?}")]
    InvalidEncoding(String),

    /// Decoded payload has the wrong length for its protocol
    #[error("invalid payload length for protocol {protocol}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        /// Address protocol number
        protocol: u8,
        /// Expected decoded length (payload + checksum)
        expected: usize,
        /// Actual decoded length
        actual: usize,
    },

    /// The trailing blake2b-32 checksum does not match the payload
    #[error("checksum mismatch in address {0:?}")]
    ChecksumMismatch(String),
}

/// Errors raised while converting a multiaddr into an HTTP URL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultiaddrError {
    /// Host component is not ip4, ip6, dns, dns4 or dns6
    #[error("unsupported multiaddr host type {host_type:?} in {addr:?}")]
    UnsupportedHostType {
        /// The multiaddr
        addr: String,
        /// The offending host type
        host_type: String,
    },

    /// Transport is not tcp
    #[error("cannot parse {addr:?}: unsupported protocol {protocol:?}")]
    UnsupportedProtocol {
        /// The multiaddr
        addr: String,
        /// The offending transport
        protocol: String,
    },

    /// Application protocol is not http or https
    #[error("cannot parse {addr:?}: unsupported scheme {scheme:?}")]
    UnsupportedScheme {
        /// The multiaddr
        addr: String,
        /// The offending scheme
        scheme: String,
    },

    /// Components after the scheme
    #[error("cannot parse {addr:?}: too many parts")]
    TooManyParts {
        /// The multiaddr
        addr: String,
    },
}

/// Errors raised by the chain-state collaborator
#[derive(Debug, Error)]
pub enum ChainError {
    /// Transport-level failure talking to the RPC node
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The RPC node returned a JSON-RPC error object
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// The RPC response had neither a result nor an error
    #[error("rpc response for {method} had no result")]
    EmptyResponse {
        /// RPC method name
        method: &'static str,
    },

    /// The miner exists but has no peer id registered on chain
    #[error("miner {0} has no peer id on chain")]
    MissingPeerId(String),

    /// The call did not complete in time
    #[error("rpc call timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised by the content-routing index collaborator
#[derive(Debug, Error)]
pub enum IndexError {
    /// Transport-level failure or undecodable body
    #[error("IPNI request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The index answered with an unexpected status
    #[error("IPNI returned HTTP {0}")]
    Status(u16),

    /// The call did not complete in time
    #[error("IPNI query timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised by the retrieval engine
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// None of the peer's addresses can be used by this engine
    #[error("peer {peer_id} has no supported address (candidates: {addrs:?})")]
    NoSupportedAddress {
        /// Peer id of the provider
        peer_id: String,
        /// Multiaddrs that were advertised
        addrs: Vec<String>,
    },

    /// Transport-level failure
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status
    #[error("provider returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, trimmed
        body: String,
    },

    /// No bytes were received within the inactivity window
    #[error("no progress for {0:?}")]
    Stalled(Duration),

    /// The retrieval did not complete in time
    #[error("retrieval timed out after {0:?}")]
    Timeout(Duration),

    /// Scratch-space I/O failed
    #[error("scratch I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single check attempt
///
/// Every variant is converted to its textual description when the report is written;
/// none of them aborts the run.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The task's content identifier is malformed
    #[error("failed to parse CID {input:?}: {source}")]
    ContentIdParse {
        /// The raw content identifier
        input: String,
        /// Underlying parse error
        #[source]
        source: cid::Error,
    },

    /// The task's provider identifier is malformed
    #[error("failed to parse miner address: {0}")]
    AddressParse(#[from] AddressError),

    /// Chain-state query for the miner's peer id failed
    #[error("failed to get miner info: {0}")]
    ChainQuery(#[from] ChainError),

    /// Content-routing index query failed
    #[error("failed to query IPNI: {0}")]
    IndexQuery(#[from] IndexError),

    /// Resolution succeeded but the provider does not advertise the content
    #[error("no provider found for CID {cid}")]
    NoProvider {
        /// The content identifier that was looked up
        cid: String,
    },

    /// Content retrieval failed
    #[error("retrieval failed: {0}")]
    Fetch(#[from] RetrievalError),
}

impl CheckError {
    /// Machine-readable code for this failure, used for run summaries.
    pub fn error_code(&self) -> &'static str {
        match self {
            CheckError::ContentIdParse { .. } => "cid_parse",
            CheckError::AddressParse(_) => "address_parse",
            CheckError::ChainQuery(_) => "chain_query",
            CheckError::IndexQuery(_) => "index_query",
            CheckError::NoProvider { .. } => "no_provider",
            CheckError::Fetch(_) => "fetch",
        }
    }
}
