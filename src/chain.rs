//! Chain-state queries: miner address to libp2p peer id.

use crate::address::Address;
use crate::error::{ChainError, Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const STATE_MINER_INFO: &str = "Filecoin.StateMinerInfo";

/// Abstraction over the chain-state service, enabling testability.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Peer id the miner registered on chain, read at the current chain head.
    async fn miner_peer_id(&self, miner: &Address) -> std::result::Result<String, ChainError>;
}

#[derive(Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    method: &'static str,
    params: (String, Option<()>),
    id: u64,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MinerInfo {
    peer_id: Option<String>,
}

/// Production [`ChainClient`] talking to a Lotus-compatible JSON-RPC endpoint.
#[derive(Debug)]
pub struct LotusClient {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl LotusClient {
    /// Create a client for `url`, optionally authenticating with a bearer `token`.
    pub fn new(url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self {
            client,
            url: url.into(),
            token,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    fn map_transport(&self, e: reqwest::Error) -> ChainError {
        if e.is_timeout() {
            ChainError::Timeout(self.timeout)
        } else {
            ChainError::Transport(e)
        }
    }
}

#[async_trait::async_trait]
impl ChainClient for LotusClient {
    async fn miner_peer_id(&self, miner: &Address) -> std::result::Result<String, ChainError> {
        tracing::debug!(miner_id = %miner, "Fetching miner info");

        // A null tipset key selects the current head
        let request = RpcRequest {
            jsonrpc: "2.0",
            method: STATE_MINER_INFO,
            params: (miner.to_string(), None),
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.map_transport(e))?
            .error_for_status()
            .map_err(|e| self.map_transport(e))?;

        let body: RpcResponse<MinerInfo> =
            response.json().await.map_err(|e| self.map_transport(e))?;

        if let Some(err) = body.error {
            return Err(ChainError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        let info = body.result.ok_or(ChainError::EmptyResponse {
            method: STATE_MINER_INFO,
        })?;

        match info.peer_id {
            Some(peer_id) if !peer_id.is_empty() => Ok(peer_id),
            _ => Err(ChainError::MissingPeerId(miner.to_string())),
        }
    }
}
