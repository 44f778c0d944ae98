//! Content-routing index (IPNI) queries.

use crate::content_id::ContentId;
use crate::error::{Error, IndexError, Result};
use crate::types::ResolvedPeer;
use serde::Deserialize;
use std::time::Duration;

/// Abstraction over the content-routing index, enabling testability.
#[async_trait::async_trait]
pub trait IndexClient: Send + Sync {
    /// All peers currently advertising the content's multihash, in index order.
    async fn find_providers(
        &self,
        cid: &ContentId,
    ) -> std::result::Result<Vec<ResolvedPeer>, IndexError>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FindResponse {
    #[serde(default)]
    multihash_results: Vec<MultihashResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MultihashResult {
    #[serde(default)]
    provider_results: Vec<ProviderResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProviderResult {
    provider: Option<AddrInfo>,
}

#[derive(Debug, Deserialize)]
struct AddrInfo {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Addrs", default)]
    addrs: Option<Vec<String>>,
}

/// Production [`IndexClient`] using the IPNI HTTP find API.
#[derive(Clone, Debug)]
pub struct IpniClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl IpniClient {
    /// Create a client for the index at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    fn find_url(&self, cid: &ContentId) -> String {
        format!(
            "{}/multihash/{}",
            self.base_url.trim_end_matches('/'),
            cid.multihash_b58()
        )
    }

    fn map_transport(&self, e: reqwest::Error) -> IndexError {
        if e.is_timeout() {
            IndexError::Timeout(self.timeout)
        } else {
            IndexError::Transport(e)
        }
    }
}

#[async_trait::async_trait]
impl IndexClient for IpniClient {
    async fn find_providers(
        &self,
        cid: &ContentId,
    ) -> std::result::Result<Vec<ResolvedPeer>, IndexError> {
        let url = self.find_url(cid);
        tracing::debug!(cid = %cid, url = %url, "Querying IPNI for providers");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(IndexError::Status(status.as_u16()));
        }

        let body: FindResponse = response.json().await.map_err(|e| self.map_transport(e))?;

        let peers: Vec<ResolvedPeer> = body
            .multihash_results
            .into_iter()
            .flat_map(|mh| mh.provider_results)
            .filter_map(|pr| pr.provider)
            .map(|info| ResolvedPeer {
                peer_id: info.id,
                addrs: info.addrs.unwrap_or_default(),
            })
            .collect();

        tracing::debug!(cid = %cid, candidates = peers.len(), "IPNI query complete");
        Ok(peers)
    }
}
