//! Retrieval engine: fetch a CAR from a single provider peer.
//!
//! The production engine speaks the IPFS trustless HTTP gateway protocol. The CAR body is
//! streamed to a scratch file while it is hashed, so memory use stays flat for large DAGs.

use crate::content_id::ContentId;
use crate::error::{Error, RetrievalError, Result};
use crate::multiaddr::multiaddr_to_http_url;
use crate::types::{DagScope, FetchScope, ResolvedPeer, RetrievalStats};
use chrono::Utc;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

/// Media type of a CAR response
pub const CAR_MEDIA_TYPE: &str = "application/vnd.ipld.car";

/// Multihash prefix for sha2-256 with a 32 byte digest
const SHA256_MULTIHASH_PREFIX: &str = "1220";

/// Bytes of a non-2xx response body kept for the error message
const ERROR_BODY_LIMIT: usize = 512;

/// Everything a retrieval engine needs for one fetch
#[derive(Clone, Debug)]
pub struct RetrievalRequest {
    /// Root content identifier
    pub cid: ContentId,
    /// The only peer to fetch from
    pub peer: ResolvedPeer,
    /// How much of the DAG to fetch
    pub scope: FetchScope,
    /// File the CAR bytes are written to; owned by the caller
    pub scratch_path: PathBuf,
}

/// Abstraction over retrieval protocols, enabling testability.
#[async_trait::async_trait]
pub trait Retriever: Send + Sync {
    /// Fetch `request.cid` from `request.peer` and report transfer statistics.
    async fn retrieve(
        &self,
        request: &RetrievalRequest,
    ) -> std::result::Result<RetrievalStats, RetrievalError>;
}

/// Build the trustless gateway URL for `cid` under `base`.
pub fn retrieval_url(base: &str, cid: &ContentId, scope: &FetchScope) -> String {
    let mut url = format!(
        "{}/ipfs/{}?dag-scope={}",
        base.trim_end_matches('/'),
        cid,
        scope.dag_scope
    );
    if scope.dag_scope == DagScope::Entity {
        if let Some(range) = scope.entity_range {
            url.push_str(&format!("&entity-bytes={range}"));
        }
    }
    url
}

struct Transfer {
    status_code: u16,
    byte_length: u64,
    time_to_first_byte: Duration,
    checksum: String,
    car_too_large: bool,
}

/// Production [`Retriever`] over HTTP
#[derive(Clone, Debug)]
pub struct HttpRetriever {
    client: reqwest::Client,
    timeout: Duration,
    inactivity: Duration,
    max_car_size: u64,
}

impl HttpRetriever {
    /// Create a retriever.
    ///
    /// `timeout` bounds the whole transfer, `inactivity` bounds the gap between two chunks
    /// and `max_car_size` bounds the number of body bytes accepted.
    pub fn new(timeout: Duration, inactivity: Duration, max_car_size: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(Error::HttpClient)?;

        Ok(Self {
            client,
            timeout,
            inactivity,
            max_car_size,
        })
    }

    async fn transfer(
        &self,
        url: &str,
        request: &RetrievalRequest,
        started: Instant,
    ) -> std::result::Result<Transfer, RetrievalError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, CAR_MEDIA_TYPE)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body_prefix(response).await;
            return Err(RetrievalError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let mut file = tokio::fs::File::create(&request.scratch_path).await?;
        let mut hasher = Sha256::new();
        let mut stream = response.bytes_stream();
        let mut byte_length: u64 = 0;
        let mut time_to_first_byte = None;
        let mut car_too_large = false;

        loop {
            let next = match tokio::time::timeout(self.inactivity, stream.next()).await {
                Ok(next) => next,
                Err(_) => return Err(RetrievalError::Stalled(self.inactivity)),
            };
            let chunk = match next {
                Some(chunk) => chunk?,
                None => break,
            };

            if time_to_first_byte.is_none() {
                time_to_first_byte = Some(started.elapsed());
            }

            byte_length += chunk.len() as u64;
            if byte_length > self.max_car_size {
                tracing::warn!(
                    cid = %request.cid,
                    limit = self.max_car_size,
                    "CAR exceeded size limit, stopping transfer"
                );
                car_too_large = true;
                break;
            }

            hasher.update(&chunk);
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(Transfer {
            status_code: status.as_u16(),
            byte_length,
            time_to_first_byte: time_to_first_byte.unwrap_or_else(|| started.elapsed()),
            checksum: format!("{SHA256_MULTIHASH_PREFIX}{}", hex::encode(hasher.finalize())),
            car_too_large,
        })
    }
}

/// Read at most [`ERROR_BODY_LIMIT`] bytes of an error response, trimmed.
async fn error_body_prefix(response: reqwest::Response) -> String {
    let mut stream = response.bytes_stream();
    let mut body = Vec::new();
    while body.len() < ERROR_BODY_LIMIT {
        match stream.next().await {
            Some(Ok(chunk)) => {
                let take = chunk.len().min(ERROR_BODY_LIMIT - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            Some(Err(_)) | None => break,
        }
    }
    String::from_utf8_lossy(&body).trim().to_string()
}

#[async_trait::async_trait]
impl Retriever for HttpRetriever {
    async fn retrieve(
        &self,
        request: &RetrievalRequest,
    ) -> std::result::Result<RetrievalStats, RetrievalError> {
        let (address, base) = request
            .peer
            .addrs
            .iter()
            .find_map(|addr| match multiaddr_to_http_url(addr) {
                Ok(base) => Some((addr.clone(), base)),
                Err(e) => {
                    tracing::debug!(addr = %addr, error = %e, "skipping non-HTTP address");
                    None
                }
            })
            .ok_or_else(|| RetrievalError::NoSupportedAddress {
                peer_id: request.peer.peer_id.clone(),
                addrs: request.peer.addrs.clone(),
            })?;

        let url = retrieval_url(&base, &request.cid, &request.scope);
        tracing::debug!(cid = %request.cid, url = %url, "Starting HTTP retrieval");

        let start_time = Utc::now();
        let started = Instant::now();

        let transfer = match tokio::time::timeout(
            self.timeout,
            self.transfer(&url, request, started),
        )
        .await
        {
            Ok(Ok(transfer)) => transfer,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(RetrievalError::Timeout(self.timeout)),
        };

        let duration = started.elapsed();
        let secs = duration.as_secs_f64();
        let average_bandwidth = if secs > 0.0 {
            (transfer.byte_length as f64 / secs) as u64
        } else {
            transfer.byte_length
        };

        tracing::debug!(
            cid = %request.cid,
            bytes = transfer.byte_length,
            duration_ms = duration.as_millis() as u64,
            "HTTP retrieval complete"
        );

        Ok(RetrievalStats {
            root_cid: request.cid.to_string(),
            provider_id: request.peer.peer_id.clone(),
            provider_address: address,
            protocol: "http".to_string(),
            dag_scope: request.scope.dag_scope,
            status_code: transfer.status_code,
            byte_length: transfer.byte_length,
            time_to_first_byte_ms: transfer.time_to_first_byte.as_millis() as u64,
            duration_ms: duration.as_millis() as u64,
            average_bandwidth,
            car_checksum: transfer.checksum,
            car_too_large: transfer.car_too_large,
            start_time,
        })
    }
}
