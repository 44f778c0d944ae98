//! Shared in-memory collaborators for unit tests.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::address::Address;
use crate::chain::ChainClient;
use crate::content_id::ContentId;
use crate::error::{ChainError, IndexError, RetrievalError};
use crate::ipni::IndexClient;
use crate::retrieval::{RetrievalRequest, Retriever};
use crate::types::{ResolvedPeer, RetrievalStats, RetrievalTask, Round};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) const CID_A: &str = "bafkreih25dih6ug3xtj73vswccw423b56ilrwmnos4cbwhrceudopdp5sq";
pub(crate) const CID_B: &str = "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi";
pub(crate) const PEER_ID: &str = "12D3KooWC8gXxg9LoJ9h3hy3jzBkEAxamyHEQJKtRmAuBuvoMzpr";
pub(crate) const OTHER_PEER_ID: &str = "12D3KooWHKeaNCnYByQUMS2n5PAZ1KZ9xKXqsb4bhpxVJ6bBJg5V";

pub(crate) fn task(cid: &str, miner_id: &str) -> RetrievalTask {
    RetrievalTask {
        cid: cid.to_string(),
        miner_id: miner_id.to_string(),
        clients: vec![],
    }
}

pub(crate) fn round(tasks: Vec<RetrievalTask>) -> Round {
    Round {
        round_id: "42".to_string(),
        start_epoch: "4000000".to_string(),
        max_tasks_per_node: 15,
        retrieval_tasks: tasks,
    }
}

pub(crate) fn peer(peer_id: &str) -> ResolvedPeer {
    ResolvedPeer {
        peer_id: peer_id.to_string(),
        addrs: vec!["/dns/frisbii.fly.dev/tcp/443/https".to_string()],
    }
}

/// Chain fake mapping miner addresses to peer ids; unknown miners fail like a missing actor.
#[derive(Default)]
pub(crate) struct FakeChain {
    peers: HashMap<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeChain {
    pub(crate) fn with_peer(mut self, miner: &str, peer_id: &str) -> Self {
        self.peers.insert(miner.to_string(), peer_id.to_string());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ChainClient for FakeChain {
    async fn miner_peer_id(&self, miner: &Address) -> Result<String, ChainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.peers
            .get(&miner.to_string())
            .cloned()
            .ok_or_else(|| ChainError::Rpc {
                code: 1,
                message: format!("actor {miner} not found"),
            })
    }
}

/// Index fake keyed by multihash, so CIDv0 and CIDv1 of the same content share providers.
#[derive(Default)]
pub(crate) struct FakeIndex {
    providers: HashMap<String, Vec<ResolvedPeer>>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeIndex {
    pub(crate) fn with_providers(mut self, cid: &str, peers: Vec<ResolvedPeer>) -> Self {
        let cid: ContentId = cid.parse().unwrap();
        self.providers.insert(cid.multihash_b58(), peers);
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IndexClient for FakeIndex {
    async fn find_providers(&self, cid: &ContentId) -> Result<Vec<ResolvedPeer>, IndexError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(IndexError::Status(503));
        }
        Ok(self
            .providers
            .get(&cid.multihash_b58())
            .cloned()
            .unwrap_or_default())
    }
}

/// Retriever fake that writes a few bytes to the scratch file and reports fixed stats.
#[derive(Default)]
pub(crate) struct FakeRetriever {
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    scratch_paths: Mutex<Vec<PathBuf>>,
}

impl FakeRetriever {
    pub(crate) fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn scratch_paths(&self) -> Vec<PathBuf> {
        self.scratch_paths.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Retriever for FakeRetriever {
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<RetrievalStats, RetrievalError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scratch_paths
            .lock()
            .unwrap()
            .push(request.scratch_path.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            return Err(RetrievalError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }

        tokio::fs::write(&request.scratch_path, b"car").await?;

        Ok(RetrievalStats {
            root_cid: request.cid.to_string(),
            provider_id: request.peer.peer_id.clone(),
            provider_address: request.peer.addrs.first().cloned().unwrap_or_default(),
            protocol: "fake".to_string(),
            dag_scope: request.scope.dag_scope,
            status_code: 200,
            byte_length: 3,
            time_to_first_byte_ms: 1,
            duration_ms: 1,
            average_bandwidth: 3000,
            car_checksum: "1220".to_string(),
            car_too_large: false,
            start_time: Utc::now(),
        })
    }
}
