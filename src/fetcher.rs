//! Single-peer content fetch with per-invocation scratch space.

use crate::content_id::ContentId;
use crate::error::CheckError;
use crate::retrieval::{RetrievalRequest, Retriever};
use crate::types::{FetchScope, ResolvedPeer, RetrievalStats};
use std::path::PathBuf;
use std::sync::Arc;

/// Fetches content from exactly one resolved peer.
///
/// Every call gets its own temporary directory, removed when the call returns, so concurrent
/// fetches never share scratch state.
#[derive(Clone)]
pub struct ContentFetcher {
    retriever: Arc<dyn Retriever>,
    scope: FetchScope,
    scratch_root: Option<PathBuf>,
}

impl ContentFetcher {
    /// Create a fetcher using the system temp directory for scratch space.
    pub fn new(retriever: Arc<dyn Retriever>, scope: FetchScope) -> Self {
        Self {
            retriever,
            scope,
            scratch_root: None,
        }
    }

    /// Place scratch directories under `root` instead of the system temp directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Retrieve `cid` from `peer`.
    pub async fn fetch(
        &self,
        cid: &ContentId,
        peer: ResolvedPeer,
    ) -> Result<RetrievalStats, CheckError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("spark-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| CheckError::Fetch(e.into()))?;

        let request = RetrievalRequest {
            cid: *cid,
            peer,
            scope: self.scope,
            scratch_path: scratch.path().join("content.car"),
        };

        let result = self.retriever.retrieve(&request).await;
        if let Err(e) = scratch.close() {
            tracing::warn!(error = %e, "failed to remove retrieval scratch directory");
        }

        Ok(result?)
    }
}
