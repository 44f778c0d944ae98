//! Provider peer resolution: miner address → chain peer id → IPNI advertisement.

use crate::address::Address;
use crate::chain::ChainClient;
use crate::content_id::ContentId;
use crate::error::CheckError;
use crate::ipni::IndexClient;
use crate::types::ResolvedPeer;
use std::sync::Arc;

/// Resolves the peer a storage provider serves a piece of content from.
#[derive(Clone)]
pub struct ProviderResolver {
    chain: Arc<dyn ChainClient>,
    index: Arc<dyn IndexClient>,
}

impl ProviderResolver {
    /// Create a resolver over the given chain and index collaborators.
    pub fn new(chain: Arc<dyn ChainClient>, index: Arc<dyn IndexClient>) -> Self {
        Self { chain, index }
    }

    /// Find the advertisement of `cid` made by the peer registered on chain for `provider_id`.
    ///
    /// Returns `Ok(None)` when the index has candidates (or none) but none of them is the
    /// provider's own peer. A malformed `provider_id` fails before any query is made.
    pub async fn resolve(
        &self,
        provider_id: &str,
        cid: &ContentId,
    ) -> Result<Option<ResolvedPeer>, CheckError> {
        let miner: Address = provider_id.parse()?;

        let peer_id = self.chain.miner_peer_id(&miner).await?;
        tracing::debug!(miner_id = %miner, peer_id = %peer_id, "Resolved miner peer id");

        let candidates = self.index.find_providers(cid).await?;
        let candidate_count = candidates.len();

        let found = candidates.into_iter().find(|p| p.peer_id == peer_id);
        if found.is_none() {
            tracing::debug!(
                miner_id = %miner,
                peer_id = %peer_id,
                cid = %cid,
                candidates = candidate_count,
                "Miner peer does not advertise content"
            );
        }

        Ok(found)
    }
}
