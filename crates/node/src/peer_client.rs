//! Cross-peer node client
//!
//! Before an INDEX region may split, every follower must prove it holds the
//! region's vector index; the controller asks through this seam. The RPC
//! transport lives behind it.

use async_trait::async_trait;
use atoll_core::error::Result;
use atoll_core::region::{RaftLocation, RegionId};

#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Ask the peer at `location` whether it holds the vector index.
    async fn check_vector_index(
        &self,
        vector_index_id: RegionId,
        location: &RaftLocation,
    ) -> Result<bool>;
}

/// Peer client for standalone nodes: there are no peers to ask.
#[derive(Debug, Default)]
pub struct LocalPeerClient;

#[async_trait]
impl PeerClient for LocalPeerClient {
    async fn check_vector_index(
        &self,
        _vector_index_id: RegionId,
        _location: &RaftLocation,
    ) -> Result<bool> {
        Ok(true)
    }
}
