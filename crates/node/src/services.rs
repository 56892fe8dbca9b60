//! Node service context
//!
//! One explicit bundle of the subsystems region-control handlers touch:
//! meta stores, command log, engines, vector-index manager, heartbeat,
//! metrics. Passed by `Arc` instead of living in a process-global, so tests
//! can wire mock seams per fixture.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::controller::RegionController;
use crate::engine::{LogStorageManager, RaftEngine, RawEngine};
use crate::heartbeat::Heartbeat;
use crate::meta::{CommandLog, RaftMetaStore, RegionMetaStore};
use crate::metrics::RegionMetricsRegistry;
use crate::peer_client::PeerClient;
use crate::vector_index::VectorIndexManager;

/// Role this node plays in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Plain key/value regions
    Store,
    /// Vector-index regions
    Index,
}

pub struct Services {
    /// This store's id, as known to the coordinator
    pub store_id: u64,
    pub role: NodeRole,
    pub region_meta: Arc<RegionMetaStore>,
    pub raft_meta: Arc<RaftMetaStore>,
    pub command_log: Arc<CommandLog>,
    pub engine: Arc<dyn RaftEngine>,
    pub raw_engine: Arc<dyn RawEngine>,
    pub log_storage: Arc<dyn LogStorageManager>,
    /// Present on INDEX nodes
    pub vector_index: Option<Arc<dyn VectorIndexManager>>,
    pub heartbeat: Arc<dyn Heartbeat>,
    pub peer_client: Arc<dyn PeerClient>,
    pub metrics: Arc<RegionMetricsRegistry>,
    /// Late-bound: the controller is built on top of this context
    controller: RwLock<Option<Weak<RegionController>>>,
}

impl Services {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store_id: u64,
        role: NodeRole,
        region_meta: Arc<RegionMetaStore>,
        raft_meta: Arc<RaftMetaStore>,
        command_log: Arc<CommandLog>,
        engine: Arc<dyn RaftEngine>,
        raw_engine: Arc<dyn RawEngine>,
        log_storage: Arc<dyn LogStorageManager>,
        vector_index: Option<Arc<dyn VectorIndexManager>>,
        heartbeat: Arc<dyn Heartbeat>,
        peer_client: Arc<dyn PeerClient>,
        metrics: Arc<RegionMetricsRegistry>,
    ) -> Self {
        Self {
            store_id,
            role,
            region_meta,
            raft_meta,
            command_log,
            engine,
            raw_engine,
            log_storage,
            vector_index,
            heartbeat,
            peer_client,
            metrics,
            controller: RwLock::new(None),
        }
    }

    /// Bind the controller back-reference after construction.
    pub fn set_region_controller(&self, controller: &Arc<RegionController>) {
        *self.controller.write() = Some(Arc::downgrade(controller));
    }

    pub fn region_controller(&self) -> Option<Arc<RegionController>> {
        self.controller.read().as_ref().and_then(Weak::upgrade)
    }

    pub fn is_index_node(&self) -> bool {
        self.role == NodeRole::Index
    }
}
