//! Replication and raw-storage engine seams
//!
//! The controller drives region lifecycles through these traits; the raft
//! implementation and the raw storage engine live behind them. Handlers
//! consult `RaftEngine::kind` before raft-only steps, mirroring a node that
//! can also run without replication.

use std::sync::Arc;

use async_trait::async_trait;
use atoll_core::error::{Error, Result};
use atoll_core::region::{Peer, Region, RegionId, RegionRange};
use tracing::debug;

use crate::meta::RaftMeta;
use crate::metrics::RegionMetrics;

/// Column family holding region data in the raw engine
pub const STORE_DATA_CF: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Raft-replicated store
    RaftStore,
    /// Single-process store without replication
    Local,
}

/// Handle to one region's raft node
pub trait RaftNode: Send + Sync {
    fn is_leader(&self) -> bool;
    /// Current leader, if known
    fn leader(&self) -> Option<Peer>;
    /// This node's own peer identity in the group
    fn peer(&self) -> Peer;
    fn list_peers(&self) -> Vec<Peer>;
}

/// Replicated payloads submitted through the engine's log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteData {
    Split {
        from_region_id: RegionId,
        to_region_id: RegionId,
        watershed_key: Vec<u8>,
    },
}

/// The replication engine
#[async_trait]
pub trait RaftEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    fn is_raft_store(&self) -> bool {
        self.kind() == EngineKind::RaftStore
    }

    fn node(&self, region_id: RegionId) -> Option<Arc<dyn RaftNode>>;

    /// Start a raft node for the region.
    async fn add_node(
        &self,
        region: &Region,
        raft_meta: &RaftMeta,
        metrics: Arc<RegionMetrics>,
    ) -> Result<()>;

    /// Tear down the raft node and its replicated state. Absent nodes are a
    /// no-op so DELETE can be re-driven after a crash.
    async fn destroy_node(&self, region_id: RegionId) -> Result<()>;

    /// Stop the raft node without deleting data (ORPHAN handling).
    async fn stop_node(&self, region_id: RegionId) -> Result<()>;

    /// Reconfigure the group to the given voter set.
    async fn change_node(&self, region_id: RegionId, voters: Vec<Peer>) -> Result<()>;

    async fn transfer_leader(&self, region_id: RegionId, peer: &Peer) -> Result<()>;

    async fn do_snapshot(&self, region_id: RegionId) -> Result<()>;

    /// Submit a payload to the region's replicated log. Returns once the
    /// entry is accepted for replication; apply happens on the engine's side.
    async fn async_write(&self, region_id: RegionId, data: WriteData) -> Result<()>;
}

/// Writer into one column family of the raw storage engine
pub trait RawWriter: Send + Sync {
    /// Delete every key in `[range.start_key, range.end_key)`. Deleting an
    /// already-empty range is a no-op.
    fn kv_batch_delete_range(&self, range: &RegionRange) -> Result<()>;
}

/// The raw storage engine underneath the state machines
pub trait RawEngine: Send + Sync {
    fn new_writer(&self, cf: &str) -> Arc<dyn RawWriter>;
}

/// Per-region raft log storage lifecycle
pub trait LogStorageManager: Send + Sync {
    fn delete_storage(&self, region_id: RegionId);
}

/// No-replication engine for standalone nodes.
///
/// Raft-guarded controller steps are skipped when `kind()` is not
/// `RaftStore`, so the replication entry points here only reject calls that
/// would need a raft group.
#[derive(Debug, Default)]
pub struct LocalEngine;

#[async_trait]
impl RaftEngine for LocalEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Local
    }

    fn node(&self, _region_id: RegionId) -> Option<Arc<dyn RaftNode>> {
        None
    }

    async fn add_node(
        &self,
        _region: &Region,
        _raft_meta: &RaftMeta,
        _metrics: Arc<RegionMetrics>,
    ) -> Result<()> {
        Err(Error::internal("local engine has no raft nodes"))
    }

    async fn destroy_node(&self, _region_id: RegionId) -> Result<()> {
        Err(Error::internal("local engine has no raft nodes"))
    }

    async fn stop_node(&self, _region_id: RegionId) -> Result<()> {
        Err(Error::internal("local engine has no raft nodes"))
    }

    async fn change_node(&self, _region_id: RegionId, _voters: Vec<Peer>) -> Result<()> {
        Err(Error::internal("local engine has no raft nodes"))
    }

    async fn transfer_leader(&self, _region_id: RegionId, _peer: &Peer) -> Result<()> {
        Err(Error::internal("local engine has no raft nodes"))
    }

    async fn do_snapshot(&self, region_id: RegionId) -> Result<()> {
        debug!("local engine: nothing to snapshot for region {}", region_id);
        Ok(())
    }

    async fn async_write(&self, _region_id: RegionId, _data: WriteData) -> Result<()> {
        Err(Error::internal("local engine has no replicated log"))
    }
}

/// Log storage stub for engines without per-region raft logs.
#[derive(Debug, Default)]
pub struct NoopLogStorage;

impl LogStorageManager for NoopLogStorage {
    fn delete_storage(&self, region_id: RegionId) {
        debug!("no log storage to delete for region {}", region_id);
    }
}

/// RocksDB-backed raw engine used by standalone nodes. Everything lives in
/// the default column family.
pub struct RocksRawEngine {
    db: Arc<rocksdb::DB>,
}

impl RocksRawEngine {
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let mut opts = rocksdb::Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        let db = rocksdb::DB::open(&opts, &path_str)
            .map_err(|e| Error::internal(format!("open raw engine {}: {}", path_str, e)))?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl RawEngine for RocksRawEngine {
    fn new_writer(&self, _cf: &str) -> Arc<dyn RawWriter> {
        Arc::new(RocksRawWriter {
            db: self.db.clone(),
        })
    }
}

struct RocksRawWriter {
    db: Arc<rocksdb::DB>,
}

impl RawWriter for RocksRawWriter {
    fn kv_batch_delete_range(&self, range: &RegionRange) -> Result<()> {
        let mut batch = rocksdb::WriteBatch::default();
        batch.delete_range(&range.start_key, &range.end_key);
        let mut opts = rocksdb::WriteOptions::default();
        opts.set_sync(true);
        self.db
            .write_opt(batch, &opts)
            .map_err(|e| Error::internal(format!("delete range {}: {}", range, e)))
    }
}
