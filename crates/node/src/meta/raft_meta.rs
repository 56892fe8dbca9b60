//! Raft meta store
//!
//! Per-region raft bookkeeping (term, applied index) allocated when a raft
//! node is added and removed when the region is deleted. The replication
//! engine owns the values; the controller only manages the rows' lifecycle.

use std::collections::BTreeMap;
use std::sync::Arc;

use atoll_core::error::{Error, Result};
use atoll_core::region::RegionId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::meta::keys;
use crate::meta::store::MetaStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaftMeta {
    pub region_id: RegionId,
    pub term: u64,
    pub applied_index: u64,
}

impl RaftMeta {
    pub fn new(region_id: RegionId) -> Self {
        Self {
            region_id,
            term: 0,
            applied_index: 0,
        }
    }
}

pub struct RaftMetaStore {
    store: Arc<MetaStore>,
    metas: Mutex<BTreeMap<RegionId, RaftMeta>>,
}

impl RaftMetaStore {
    pub fn new(store: Arc<MetaStore>) -> Self {
        Self {
            store,
            metas: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn init(&self) -> Result<()> {
        let rows = self.store.scan_prefix(keys::prefix::RAFT_META)?;
        let mut metas = self.metas.lock();
        for (key, value) in rows {
            let Some(region_id) = keys::parse_raft_meta_region_id(&key) else {
                warn!("skip malformed raft meta key {:?}", key);
                continue;
            };
            let (meta, _): (RaftMeta, usize) =
                bincode::serde::decode_from_slice(&value, bincode::config::standard())
                    .map_err(|e| Error::internal(format!("decode raft meta {}: {}", region_id, e)))?;
            metas.insert(region_id, meta);
        }
        Ok(())
    }

    pub fn add_raft_meta(&self, meta: RaftMeta) -> Result<()> {
        let value = bincode::serde::encode_to_vec(&meta, bincode::config::standard())
            .map_err(|e| Error::internal(format!("encode raft meta {}: {}", meta.region_id, e)))?;
        self.store.put(&keys::raft_meta_key(meta.region_id), &value)?;
        self.metas.lock().insert(meta.region_id, meta);
        Ok(())
    }

    pub fn get_raft_meta(&self, region_id: RegionId) -> Option<RaftMeta> {
        self.metas.lock().get(&region_id).cloned()
    }

    pub fn delete_raft_meta(&self, region_id: RegionId) -> Result<()> {
        self.store.delete(&keys::raft_meta_key(region_id))?;
        self.metas.lock().remove(&region_id);
        Ok(())
    }
}
