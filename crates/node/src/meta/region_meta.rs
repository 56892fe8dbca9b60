//! Region meta store
//!
//! Durable map of region id to region descriptor. Mutations serialize on an
//! internal mutex and persist write-through before the in-memory map is
//! updated; readers get shared immutable snapshots.

use std::collections::BTreeMap;
use std::sync::Arc;

use atoll_core::error::{Error, ErrorKind, Result};
use atoll_core::region::{Region, RegionId, RegionState};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::meta::keys;
use crate::meta::store::MetaStore;

pub struct RegionMetaStore {
    store: Arc<MetaStore>,
    regions: Mutex<BTreeMap<RegionId, Arc<Region>>>,
}

impl RegionMetaStore {
    pub fn new(store: Arc<MetaStore>) -> Self {
        Self {
            store,
            regions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Hydrate the in-memory map from the persisted region rows.
    pub fn init(&self) -> Result<()> {
        let rows = self.store.scan_prefix(keys::prefix::REGION)?;
        let mut regions = self.regions.lock();
        for (key, value) in rows {
            let Some(region_id) = keys::parse_region_id(&key) else {
                warn!("skip malformed region meta key {:?}", key);
                continue;
            };
            let (region, _): (Region, usize) =
                bincode::serde::decode_from_slice(&value, bincode::config::standard())
                    .map_err(|e| Error::internal(format!("decode region {}: {}", region_id, e)))?;
            regions.insert(region_id, Arc::new(region));
        }
        debug!("region meta loaded {} regions", regions.len());
        Ok(())
    }

    fn persist(&self, region: &Region) -> Result<()> {
        let value = bincode::serde::encode_to_vec(region, bincode::config::standard())
            .map_err(|e| Error::internal(format!("encode region {}: {}", region.id(), e)))?;
        self.store.put(&keys::region_key(region.id()), &value)
    }

    pub fn get_region(&self, region_id: RegionId) -> Option<Arc<Region>> {
        self.regions.lock().get(&region_id).cloned()
    }

    /// Persist and index a new region. The range must be well formed.
    pub fn add_region(&self, region: Region) -> Result<Arc<Region>> {
        if !region.range().is_valid() || !region.raw_range().is_valid() {
            return Err(Error::new(
                ErrorKind::IllegalParameters,
                format!("region {} range is invalid", region.id()),
            ));
        }
        self.persist(&region)?;
        let region = Arc::new(region);
        self.regions.lock().insert(region.id(), region.clone());
        Ok(region)
    }

    /// Persist a modified region snapshot, replacing the indexed one.
    pub fn update_region(&self, region: Region) -> Result<Arc<Region>> {
        self.persist(&region)?;
        let region = Arc::new(region);
        self.regions.lock().insert(region.id(), region.clone());
        Ok(region)
    }

    /// Transition a region to a new state and persist it.
    pub fn update_state(&self, region_id: RegionId, state: RegionState) -> Result<Arc<Region>> {
        let current = self
            .get_region(region_id)
            .ok_or_else(|| Error::region_not_found(region_id))?;
        debug!(
            "region {} state {} -> {}",
            region_id,
            current.state(),
            state
        );
        let mut updated = (*current).clone();
        updated.state = state;
        self.update_region(updated)
    }

    /// Toggle the split switch. In-memory only: the switch is advisory and
    /// the coordinator re-issues it after a restart.
    pub fn set_disable_split(&self, region_id: RegionId, disable_split: bool) -> Result<()> {
        let mut regions = self.regions.lock();
        let current = regions
            .get(&region_id)
            .ok_or_else(|| Error::region_not_found(region_id))?;
        let mut updated = (**current).clone();
        updated.disable_split = disable_split;
        regions.insert(region_id, Arc::new(updated));
        Ok(())
    }

    pub fn delete_region(&self, region_id: RegionId) -> Result<()> {
        self.store.delete(&keys::region_key(region_id))?;
        self.regions.lock().remove(&region_id);
        Ok(())
    }

    /// Regions that have not reached DELETED, ascending by id.
    pub fn all_alive_regions(&self) -> Vec<Arc<Region>> {
        self.regions
            .lock()
            .values()
            .filter(|region| region.state() != RegionState::Deleted)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use atoll_core::region::{IndexParameter, RegionDefinition, RegionEpoch, RegionRange, RegionType};

    use super::*;

    fn region(id: RegionId) -> Region {
        Region::new(RegionDefinition {
            id,
            epoch: RegionEpoch::default(),
            range: RegionRange::new(vec![0x01], vec![0x10]),
            raw_range: RegionRange::new(vec![0x01], vec![0x10]),
            region_type: RegionType::Store,
            peers: Vec::new(),
            index_parameter: IndexParameter::default(),
        })
    }

    fn open(dir: &tempfile::TempDir) -> RegionMetaStore {
        let store = Arc::new(MetaStore::open(dir.path()).unwrap());
        let meta = RegionMetaStore::new(store);
        meta.init().unwrap();
        meta
    }

    #[test]
    fn test_add_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let meta = open(&dir);

        meta.add_region(region(100)).unwrap();
        assert_eq!(meta.get_region(100).unwrap().state(), RegionState::New);

        meta.update_state(100, RegionState::Normal).unwrap();
        assert_eq!(meta.get_region(100).unwrap().state(), RegionState::Normal);

        meta.delete_region(100).unwrap();
        assert!(meta.get_region(100).is_none());
    }

    #[test]
    fn test_add_rejects_invalid_range() {
        let dir = tempfile::tempdir().unwrap();
        let meta = open(&dir);

        let mut bad = region(7);
        bad.definition.range = RegionRange::new(vec![0x10], vec![0x01]);
        let err = meta.add_region(bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IllegalParameters);
    }

    #[test]
    fn test_alive_excludes_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let meta = open(&dir);

        meta.add_region(region(1)).unwrap();
        meta.add_region(region(2)).unwrap();
        meta.update_state(2, RegionState::Deleted).unwrap();

        let alive = meta.all_alive_regions();
        assert_eq!(alive.len(), 1);
        assert_eq!(alive[0].id(), 1);
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let meta = open(&dir);
            meta.add_region(region(5)).unwrap();
            meta.update_state(5, RegionState::Deleting).unwrap();
        }
        let meta = open(&dir);
        assert_eq!(meta.get_region(5).unwrap().state(), RegionState::Deleting);
    }

    #[test]
    fn test_disable_split_is_in_memory_only() {
        let dir = tempfile::tempdir().unwrap();
        {
            let meta = open(&dir);
            meta.add_region(region(9)).unwrap();
            meta.set_disable_split(9, true).unwrap();
            assert!(meta.get_region(9).unwrap().disable_split);
        }
        let meta = open(&dir);
        assert!(!meta.get_region(9).unwrap().disable_split);
    }
}
