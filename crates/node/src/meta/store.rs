//! Node-local durable meta store
//!
//! A thin RocksDB wrapper shared by the region meta, raft meta, and command
//! log families. All writes are synced; losing an acknowledged command or a
//! region state transition would break recovery.

use std::path::Path;
use std::sync::Arc;

use atoll_core::error::{Error, Result};
use rocksdb::{IteratorMode, Options, WriteOptions, DB};
use tracing::info;

/// RocksDB-backed key/value store for node metadata
pub struct MetaStore {
    db: Arc<DB>,
    path: String,
    sync_write_opts: WriteOptions,
}

impl MetaStore {
    /// Open (or create) the meta store at the specified path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_write_buffer_size(8 * 1024 * 1024);
        opts.set_max_write_buffer_number(2);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, &path_str)
            .map_err(|e| Error::internal(format!("open meta store {}: {}", path_str, e)))?;

        let mut sync_write_opts = WriteOptions::default();
        sync_write_opts.set_sync(true);

        info!("meta store opened at {}", path_str);

        Ok(Self {
            db: Arc::new(db),
            path: path_str,
            sync_write_opts,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db
            .put_opt(key, value, &self.sync_write_opts)
            .map_err(|e| Error::internal(format!("meta store put: {}", e)))
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db
            .get(key)
            .map_err(|e| Error::internal(format!("meta store get: {}", e)))
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .delete_opt(key, &self.sync_write_opts)
            .map_err(|e| Error::internal(format!("meta store delete: {}", e)))
    }

    /// All key/value pairs under the prefix, in key order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut rows = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(prefix, rocksdb::Direction::Forward));
        for item in iter {
            let (key, value) =
                item.map_err(|e| Error::internal(format!("meta store scan: {}", e)))?;
            if !key.starts_with(prefix) {
                break;
            }
            rows.push((key.to_vec(), value.to_vec()));
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path()).unwrap();

        store.put(b"a:1", b"one").unwrap();
        assert_eq!(store.get(b"a:1").unwrap(), Some(b"one".to_vec()));

        store.delete(b"a:1").unwrap();
        assert_eq!(store.get(b"a:1").unwrap(), None);
    }

    #[test]
    fn test_scan_prefix_is_bounded_and_ordered() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetaStore::open(dir.path()).unwrap();

        store.put(b"a:2", b"2").unwrap();
        store.put(b"a:1", b"1").unwrap();
        store.put(b"b:1", b"other").unwrap();

        let rows = store.scan_prefix(b"a:").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, b"a:1".to_vec());
        assert_eq!(rows[1].0, b"a:2".to_vec());
    }
}
