//! Vector index seams
//!
//! INDEX regions carry an in-memory vector index with its own snapshot
//! lifecycle. The controller loads, drops, resizes, and snapshots indexes
//! through these traits; the index implementation lives behind them.

use std::sync::Arc;

use async_trait::async_trait;
use atoll_core::error::Result;
use atoll_core::region::RegionId;

/// A region's vector index. Index ids coincide with region ids.
pub trait VectorIndex: Send + Sync {
    fn id(&self) -> RegionId;

    /// HNSW view of the index, if it is one.
    fn as_hnsw(&self) -> Option<&dyn HnswIndex>;
}

/// HNSW-specific operations
pub trait HnswIndex: Send + Sync {
    fn max_elements(&self) -> Result<u64>;

    /// Grow the index capacity. Callers only ever grow; shrinking requests
    /// are a no-op upstream.
    fn resize_max_elements(&self, new_max_elements: u64) -> Result<()>;
}

/// Owner of the node's loaded vector indexes
#[async_trait]
pub trait VectorIndexManager: Send + Sync {
    fn get_vector_index(&self, region_id: RegionId) -> Option<Arc<dyn VectorIndex>>;

    /// Materialize the region's index from its snapshot or raw data.
    async fn load_or_build_vector_index(&self, region_id: RegionId) -> Result<()>;

    /// Drop the loaded index. Absent indexes are a no-op.
    fn delete_vector_index(&self, region_id: RegionId);

    /// Record the raft log index a fresh snapshot covers.
    fn update_snapshot_log_id(&self, index: Arc<dyn VectorIndex>, snapshot_log_index: u64);

    fn snapshot_manager(&self) -> Arc<dyn VectorIndexSnapshotManager>;
}

/// On-disk snapshot lifecycle of vector indexes
#[async_trait]
pub trait VectorIndexSnapshotManager: Send + Sync {
    /// Write a snapshot of the index, returning the raft log index it covers.
    async fn save_snapshot(&self, index: Arc<dyn VectorIndex>) -> Result<u64>;

    /// Remove every snapshot belonging to the region.
    fn delete_snapshots(&self, region_id: RegionId);
}
