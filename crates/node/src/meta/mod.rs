//! Node-local meta stores
//!
//! Region descriptors, raft bookkeeping, and the command log, all persisted
//! write-through to one RocksDB instance under fixed key prefixes.

pub mod command_log;
pub mod keys;
pub mod raft_meta;
pub mod region_meta;
pub mod store;

pub use command_log::CommandLog;
pub use raft_meta::{RaftMeta, RaftMetaStore};
pub use region_meta::RegionMetaStore;
pub use store::MetaStore;
