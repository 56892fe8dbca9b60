//! Shared fixture for region controller tests: mock engine seams plus a
//! fully wired service context over a temporary meta store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use atoll::controller::RegionController;
use atoll::engine::{EngineKind, RaftEngine, RaftNode, RawEngine, RawWriter, WriteData};
use atoll::engine::LogStorageManager;
use atoll::heartbeat::Heartbeat;
use atoll::meta::{CommandLog, MetaStore, RaftMeta, RaftMetaStore, RegionMetaStore};
use atoll::metrics::{RegionMetrics, RegionMetricsRegistry};
use atoll::peer_client::PeerClient;
use atoll::services::{NodeRole, Services};
use atoll::vector_index::{
    HnswIndex, VectorIndex, VectorIndexManager, VectorIndexSnapshotManager,
};
use atoll_core::command::{CmdRequest, CmdStatus, CreateRequest, RegionCmd};
use atoll_core::error::{Error, ErrorKind, Result};
use atoll_core::region::{
    HnswParameter, IndexParameter, Peer, PeerRole, RaftLocation, Region, RegionDefinition,
    RegionEpoch, RegionId, RegionRange, RegionType,
};

pub fn peer(store_id: u64) -> Peer {
    Peer {
        store_id,
        role: PeerRole::Voter,
        raft_location: RaftLocation {
            host: "127.0.0.1".to_string(),
            port: 20000 + store_id as u16,
        },
    }
}

#[derive(Clone)]
pub struct MockRaftNode {
    pub self_peer: Peer,
    pub leader: bool,
    pub peers: Vec<Peer>,
}

impl MockRaftNode {
    pub fn leader_node(store_id: u64) -> Self {
        let self_peer = peer(store_id);
        Self {
            self_peer: self_peer.clone(),
            leader: true,
            peers: vec![self_peer],
        }
    }

    pub fn with_peers(mut self, peers: Vec<Peer>) -> Self {
        self.peers = peers;
        self
    }

    pub fn follower(mut self) -> Self {
        self.leader = false;
        self
    }
}

impl RaftNode for MockRaftNode {
    fn is_leader(&self) -> bool {
        self.leader
    }

    fn leader(&self) -> Option<Peer> {
        if self.leader {
            Some(self.self_peer.clone())
        } else {
            self.peers.iter().find(|p| **p != self.self_peer).cloned()
        }
    }

    fn peer(&self) -> Peer {
        self.self_peer.clone()
    }

    fn list_peers(&self) -> Vec<Peer> {
        self.peers.clone()
    }
}

/// Raft engine that records every call and keeps an in-memory node map.
pub struct MockRaftEngine {
    store_id: u64,
    pub nodes: Mutex<HashMap<RegionId, Arc<MockRaftNode>>>,
    pub calls: Mutex<Vec<String>>,
}

impl MockRaftEngine {
    pub fn new(store_id: u64) -> Self {
        Self {
            store_id,
            nodes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_node(&self, region_id: RegionId, node: MockRaftNode) {
        self.nodes.lock().insert(region_id, Arc::new(node));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl RaftEngine for MockRaftEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::RaftStore
    }

    fn node(&self, region_id: RegionId) -> Option<Arc<dyn RaftNode>> {
        self.nodes
            .lock()
            .get(&region_id)
            .cloned()
            .map(|node| node as Arc<dyn RaftNode>)
    }

    async fn add_node(
        &self,
        region: &Region,
        _raft_meta: &RaftMeta,
        _metrics: Arc<RegionMetrics>,
    ) -> Result<()> {
        self.record(format!("add_node:{}", region.id()));
        self.set_node(region.id(), MockRaftNode::leader_node(self.store_id));
        Ok(())
    }

    async fn destroy_node(&self, region_id: RegionId) -> Result<()> {
        self.record(format!("destroy_node:{}", region_id));
        self.nodes.lock().remove(&region_id);
        Ok(())
    }

    async fn stop_node(&self, region_id: RegionId) -> Result<()> {
        self.record(format!("stop_node:{}", region_id));
        Ok(())
    }

    async fn change_node(&self, region_id: RegionId, voters: Vec<Peer>) -> Result<()> {
        let ids: Vec<u64> = voters.iter().map(|p| p.store_id).collect();
        self.record(format!("change_node:{}:{:?}", region_id, ids));
        Ok(())
    }

    async fn transfer_leader(&self, region_id: RegionId, peer: &Peer) -> Result<()> {
        self.record(format!("transfer_leader:{}:{}", region_id, peer.store_id));
        Ok(())
    }

    async fn do_snapshot(&self, region_id: RegionId) -> Result<()> {
        self.record(format!("do_snapshot:{}", region_id));
        Ok(())
    }

    async fn async_write(&self, region_id: RegionId, data: WriteData) -> Result<()> {
        match data {
            WriteData::Split {
                to_region_id: to, ..
            } => self.record(format!("async_write_split:{}:{}", region_id, to)),
        }
        Ok(())
    }
}

/// Raw engine recording deleted ranges.
#[derive(Default)]
pub struct MockRawEngine {
    pub deleted_ranges: Arc<Mutex<Vec<RegionRange>>>,
}

impl RawEngine for MockRawEngine {
    fn new_writer(&self, _cf: &str) -> Arc<dyn RawWriter> {
        Arc::new(MockRawWriter {
            deleted_ranges: self.deleted_ranges.clone(),
        })
    }
}

struct MockRawWriter {
    deleted_ranges: Arc<Mutex<Vec<RegionRange>>>,
}

impl RawWriter for MockRawWriter {
    fn kv_batch_delete_range(&self, range: &RegionRange) -> Result<()> {
        self.deleted_ranges.lock().push(range.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingLogStorage {
    pub deleted: Mutex<Vec<RegionId>>,
}

impl LogStorageManager for RecordingLogStorage {
    fn delete_storage(&self, region_id: RegionId) {
        self.deleted.lock().push(region_id);
    }
}

pub struct MockHnswIndex {
    id: RegionId,
    max_elements: Mutex<u64>,
    pub fail_resize: AtomicBool,
}

impl MockHnswIndex {
    pub fn new(id: RegionId, max_elements: u64) -> Self {
        Self {
            id,
            max_elements: Mutex::new(max_elements),
            fail_resize: AtomicBool::new(false),
        }
    }

    pub fn current_max(&self) -> u64 {
        *self.max_elements.lock()
    }
}

impl VectorIndex for MockHnswIndex {
    fn id(&self) -> RegionId {
        self.id
    }

    fn as_hnsw(&self) -> Option<&dyn HnswIndex> {
        Some(self)
    }
}

impl HnswIndex for MockHnswIndex {
    fn max_elements(&self) -> Result<u64> {
        Ok(*self.max_elements.lock())
    }

    fn resize_max_elements(&self, new_max_elements: u64) -> Result<()> {
        if self.fail_resize.load(Ordering::Relaxed) {
            return Err(Error::new(
                ErrorKind::VectorIndexInternal,
                "resize failed by test",
            ));
        }
        *self.max_elements.lock() = new_max_elements;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockSnapshotManager {
    next_log_index: AtomicU64,
    pub saved: Mutex<Vec<RegionId>>,
    pub deleted: Mutex<Vec<RegionId>>,
}

#[async_trait]
impl VectorIndexSnapshotManager for MockSnapshotManager {
    async fn save_snapshot(&self, index: Arc<dyn VectorIndex>) -> Result<u64> {
        self.saved.lock().push(index.id());
        Ok(self.next_log_index.fetch_add(1, Ordering::Relaxed) + 100)
    }

    fn delete_snapshots(&self, region_id: RegionId) {
        self.deleted.lock().push(region_id);
    }
}

pub struct MockVectorIndexManager {
    pub indexes: Mutex<HashMap<RegionId, Arc<MockHnswIndex>>>,
    pub snapshot_manager: Arc<MockSnapshotManager>,
    pub snapshot_log_ids: Mutex<HashMap<RegionId, u64>>,
    pub load_calls: Mutex<Vec<RegionId>>,
    pub deleted: Mutex<Vec<RegionId>>,
    pub fail_load: AtomicBool,
}

impl MockVectorIndexManager {
    pub fn new() -> Self {
        Self {
            indexes: Mutex::new(HashMap::new()),
            snapshot_manager: Arc::new(MockSnapshotManager::default()),
            snapshot_log_ids: Mutex::new(HashMap::new()),
            load_calls: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            fail_load: AtomicBool::new(false),
        }
    }

    pub fn insert_hnsw(&self, region_id: RegionId, max_elements: u64) -> Arc<MockHnswIndex> {
        let index = Arc::new(MockHnswIndex::new(region_id, max_elements));
        self.indexes.lock().insert(region_id, index.clone());
        index
    }
}

#[async_trait]
impl VectorIndexManager for MockVectorIndexManager {
    fn get_vector_index(&self, region_id: RegionId) -> Option<Arc<dyn VectorIndex>> {
        self.indexes
            .lock()
            .get(&region_id)
            .cloned()
            .map(|index| index as Arc<dyn VectorIndex>)
    }

    async fn load_or_build_vector_index(&self, region_id: RegionId) -> Result<()> {
        self.load_calls.lock().push(region_id);
        if self.fail_load.load(Ordering::Relaxed) {
            return Err(Error::new(
                ErrorKind::VectorIndexInternal,
                "load failed by test",
            ));
        }
        self.insert_hnsw(region_id, 1000);
        Ok(())
    }

    fn delete_vector_index(&self, region_id: RegionId) {
        self.indexes.lock().remove(&region_id);
        self.deleted.lock().push(region_id);
    }

    fn update_snapshot_log_id(&self, index: Arc<dyn VectorIndex>, snapshot_log_index: u64) {
        self.snapshot_log_ids
            .lock()
            .insert(index.id(), snapshot_log_index);
    }

    fn snapshot_manager(&self) -> Arc<dyn VectorIndexSnapshotManager> {
        self.snapshot_manager.clone()
    }
}

#[derive(Default)]
pub struct RecordingHeartbeat {
    pub triggers: Mutex<Vec<RegionId>>,
}

impl Heartbeat for RecordingHeartbeat {
    fn trigger_store_heartbeat(&self, region_id: RegionId) {
        self.triggers.lock().push(region_id);
    }
}

/// Peer client answering from a per-location table, `default` otherwise.
pub struct MockPeerClient {
    pub responses: Mutex<HashMap<String, bool>>,
    pub default: AtomicBool,
}

impl MockPeerClient {
    pub fn answering(default: bool) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            default: AtomicBool::new(default),
        }
    }
}

#[async_trait]
impl PeerClient for MockPeerClient {
    async fn check_vector_index(
        &self,
        _vector_index_id: RegionId,
        location: &RaftLocation,
    ) -> Result<bool> {
        let responses = self.responses.lock();
        Ok(responses
            .get(&location.to_string())
            .copied()
            .unwrap_or(self.default.load(Ordering::Relaxed)))
    }
}

pub const STORE_ID: u64 = 1;

pub struct Fixture {
    pub dir: TempDir,
    pub services: Arc<Services>,
    pub controller: Arc<RegionController>,
    pub engine: Arc<MockRaftEngine>,
    pub raw_engine: Arc<MockRawEngine>,
    pub log_storage: Arc<RecordingLogStorage>,
    pub vector_index: Arc<MockVectorIndexManager>,
    pub heartbeat: Arc<RecordingHeartbeat>,
    pub peer_client: Arc<MockPeerClient>,
}

impl Fixture {
    pub fn new(role: NodeRole) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        Self::open_at(dir, role)
    }

    /// Wire a controller over (possibly pre-existing) meta state in `dir`.
    pub fn open_at(dir: TempDir, role: NodeRole) -> Self {
        let store = Arc::new(MetaStore::open(dir.path().join("meta")).expect("open meta store"));
        let region_meta = Arc::new(RegionMetaStore::new(store.clone()));
        region_meta.init().expect("init region meta");
        let raft_meta = Arc::new(RaftMetaStore::new(store.clone()));
        raft_meta.init().expect("init raft meta");
        let command_log = Arc::new(CommandLog::new(store));
        command_log.init().expect("init command log");

        let engine = Arc::new(MockRaftEngine::new(STORE_ID));
        let raw_engine = Arc::new(MockRawEngine::default());
        let log_storage = Arc::new(RecordingLogStorage::default());
        let vector_index = Arc::new(MockVectorIndexManager::new());
        let heartbeat = Arc::new(RecordingHeartbeat::default());
        let peer_client = Arc::new(MockPeerClient::answering(true));

        let services = Arc::new(Services::new(
            STORE_ID,
            role,
            region_meta,
            raft_meta,
            command_log,
            engine.clone(),
            raw_engine.clone(),
            log_storage.clone(),
            Some(vector_index.clone()),
            heartbeat.clone(),
            peer_client.clone(),
            Arc::new(RegionMetricsRegistry::new()),
        ));

        let controller = RegionController::new(services.clone());
        controller.init();

        Self {
            dir,
            services,
            controller,
            engine,
            raw_engine,
            log_storage,
            vector_index,
            heartbeat,
            peer_client,
        }
    }

    /// Drain executors and release the store, keeping the data directory.
    pub async fn shutdown(self) -> TempDir {
        self.controller.destroy().await;
        let Fixture { dir, .. } = self;
        dir
    }

    pub async fn wait_for_status(&self, cmd_id: u64, want: CmdStatus) -> RegionCmd {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(cmd) = self.services.command_log.get_command(cmd_id) {
                if cmd.status == want {
                    return cmd;
                }
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "timeout waiting for command {} to reach {:?}, log: {:?}",
                    cmd_id,
                    want,
                    self.services.command_log.get_command(cmd_id)
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_until(&self, what: &str, check: impl Fn() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !check() {
            if tokio::time::Instant::now() > deadline {
                panic!("timeout waiting until {}", what);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub fn definition(region_id: RegionId, region_type: RegionType) -> RegionDefinition {
    let hnsw = match region_type {
        RegionType::Index => Some(HnswParameter {
            dimension: 128,
            max_elements: 1000,
            ef_construction: 200,
            max_links: 16,
        }),
        RegionType::Store => None,
    };
    RegionDefinition {
        id: region_id,
        epoch: RegionEpoch::new(1, 1),
        range: RegionRange::new(vec![0x01], vec![0x20]),
        raw_range: RegionRange::new(vec![0x01], vec![0x20]),
        region_type,
        peers: vec![peer(STORE_ID)],
        index_parameter: IndexParameter { hnsw },
    }
}

pub fn create_cmd(cmd_id: u64, region_id: RegionId, region_type: RegionType) -> RegionCmd {
    RegionCmd::new(
        cmd_id,
        region_id,
        1,
        CmdRequest::Create(CreateRequest {
            region_definition: definition(region_id, region_type),
            split_from_region_id: 0,
        }),
    )
    .with_notify()
}

pub fn create_child_cmd(
    cmd_id: u64,
    region_id: RegionId,
    parent_id: RegionId,
    region_type: RegionType,
) -> RegionCmd {
    RegionCmd::new(
        cmd_id,
        region_id,
        1,
        CmdRequest::Create(CreateRequest {
            region_definition: definition(region_id, region_type),
            split_from_region_id: parent_id,
        }),
    )
}
