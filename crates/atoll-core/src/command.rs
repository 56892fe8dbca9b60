//! Region-control commands
//!
//! The coordinator drives region lifecycles by sending `RegionCmd` records to
//! store nodes. Commands are uniquely identified, persisted before execution,
//! and processed at least once, so every handler must be idempotent.

use serde::{Deserialize, Serialize};

use crate::region::{Peer, RegionDefinition, RegionId};

/// Command kind, one per handler. Names are wire stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionCmdKind {
    Create,
    Delete,
    Split,
    Merge,
    ChangePeer,
    TransferLeader,
    Snapshot,
    Purge,
    Stop,
    DestroyExecutor,
    SnapshotVectorIndex,
    UpdateDefinition,
    SwitchSplit,
    HoldVectorIndex,
}

impl std::fmt::Display for RegionCmdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RegionCmdKind::Create => "CREATE",
            RegionCmdKind::Delete => "DELETE",
            RegionCmdKind::Split => "SPLIT",
            RegionCmdKind::Merge => "MERGE",
            RegionCmdKind::ChangePeer => "CHANGE_PEER",
            RegionCmdKind::TransferLeader => "TRANSFER_LEADER",
            RegionCmdKind::Snapshot => "SNAPSHOT",
            RegionCmdKind::Purge => "PURGE",
            RegionCmdKind::Stop => "STOP",
            RegionCmdKind::DestroyExecutor => "DESTROY_EXECUTOR",
            RegionCmdKind::SnapshotVectorIndex => "SNAPSHOT_VECTOR_INDEX",
            RegionCmdKind::UpdateDefinition => "UPDATE_DEFINITION",
            RegionCmdKind::SwitchSplit => "SWITCH_SPLIT",
            RegionCmdKind::HoldVectorIndex => "HOLD_VECTOR_INDEX",
        };
        write!(f, "{}", name)
    }
}

/// Execution status of a persisted command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmdStatus {
    /// Accepted, not finished; re-dispatched on restart
    #[default]
    None,
    Done,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub region_definition: RegionDefinition,
    /// Non-zero when this region is the child of a pending split
    pub split_from_region_id: RegionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub region_id: RegionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRequest {
    pub split_from_region_id: RegionId,
    pub split_to_region_id: RegionId,
    /// Physical key at which the parent range is cut
    pub split_watershed_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePeerRequest {
    /// Full new definition; the voter set is derived from its peers
    pub region_definition: RegionDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLeaderRequest {
    pub peer: Peer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeRequest {
    pub region_id: RegionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRequest {
    pub region_id: RegionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyExecutorRequest {
    pub region_id: RegionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotVectorIndexRequest {
    /// Vector index ids coincide with their region ids
    pub vector_index_id: RegionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateDefinitionRequest {
    pub new_region_definition: RegionDefinition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSplitRequest {
    pub region_id: RegionId,
    pub disable_split: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldVectorIndexRequest {
    pub region_id: RegionId,
    pub is_hold: bool,
}

/// Type-specific request payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmdRequest {
    Create(CreateRequest),
    Delete(DeleteRequest),
    Split(SplitRequest),
    /// Reserved; dispatch rejects it as unsupported
    Merge,
    ChangePeer(ChangePeerRequest),
    TransferLeader(TransferLeaderRequest),
    Snapshot,
    Purge(PurgeRequest),
    Stop(StopRequest),
    DestroyExecutor(DestroyExecutorRequest),
    SnapshotVectorIndex(SnapshotVectorIndexRequest),
    UpdateDefinition(UpdateDefinitionRequest),
    SwitchSplit(SwitchSplitRequest),
    HoldVectorIndex(HoldVectorIndexRequest),
}

impl CmdRequest {
    pub fn kind(&self) -> RegionCmdKind {
        match self {
            CmdRequest::Create(_) => RegionCmdKind::Create,
            CmdRequest::Delete(_) => RegionCmdKind::Delete,
            CmdRequest::Split(_) => RegionCmdKind::Split,
            CmdRequest::Merge => RegionCmdKind::Merge,
            CmdRequest::ChangePeer(_) => RegionCmdKind::ChangePeer,
            CmdRequest::TransferLeader(_) => RegionCmdKind::TransferLeader,
            CmdRequest::Snapshot => RegionCmdKind::Snapshot,
            CmdRequest::Purge(_) => RegionCmdKind::Purge,
            CmdRequest::Stop(_) => RegionCmdKind::Stop,
            CmdRequest::DestroyExecutor(_) => RegionCmdKind::DestroyExecutor,
            CmdRequest::SnapshotVectorIndex(_) => RegionCmdKind::SnapshotVectorIndex,
            CmdRequest::UpdateDefinition(_) => RegionCmdKind::UpdateDefinition,
            CmdRequest::SwitchSplit(_) => RegionCmdKind::SwitchSplit,
            CmdRequest::HoldVectorIndex(_) => RegionCmdKind::HoldVectorIndex,
        }
    }
}

/// A durable region-control command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCmd {
    /// Unique command id, usually timestamp derived
    pub id: u64,
    /// Target region
    pub region_id: RegionId,
    /// Milliseconds since the unix epoch
    pub create_timestamp: u64,
    /// Trigger a store heartbeat to the coordinator on completion
    pub is_notify: bool,
    pub status: CmdStatus,
    pub request: CmdRequest,
}

impl RegionCmd {
    pub fn new(id: u64, region_id: RegionId, create_timestamp: u64, request: CmdRequest) -> Self {
        Self {
            id,
            region_id,
            create_timestamp,
            is_notify: false,
            status: CmdStatus::None,
            request,
        }
    }

    pub fn with_notify(mut self) -> Self {
        self.is_notify = true;
        self
    }

    pub fn kind(&self) -> RegionCmdKind {
        self.request.kind()
    }
}
