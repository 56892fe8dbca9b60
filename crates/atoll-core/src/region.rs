//! Region descriptors
//!
//! A region is a contiguous shard of the key space, replicated by one raft
//! group. These types describe a region's range, epoch, peers, and lifecycle
//! state as tracked by the store node.

use serde::{Deserialize, Serialize};

/// Region ID type
pub type RegionId = u64;

/// Region version pair
///
/// `version` advances when the data range changes (split/merge),
/// `conf_version` when the peer set changes. Compared pairwise with
/// `version` dominant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionEpoch {
    pub version: u64,
    pub conf_version: u64,
}

impl RegionEpoch {
    pub fn new(version: u64, conf_version: u64) -> Self {
        Self {
            version,
            conf_version,
        }
    }
}

impl PartialOrd for RegionEpoch {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegionEpoch {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.version, self.conf_version).cmp(&(other.version, other.conf_version))
    }
}

/// Key range `[start_key, end_key)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRange {
    /// Start key (inclusive)
    pub start_key: Vec<u8>,
    /// End key (exclusive)
    pub end_key: Vec<u8>,
}

impl RegionRange {
    pub fn new(start_key: Vec<u8>, end_key: Vec<u8>) -> Self {
        Self { start_key, end_key }
    }

    /// A range is well formed when both keys are present and start < end.
    pub fn is_valid(&self) -> bool {
        !self.start_key.is_empty() && !self.end_key.is_empty() && self.start_key < self.end_key
    }

    /// Check that a key falls inside the range.
    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.start_key.as_slice() && key < self.end_key.as_slice()
    }

    /// Check that a key is a proper interior point (not a boundary).
    pub fn contains_strictly(&self, key: &[u8]) -> bool {
        key > self.start_key.as_slice() && key < self.end_key.as_slice()
    }
}

impl std::fmt::Display for RegionRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {})",
            hex_string(&self.start_key),
            hex_string(&self.end_key)
        )
    }
}

/// Render a byte key as lowercase hex for logs.
pub fn hex_string(key: &[u8]) -> String {
    key.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Peer role inside a raft group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeerRole {
    Voter,
    Learner,
}

/// Network location of a peer's raft endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaftLocation {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for RaftLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A replica of a region on some store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub store_id: u64,
    pub role: PeerRole,
    pub raft_location: RaftLocation,
}

/// Region flavor: plain key/value data or a vector-index shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionType {
    Store,
    Index,
}

/// HNSW index parameters carried by INDEX region definitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswParameter {
    pub dimension: u32,
    pub max_elements: u64,
    pub ef_construction: u32,
    pub max_links: u32,
}

/// Index parameters of a region definition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexParameter {
    pub hnsw: Option<HnswParameter>,
}

/// Full region descriptor as issued by the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionDefinition {
    pub id: RegionId,
    pub epoch: RegionEpoch,
    /// Logical key range
    pub range: RegionRange,
    /// Physical key range after key encoding
    pub raw_range: RegionRange,
    pub region_type: RegionType,
    pub peers: Vec<Peer>,
    pub index_parameter: IndexParameter,
}

impl RegionDefinition {
    /// Peers holding the VOTER role.
    pub fn voters(&self) -> Vec<Peer> {
        self.peers
            .iter()
            .filter(|peer| peer.role == PeerRole::Voter)
            .cloned()
            .collect()
    }
}

/// Region lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionState {
    /// Created, raft node not serving yet
    New,
    /// Serving
    Normal,
    /// Split child waiting for the split to commit
    Standby,
    Splitting,
    Merging,
    Deleting,
    Deleted,
    /// Abandoned by a peer change, waiting for STOP
    Orphan,
    /// Fully removed; kept for completeness, never persisted
    Tombstone,
}

impl std::fmt::Display for RegionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RegionState::New => "new",
            RegionState::Normal => "normal",
            RegionState::Standby => "standby",
            RegionState::Splitting => "splitting",
            RegionState::Merging => "merging",
            RegionState::Deleting => "deleting",
            RegionState::Deleted => "deleted",
            RegionState::Orphan => "orphan",
            RegionState::Tombstone => "tombstone",
        };
        write!(f, "{}", name)
    }
}

/// A region as tracked by the store node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub definition: RegionDefinition,
    pub state: RegionState,
    /// Split switch; consulted by split validation, toggled by SWITCH_SPLIT
    pub disable_split: bool,
}

impl Region {
    /// Wrap a coordinator-issued definition; regions are born NEW.
    pub fn new(definition: RegionDefinition) -> Self {
        Self {
            definition,
            state: RegionState::New,
            disable_split: false,
        }
    }

    pub fn id(&self) -> RegionId {
        self.definition.id
    }

    pub fn epoch(&self) -> RegionEpoch {
        self.definition.epoch
    }

    pub fn range(&self) -> &RegionRange {
        &self.definition.range
    }

    pub fn raw_range(&self) -> &RegionRange {
        &self.definition.raw_range
    }

    /// The on-disk range to drop when the region's data is deleted.
    pub fn physics_range(&self) -> &RegionRange {
        &self.definition.raw_range
    }

    pub fn region_type(&self) -> RegionType {
        self.definition.region_type
    }

    pub fn state(&self) -> RegionState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &[u8], end: &[u8]) -> RegionRange {
        RegionRange::new(start.to_vec(), end.to_vec())
    }

    #[test]
    fn test_range_validity() {
        assert!(range(b"\x01", b"\x10").is_valid());
        assert!(!range(b"\x10", b"\x10").is_valid());
        assert!(!range(b"\x10", b"\x01").is_valid());
        assert!(!range(b"", b"\x01").is_valid());
    }

    #[test]
    fn test_range_contains() {
        let r = range(b"\x01", b"\x10");
        assert!(r.contains(b"\x01"));
        assert!(r.contains(b"\x0f"));
        assert!(!r.contains(b"\x10"));

        assert!(!r.contains_strictly(b"\x01"));
        assert!(r.contains_strictly(b"\x02"));
        assert!(!r.contains_strictly(b"\x10"));
    }

    #[test]
    fn test_epoch_ordering_version_dominant() {
        let old = RegionEpoch::new(1, 9);
        let new = RegionEpoch::new(2, 0);
        assert!(old < new);
        assert!(RegionEpoch::new(2, 0) < RegionEpoch::new(2, 1));
    }

    #[test]
    fn test_definition_voters() {
        let peer = |store_id, role| Peer {
            store_id,
            role,
            raft_location: RaftLocation {
                host: "127.0.0.1".to_string(),
                port: 20101,
            },
        };
        let definition = RegionDefinition {
            id: 1,
            epoch: RegionEpoch::default(),
            range: range(b"\x01", b"\x10"),
            raw_range: range(b"\x01", b"\x10"),
            region_type: RegionType::Store,
            peers: vec![
                peer(1, PeerRole::Voter),
                peer(2, PeerRole::Learner),
                peer(3, PeerRole::Voter),
            ],
            index_parameter: IndexParameter::default(),
        };

        let voters = definition.voters();
        assert_eq!(voters.len(), 2);
        assert!(voters.iter().all(|p| p.role == PeerRole::Voter));
    }
}
