//! Control-plane error taxonomy
//!
//! Errors surface both synchronously (dispatch return) and asynchronously
//! (command status plus heartbeat), so they carry a symbolic kind the
//! coordinator can act on and a human-readable message.

use serde::{Deserialize, Serialize};

/// Symbolic error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    RegionNotFound,
    RegionExist,
    RegionUnavailable,
    RegionState,
    RegionDeleting,
    RegionDeleted,
    RegionSplitting,
    RegionRepeatCommand,
    KeyInvalid,
    KeyOutOfRange,
    IllegalParameters,
    RaftNotFound,
    RaftNotLeader,
    RaftTransferLeader,
    VectorIndexNotFound,
    /// Vector index operation failed for a reason other than absence
    VectorIndexInternal,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::RegionNotFound => "REGION_NOT_FOUND",
            ErrorKind::RegionExist => "REGION_EXIST",
            ErrorKind::RegionUnavailable => "REGION_UNAVAILABLE",
            ErrorKind::RegionState => "REGION_STATE",
            ErrorKind::RegionDeleting => "REGION_DELETING",
            ErrorKind::RegionDeleted => "REGION_DELETED",
            ErrorKind::RegionSplitting => "REGION_SPLITING",
            ErrorKind::RegionRepeatCommand => "REGION_REPEAT_COMMAND",
            ErrorKind::KeyInvalid => "KEY_INVALID",
            ErrorKind::KeyOutOfRange => "KEY_OUT_OF_RANGE",
            ErrorKind::IllegalParameters => "ILLEGAL_PARAMETERS",
            ErrorKind::RaftNotFound => "RAFT_NOT_FOUND",
            ErrorKind::RaftNotLeader => "RAFT_NOTLEADER",
            ErrorKind::RaftTransferLeader => "RAFT_TRANSFER_LEADER",
            ErrorKind::VectorIndexNotFound => "VECTOR_INDEX_NOT_FOUND",
            ErrorKind::VectorIndexInternal => "VECTOR_INDEX_INTERNAL",
            ErrorKind::Internal => "INTERNAL",
        };
        write!(f, "{}", name)
    }
}

/// Control-plane error: symbolic kind plus message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn region_not_found(region_id: u64) -> Self {
        Self::new(
            ErrorKind::RegionNotFound,
            format!("region {} not found", region_id),
        )
    }

    pub fn region_exist(region_id: u64) -> Self {
        Self::new(
            ErrorKind::RegionExist,
            format!("region {} already exists", region_id),
        )
    }

    pub fn region_state(region_id: u64, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::RegionState,
            format!("region {}: {}", region_id, detail.into()),
        )
    }

    pub fn raft_not_found(region_id: u64) -> Self {
        Self::new(
            ErrorKind::RaftNotFound,
            format!("no raft node for region {}", region_id),
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
