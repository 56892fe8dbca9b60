//! Key encoding for the node-local meta store
//!
//! Every meta family lives under a fixed prefix; the record id is appended
//! big-endian so that lexicographic scan order equals ascending id order:
//! - Region rows:     `meta:region:{region_id:be64}`
//! - Raft meta rows:  `meta:raft:{region_id:be64}`
//! - Command rows:    `meta:cmd:{command_id:be64}`

/// Meta family prefixes
pub mod prefix {
    pub const REGION: &[u8] = b"meta:region:";
    pub const RAFT_META: &[u8] = b"meta:raft:";
    pub const COMMAND: &[u8] = b"meta:cmd:";
}

fn encode(prefix: &[u8], id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 8);
    key.extend_from_slice(prefix);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

fn decode(prefix: &[u8], key: &[u8]) -> Option<u64> {
    let suffix = key.strip_prefix(prefix)?;
    let bytes: [u8; 8] = suffix.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

/// Build a region row key: `meta:region:{region_id}`
pub fn region_key(region_id: u64) -> Vec<u8> {
    encode(prefix::REGION, region_id)
}

/// Extract the region id from a region row key
pub fn parse_region_id(key: &[u8]) -> Option<u64> {
    decode(prefix::REGION, key)
}

/// Build a raft meta row key: `meta:raft:{region_id}`
pub fn raft_meta_key(region_id: u64) -> Vec<u8> {
    encode(prefix::RAFT_META, region_id)
}

/// Extract the region id from a raft meta row key
pub fn parse_raft_meta_region_id(key: &[u8]) -> Option<u64> {
    decode(prefix::RAFT_META, key)
}

/// Build a command row key: `meta:cmd:{command_id}`
pub fn command_key(command_id: u64) -> Vec<u8> {
    encode(prefix::COMMAND, command_id)
}

/// Extract the command id from a command row key
pub fn parse_command_id(key: &[u8]) -> Option<u64> {
    decode(prefix::COMMAND, key)
}
